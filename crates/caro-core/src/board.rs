use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Number of contiguous same-mark cells that wins the game.
pub const WIN_LEN: usize = 5;

/// Scan axes for the win check, as `(dx, dy)` steps. Each axis is walked in
/// both directions from the placed cell.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Symbol a player places on the board. `X` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The opposing mark.
    pub fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Contents of a single cell. Serialized as `"."`, `"X"` or `"O"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = ".")]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }

    /// The mark occupying this cell, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Mark::X),
            Cell::O => Some(Mark::O),
        }
    }
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

/// A cell position. The grid is unbounded; negative coordinates are valid.
pub type Coord = (i32, i32);

/// Sparse, unbounded grid of placed marks.
///
/// A `size` x `size` working area starting at the origin is eagerly filled
/// with [`Cell::Empty`] entries so snapshots always carry the playable grid.
/// Cells outside the working area read as empty until written and still
/// count toward wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    cells: HashMap<Coord, Cell>,
    size: i32,
}

impl Board {
    pub fn new(size: i32) -> Self {
        let mut board = Self {
            cells: HashMap::new(),
            size,
        };
        board.reset();
        board
    }

    /// Side length of the eagerly initialized working area.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Discard all marks and re-initialize the working area.
    pub fn reset(&mut self) {
        self.cells.clear();
        for x in 0..self.size {
            for y in 0..self.size {
                self.cells.insert((x, y), Cell::Empty);
            }
        }
    }

    /// Read a cell anywhere on the grid. Unwritten cells are empty.
    pub fn get(&self, x: i32, y: i32) -> Cell {
        self.cells.get(&(x, y)).copied().unwrap_or_default()
    }

    pub fn set(&mut self, x: i32, y: i32, mark: Mark) {
        self.cells.insert((x, y), mark.into());
    }

    /// Check whether the mark at `(x, y)` completes a run of [`WIN_LEN`] or
    /// more along any scan axis. Returns the full run ordered end to end,
    /// or `None` (including when the cell is empty).
    pub fn check_win(&self, x: i32, y: i32) -> Option<Vec<Coord>> {
        let placed = self.get(x, y).mark()?;
        for &(dx, dy) in &DIRECTIONS {
            // Walk backward to the start of the run, then forward through it.
            let (mut sx, mut sy) = (x, y);
            while let Some((nx, ny)) = step(sx, sy, -dx, -dy)
                && self.get(nx, ny).mark() == Some(placed)
            {
                (sx, sy) = (nx, ny);
            }
            let mut line = vec![(sx, sy)];
            let (mut cx, mut cy) = (sx, sy);
            while let Some((nx, ny)) = step(cx, cy, dx, dy)
                && self.get(nx, ny).mark() == Some(placed)
            {
                line.push((nx, ny));
                (cx, cy) = (nx, ny);
            }
            if line.len() >= WIN_LEN {
                return Some(line);
            }
        }
        None
    }

    /// First empty cell of the working area in scan order, outer `x` then
    /// inner `y`. Cells outside the working area are never returned.
    pub fn first_empty_cell(&self) -> Option<Coord> {
        for x in 0..self.size {
            for y in 0..self.size {
                if self.get(x, y).is_empty() {
                    return Some((x, y));
                }
            }
        }
        None
    }

    /// Wire snapshot of every materialized cell, keyed `"x,y"`.
    pub fn snapshot(&self) -> BTreeMap<String, Cell> {
        self.cells
            .iter()
            .map(|(&(x, y), &cell)| (format!("{x},{y}"), cell))
            .collect()
    }
}

fn step(x: i32, y: i32, dx: i32, dy: i32) -> Option<Coord> {
    Some((x.checked_add(dx)?, y.checked_add(dy)?))
}
