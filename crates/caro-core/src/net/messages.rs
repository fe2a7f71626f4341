use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::{Cell, Coord, Mark};
use crate::player::Role;

/// Messages a client may send. JSON text frames tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    VerifyPassword { password: String },
    ConfirmStart,
    MakeMove { x: i32, y: i32 },
    ResetGame,
}

/// Messages the server sends. JSON text frames tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    PasswordOk,
    PasswordFail,
    /// Sent to the joining connection only.
    AssignRole { role: Role },
    /// Full room snapshot, broadcast after every accepted mutation.
    State(PublicState),
    /// Seconds left on the turn clock.
    Timer { seconds: u32 },
    /// Most recent placement, or `None` to clear highlighting after a reset.
    LastMove { placed: Option<PlacedMark> },
    ReadyToStart,
    WaitingForPlayers,
    StartConfirmUpdate { confirmed: StartConfirmations },
    GameStarted,
}

/// Everything a client needs to render the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicState {
    /// Materialized cells keyed `"x,y"`; values `"."`, `"X"` or `"O"`.
    pub board: BTreeMap<String, Cell>,
    pub turn: Mark,
    pub winner: Option<Mark>,
    pub win_line: Vec<Coord>,
}

/// A single placement, kept for client-side highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedMark {
    pub x: i32,
    pub y: i32,
    pub mark: Mark,
}

/// Which players have confirmed the start handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartConfirmations {
    #[serde(rename = "X")]
    pub x: bool,
    #[serde(rename = "O")]
    pub o: bool,
}

impl StartConfirmations {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    pub fn set(&mut self, mark: Mark) {
        match mark {
            Mark::X => self.x = true,
            Mark::O => self.o = true,
        }
    }

    pub fn both(&self) -> bool {
        self.x && self.o
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
