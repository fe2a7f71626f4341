use std::collections::HashMap;

use serde::Serialize;

use crate::board::{Board, Coord, Mark};
use crate::clock::{Tick, TurnClock};
use crate::net::messages::{PlacedMark, PublicState, ServerMessage, StartConfirmations};
use crate::player::{ConnId, Role, Seats};

/// Where the room is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitingForPlayers,
    ReadyToConfirm,
    InProgress,
    Finished,
}

/// Why an action was ignored. Rejections are never sent to clients; they
/// surface here so callers can log them and tests can assert on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotAPlayer,
    NotAwaitingConfirmation,
    AlreadyConfirmed,
    NotInProgress,
    NotYourTurn,
    CellOccupied,
    BoardFull,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Rejection::NotAPlayer => "not a player",
            Rejection::NotAwaitingConfirmation => "not awaiting confirmation",
            Rejection::AlreadyConfirmed => "already confirmed",
            Rejection::NotInProgress => "game not in progress",
            Rejection::NotYourTurn => "not your turn",
            Rejection::CellOccupied => "cell occupied",
            Rejection::BoardFull => "board full",
        };
        write!(f, "{reason}")
    }
}

/// IO the caller must perform after an operation. The session never touches
/// a socket itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver to one connection.
    Send(ConnId, ServerMessage),
    /// Deliver to every connection in the room.
    Broadcast(ServerMessage),
    /// A fresh countdown began; the tick driver realigns its timer.
    ClockStarted,
}

/// Authoritative state for one room: board, seats, turn clock and the
/// start handshake.
///
/// All methods are synchronous. Mutating operations return the [`Effect`]s
/// the caller must dispatch, so a single owner (normally the session task)
/// serializes every change.
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    clock: TurnClock,
    seats: Seats,
    roles: HashMap<ConnId, Role>,
    phase: Phase,
    turn: Mark,
    winner: Option<Mark>,
    win_line: Vec<Coord>,
    confirmed: StartConfirmations,
    turn_secs: u32,
}

impl GameSession {
    pub fn new(board_size: i32, turn_secs: u32) -> Self {
        Self {
            board: Board::new(board_size),
            clock: TurnClock::new(turn_secs),
            seats: Seats::default(),
            roles: HashMap::new(),
            phase: Phase::WaitingForPlayers,
            turn: Mark::X,
            winner: None,
            win_line: Vec::new(),
            confirmed: StartConfirmations::default(),
            turn_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn role_of(&self, conn: ConnId) -> Option<Role> {
        self.roles.get(&conn).copied()
    }

    pub fn player_count(&self) -> usize {
        self.seats.filled()
    }

    pub fn spectator_count(&self) -> usize {
        self.roles.values().filter(|r| !r.is_player()).count()
    }

    /// Snapshot for the `state` broadcast.
    pub fn public_state(&self) -> PublicState {
        PublicState {
            board: self.board.snapshot(),
            turn: self.turn,
            winner: self.winner,
            win_line: self.win_line.clone(),
        }
    }

    /// Admit a connection. The first vacant seat goes to the joiner, X
    /// before O; a full room makes them a spectator. Never rejected.
    ///
    /// The joiner alone receives its role, the current state and the clock
    /// value; the whole room hears the new occupancy. A join never disturbs
    /// a round in progress.
    pub fn join(&mut self, conn: ConnId) -> (Role, Vec<Effect>) {
        let role = match self.seats.claim_vacant(conn) {
            Some(mark) => Role::from_mark(mark),
            None => Role::Spectator,
        };
        self.roles.insert(conn, role);
        if self.phase == Phase::WaitingForPlayers && self.seats.both_filled() {
            self.phase = Phase::ReadyToConfirm;
        }
        let effects = vec![
            Effect::Send(conn, ServerMessage::AssignRole { role }),
            Effect::Send(conn, ServerMessage::State(self.public_state())),
            Effect::Send(
                conn,
                ServerMessage::Timer {
                    seconds: self.clock.remaining_secs(),
                },
            ),
            Effect::Broadcast(self.occupancy_message()),
        ];
        (role, effects)
    }

    /// Remove a connection and reset the room, whatever their role was.
    /// The remaining occupants get a cleared board and a fresh handshake.
    pub fn leave(&mut self, conn: ConnId) -> Vec<Effect> {
        if self.roles.remove(&conn).is_none() {
            return Vec::new();
        }
        self.seats.vacate(conn);
        self.full_reset()
    }

    /// Record a player's start confirmation; the second one starts the game.
    pub fn confirm_start(&mut self, conn: ConnId) -> Result<Vec<Effect>, Rejection> {
        let mark = self.seats.seat_of(conn).ok_or(Rejection::NotAPlayer)?;
        if self.phase != Phase::ReadyToConfirm {
            return Err(Rejection::NotAwaitingConfirmation);
        }
        if self.confirmed.get(mark) {
            return Err(Rejection::AlreadyConfirmed);
        }
        self.confirmed.set(mark);
        let mut effects = vec![Effect::Broadcast(ServerMessage::StartConfirmUpdate {
            confirmed: self.confirmed,
        })];
        if self.confirmed.both() {
            self.reset_round();
            self.phase = Phase::InProgress;
            effects.push(Effect::Broadcast(ServerMessage::State(self.public_state())));
            effects.push(Effect::Broadcast(ServerMessage::LastMove { placed: None }));
            effects.push(Effect::Broadcast(ServerMessage::GameStarted));
            effects.extend(self.start_clock());
        }
        Ok(effects)
    }

    /// Place the caller's mark at `(x, y)`. Any grid coordinate is legal,
    /// including outside the working area.
    pub fn make_move(&mut self, conn: ConnId, x: i32, y: i32) -> Result<Vec<Effect>, Rejection> {
        let mark = self.seats.seat_of(conn).ok_or(Rejection::NotAPlayer)?;
        if self.phase != Phase::InProgress {
            return Err(Rejection::NotInProgress);
        }
        if mark != self.turn {
            return Err(Rejection::NotYourTurn);
        }
        if !self.board.get(x, y).is_empty() {
            return Err(Rejection::CellOccupied);
        }
        Ok(self.place(x, y, mark))
    }

    /// Forced move on clock expiry: the current player's mark goes to the
    /// first empty working-area cell. Win check and turn flip are the same
    /// as for a chosen move.
    pub fn auto_move(&mut self) -> Result<Vec<Effect>, Rejection> {
        if self.phase != Phase::InProgress {
            return Err(Rejection::NotInProgress);
        }
        let Some((x, y)) = self.board.first_empty_cell() else {
            return Err(Rejection::BoardFull);
        };
        Ok(self.place(x, y, self.turn))
    }

    /// Abandon the current round at a player's request.
    pub fn request_reset(&mut self, conn: ConnId) -> Result<Vec<Effect>, Rejection> {
        if self.seats.seat_of(conn).is_none() {
            return Err(Rejection::NotAPlayer);
        }
        Ok(self.full_reset())
    }

    /// Advance the turn clock by one second. Empty when the clock is
    /// stopped; on expiry the forced move follows the final countdown value.
    pub fn handle_tick(&mut self) -> Vec<Effect> {
        match self.clock.tick() {
            Some(Tick::Counting(secs)) => {
                vec![Effect::Broadcast(ServerMessage::Timer { seconds: secs })]
            },
            Some(Tick::Expired) => {
                let mut effects = vec![Effect::Broadcast(ServerMessage::Timer { seconds: 0 })];
                // On a full board the forced move has nowhere to go; the
                // round stalls with the clock stopped and no winner.
                if let Ok(more) = self.auto_move() {
                    effects.extend(more);
                }
                effects
            },
            None => Vec::new(),
        }
    }

    fn place(&mut self, x: i32, y: i32, mark: Mark) -> Vec<Effect> {
        self.board.set(x, y, mark);
        let placed = PlacedMark { x, y, mark };
        let mut effects = vec![Effect::Broadcast(ServerMessage::LastMove {
            placed: Some(placed),
        })];
        if let Some(line) = self.board.check_win(x, y) {
            self.winner = Some(mark);
            self.win_line = line;
            self.phase = Phase::Finished;
            self.clock.stop();
            effects.push(Effect::Broadcast(ServerMessage::State(self.public_state())));
        } else {
            self.turn = mark.other();
            effects.push(Effect::Broadcast(ServerMessage::State(self.public_state())));
            effects.extend(self.start_clock());
        }
        effects
    }

    fn start_clock(&mut self) -> Vec<Effect> {
        let seconds = self.clock.start(self.turn_secs);
        vec![
            Effect::Broadcast(ServerMessage::Timer { seconds }),
            Effect::ClockStarted,
        ]
    }

    /// Clear the round state: board, clock, turn and outcome.
    fn reset_round(&mut self) {
        self.board.reset();
        self.clock.reset(self.turn_secs);
        self.turn = Mark::X;
        self.winner = None;
        self.win_line.clear();
    }

    /// Round reset plus a fresh handshake, with the phase re-derived from
    /// seat occupancy.
    fn full_reset(&mut self) -> Vec<Effect> {
        self.reset_round();
        self.confirmed.clear();
        self.phase = if self.seats.both_filled() {
            Phase::ReadyToConfirm
        } else {
            Phase::WaitingForPlayers
        };
        vec![
            Effect::Broadcast(ServerMessage::State(self.public_state())),
            Effect::Broadcast(ServerMessage::LastMove { placed: None }),
            Effect::Broadcast(self.occupancy_message()),
        ]
    }

    fn occupancy_message(&self) -> ServerMessage {
        if self.seats.both_filled() {
            ServerMessage::ReadyToStart
        } else {
            ServerMessage::WaitingForPlayers
        }
    }
}
