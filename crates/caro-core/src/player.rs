use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::Mark;

/// Identifier for a connected socket. Minted by the transport layer at
/// accept time; the session never creates these itself.
pub type ConnId = Uuid;

/// What a connection may do in the room. Serialized as `"X"`, `"O"` or
/// `"SPECTATOR"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    X,
    O,
    Spectator,
}

impl Role {
    pub fn from_mark(mark: Mark) -> Self {
        match mark {
            Mark::X => Role::X,
            Mark::O => Role::O,
        }
    }

    /// The mark this role plays, if it is a player role.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Role::X => Some(Mark::X),
            Role::O => Some(Mark::O),
            Role::Spectator => None,
        }
    }

    pub fn is_player(self) -> bool {
        self.mark().is_some()
    }
}

/// The two player seats. A connection holds at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seats {
    x: Option<ConnId>,
    o: Option<ConnId>,
}

impl Seats {
    /// Claim the first vacant seat, X before O. `None` when both are held.
    pub fn claim_vacant(&mut self, conn: ConnId) -> Option<Mark> {
        if self.x.is_none() {
            self.x = Some(conn);
            Some(Mark::X)
        } else if self.o.is_none() {
            self.o = Some(conn);
            Some(Mark::O)
        } else {
            None
        }
    }

    /// Release whichever seat the connection holds.
    pub fn vacate(&mut self, conn: ConnId) -> Option<Mark> {
        if self.x == Some(conn) {
            self.x = None;
            Some(Mark::X)
        } else if self.o == Some(conn) {
            self.o = None;
            Some(Mark::O)
        } else {
            None
        }
    }

    /// The seat a connection holds, if any.
    pub fn seat_of(&self, conn: ConnId) -> Option<Mark> {
        if self.x == Some(conn) {
            Some(Mark::X)
        } else if self.o == Some(conn) {
            Some(Mark::O)
        } else {
            None
        }
    }

    pub fn both_filled(&self) -> bool {
        self.x.is_some() && self.o.is_some()
    }

    pub fn filled(&self) -> usize {
        usize::from(self.x.is_some()) + usize::from(self.o.is_some())
    }
}
