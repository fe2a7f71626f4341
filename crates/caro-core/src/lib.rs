pub mod board;
pub mod clock;
pub mod net;
pub mod player;
pub mod session;
