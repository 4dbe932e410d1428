//! Network Layer
//!
//! Fixed-rate session runner around the simulation.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;

pub use protocol::{ClientCommand, WorldSnapshot};
pub use session::{GameSession, SessionConfig, SessionError, SessionHandle};
