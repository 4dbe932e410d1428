//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `map`, `collision`: Tile layers and box movement against them
//! - `movement`: Actor movement core (gravity, jumps, hook)
//! - `tiles`: Tile rule engine run on the path crossed each tick
//! - `ability`, `weapon`: Weapons, ninja dash and jetpack
//! - `reckoning`: Broadcast core and dead-reckoning resync decisions
//! - `lifecycle`, `save`: Spawn, death, pause and rescue
//! - `world`, `tick`: The world context and the authoritative loop
//! - `snapshot`, `events`: What leaves the simulation each tick
//! - `overlay`: Cosmetic body layer, never read back

pub mod input;
pub mod config;
pub mod tuning;
pub mod weapon;
pub mod teams;
pub mod switch;
pub mod map;
pub mod collision;
pub mod movement;
pub mod events;
pub mod actor;
pub mod save;
pub mod reckoning;
pub mod world;
pub mod tiles;
pub mod ability;
pub mod lifecycle;
pub mod snapshot;
pub mod overlay;
pub mod tick;

// Re-export key types
pub use actor::Actor;
pub use config::{GameConfig, TeamPolicy};
pub use events::{GameEvent, GameEventData};
pub use input::{InputRecording, PlayerInput};
pub use map::{TileMap, TileMapBuilder};
pub use movement::{ActorCore, ActorId};
pub use tick::{tick, replay, TickResult};
pub use tuning::{TuningParams, TuningTable};
pub use world::{GameWorld, WorldError};
