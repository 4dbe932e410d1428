//! # Tile Race Server
//!
//! Deterministic actor simulation for a tile-based cooperative race game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TILE RACE SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── map.rs      - Tile layers                               │
//! │  ├── movement.rs - Movement core                             │
//! │  ├── tiles.rs    - Tile rule engine                          │
//! │  ├── ability.rs  - Weapons and special abilities             │
//! │  ├── reckoning.rs- Resync decisions                          │
//! │  ├── world.rs    - World context                             │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  network/        - Session runner (non-deterministic)        │
//! │  ├── protocol.rs - Commands and snapshots                    │
//! │  └── session.rs  - Fixed-rate tick loop                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! The body overlay is the one float component; nothing in the simulation
//! reads it back.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::{ActorId, GameConfig, GameWorld, InputRecording, PlayerInput, TileMap, TuningTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_SPEED: u32 = 50;
