//! # Cluck Climb Simulation
//!
//! Deterministic gameplay core for Cluck Climb, a local multiplayer party
//! platformer. Up to four chickens climb a rising arena built from the blocks,
//! bombs and springs they break out of capsules; the last one alive wins the
//! round.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CLUCK CLIMB SIM                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config.rs       - Tuning, arena, item catalog, env loading  │
//! │                                                              │
//! │  core/           - Engine-free primitives                    │
//! │  ├── vec2.rs     - 2D float vector                           │
//! │  ├── math.rs     - Smoothing and interpolation               │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for replay checks           │
//! │                                                              │
//! │  game/           - Gameplay                                  │
//! │  ├── movement.rs - Platformer integrator                     │
//! │  ├── probe.rs    - Ground and head rays                      │
//! │  ├── holdable.rs - Carry, preview and place items            │
//! │  ├── bomb.rs     - Fuse and explosion                        │
//! │  ├── spring.rs   - Bounce pads                               │
//! │  ├── capsule.rs  - Breakable item capsules                   │
//! │  ├── camera.rs   - Rising camera and shake                   │
//! │  ├── state.rs    - Menu → Prepare → Game → Win               │
//! │  └── tick.rs     - Simulation step and replay                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Given the same seed, joins and per-tick inputs, two runs produce the same
//! state digest:
//! - No HashMap (BTreeMap for sorted iteration)
//! - No wall clock; the host feeds a fixed [`TICK_DT`]
//! - All randomness from the seeded match RNG

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig};
pub use core::rng::DeterministicRng;
pub use core::vec2::Vec2;
pub use game::input::{Buttons, InputFrame, InputScheme};
pub use game::player::PlayerSlot;
pub use game::state::{MatchPhase, MatchState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Seconds per tick
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Player slots
pub const MAX_PLAYERS: usize = 4;
