//! Game Logic Module
//!
//! All gameplay simulation code. Deterministic for a given seed and inputs.
//!
//! ## Module Structure
//!
//! - `input`: Per-tick input frames and join devices
//! - `collision`: Boxes, layers, rays and swept moves
//! - `movement`, `jump`, `probe`: Platformer integrator and ground checks
//! - `player`: Player state and per-tick control
//! - `holdable`, `pool`: Carried and placed items, instance pools
//! - `bomb`, `spring`, `capsule`, `spawner`: Hazards and item sources
//! - `camera`, `countdown`, `ui`: Presentation models driven by the match
//! - `state`: Match state machine (Menu, Prepare, Game, Win)
//! - `tick`: Authoritative simulation step and replay
//! - `events`: Game events for audio, effects and verification

pub mod input;
pub mod collision;
pub mod movement;
pub mod jump;
pub mod probe;
pub mod player;
pub mod holdable;
pub mod pool;
pub mod bomb;
pub mod spring;
pub mod capsule;
pub mod spawner;
pub mod camera;
pub mod countdown;
pub mod ui;
pub mod arena;
pub mod state;
pub mod tick;
pub mod events;

// Re-export key types
pub use input::{Buttons, InputFrame, InputScheme, KeyboardScheme};
pub use player::{PlayerSlot, PlayerState};
pub use state::{MatchPhase, MatchState};
pub use tick::{replay_match, tick, Recording, TickInputs, TickResult};
pub use events::{GameEvent, GameEventData};
