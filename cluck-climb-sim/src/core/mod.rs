//! Core primitives.
//!
//! Engine-free building blocks: vectors, scalar smoothing, seeded randomness
//! and state hashing.

pub mod vec2;
pub mod math;
pub mod rng;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use math::{smooth_damp, lerp, clamp01, facing_sign};
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
