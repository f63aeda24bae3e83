//! State Hashing
//!
//! SHA-256 digests of the simulation state, used to check that a replayed
//! session lands on exactly the same state as the recorded one. Floats are
//! hashed by bit pattern, so any divergence at all shows up.

use sha2::{Sha256, Digest};
use super::vec2::Vec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for game state.
///
/// Order of updates is part of the digest; callers must visit state in a
/// stable order (slot order, then BTreeMap key order).
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for match state.
    pub fn for_match_state() -> Self {
        Self::new(b"CLUCK_CLIMB_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 by bit pattern.
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.update_u32(value.to_bits());
    }

    /// Update with a Vec2.
    #[inline]
    pub fn update_vec2(&mut self, value: Vec2) {
        self.update_f32(value.x);
        self.update_f32(value.y);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute the state hash for a match.
///
/// Tick and seed are always hashed first; the closure adds the rest.
pub fn compute_state_hash<F>(tick: u32, rng_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_match_state();

    hasher.update_u32(tick);
    hasher.update_u64(rng_seed);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hash_determinism() {
        let hash1 = compute_state_hash(100, 12345, |h| {
            h.update_vec2(Vec2::new(1.5, -2.0));
            h.update_bool(true);
        });
        let hash2 = compute_state_hash(100, 12345, |h| {
            h.update_vec2(Vec2::new(1.5, -2.0));
            h.update_bool(true);
        });
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_state_hash_sensitivity() {
        let base = compute_state_hash(1, 7, |h| h.update_f32(0.1));
        let other_tick = compute_state_hash(2, 7, |h| h.update_f32(0.1));
        let other_value = compute_state_hash(1, 7, |h| h.update_f32(0.1 + f32::EPSILON));

        assert_ne!(base, other_tick);
        assert_ne!(base, other_value);
    }

    #[test]
    fn test_signed_zero_differs() {
        // Bit-pattern hashing distinguishes 0.0 from -0.0
        let pos = compute_state_hash(0, 0, |h| h.update_f32(0.0));
        let neg = compute_state_hash(0, 0, |h| h.update_f32(-0.0));
        assert_ne!(pos, neg);
    }
}
