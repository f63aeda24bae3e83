//! Capsule Spawner
//!
//! Drops a capsule above the view every `spawn_time ± spawn_time_modifier`
//! seconds while a round is being played.

use serde::{Serialize, Deserialize};

use crate::config::SpawnerConfig;
use crate::core::rng::DeterministicRng;

/// Spawn timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapsuleSpawner {
    /// Spawning enabled
    pub running: bool,
    /// Time until the next spawn (s)
    pub countdown: f32,
}

impl CapsuleSpawner {
    /// Start spawning; the first capsule comes after one interval.
    pub fn start(&mut self, cfg: &SpawnerConfig, rng: &mut DeterministicRng) {
        self.running = true;
        self.countdown = next_interval(cfg, rng);
    }

    /// Stop spawning.
    pub fn stop(&mut self) {
        self.running = false;
        self.countdown = 0.0;
    }

    /// Advance the timer. Returns the x of a capsule to spawn, if one is due.
    pub fn update(&mut self, cfg: &SpawnerConfig, rng: &mut DeterministicRng, dt: f32) -> Option<f32> {
        if !self.running {
            return None;
        }
        self.countdown -= dt;
        if self.countdown > 0.0 {
            return None;
        }
        self.countdown += next_interval(cfg, rng);
        Some(rng.next_f32_range(cfg.x_min, cfg.x_max))
    }
}

/// Random interval until the next spawn.
pub fn next_interval(cfg: &SpawnerConfig, rng: &mut DeterministicRng) -> f32 {
    let spread = cfg.spawn_time_modifier.abs();
    cfg.spawn_time + rng.next_f32_range(-spread, spread)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_stopped_never_spawns() {
        let cfg = SpawnerConfig::default();
        let mut rng = DeterministicRng::new(1);
        let mut spawner = CapsuleSpawner::default();
        for _ in 0..600 {
            assert!(spawner.update(&cfg, &mut rng, DT).is_none());
        }
    }

    #[test]
    fn test_spawn_rate_and_range() {
        let cfg = SpawnerConfig::default();
        let mut rng = DeterministicRng::new(99);
        let mut spawner = CapsuleSpawner::default();
        spawner.start(&cfg, &mut rng);

        // 20 seconds at 1.5..2.5 s per capsule
        let mut spawned = 0;
        for _ in 0..1200 {
            if let Some(x) = spawner.update(&cfg, &mut rng, DT) {
                assert!(x >= cfg.x_min && x < cfg.x_max);
                spawned += 1;
            }
        }
        assert!((8..=13).contains(&spawned), "spawned {}", spawned);

        spawner.stop();
        assert!(spawner.update(&cfg, &mut rng, DT).is_none());
    }

    #[test]
    fn test_interval_bounds() {
        let cfg = SpawnerConfig::default();
        let mut rng = DeterministicRng::new(5);
        for _ in 0..1000 {
            let t = next_interval(&cfg, &mut rng);
            assert!((1.5..2.5).contains(&t));
        }
    }
}
