//! Rising Camera Rig
//!
//! The camera only ever climbs during a round. It tracks the highest height
//! any grounded player has reached and smooth-damps toward it, so players
//! who fall behind drop off the bottom of the view (and die below it).
//!
//! A death shake is layered on top as decaying Perlin noise. The previous
//! frame's offset is removed before the new one is applied, so shakes never
//! accumulate into the follow position.

use std::fmt;

use noise::{NoiseFn, Perlin};
use serde::{Serialize, Deserialize};

use crate::config::CameraConfig;
use crate::core::math::{clamp01, smooth_damp};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::player::PlayerSlot;

/// Running shake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shake {
    /// Time left (s)
    pub remaining: f32,
    /// Length the decay is measured against (s)
    pub duration: f32,
    /// Peak offset
    pub amplitude: f32,
}

/// What the rig should follow this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraTarget {
    /// Highest grounded alive player height, if anyone is grounded
    Highest(Option<f32>),
    /// Focused winner's position, if the winner still exists
    Winner(Option<Vec2>),
}

/// Perlin source for the shake, rebuilt from its seed when deserialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ShakeNoise {
    seed: u32,
    perlin: Perlin,
}

impl ShakeNoise {
    /// Build the generator for a seed.
    pub fn new(seed: u32) -> Self {
        Self { seed, perlin: Perlin::new(seed) }
    }

    /// Sample in [-1, 1].
    pub fn sample(&self, x: f64, t: f64) -> f32 {
        (self.perlin.get([x, t]) as f32).clamp(-1.0, 1.0)
    }
}

impl From<u32> for ShakeNoise {
    fn from(seed: u32) -> Self {
        Self::new(seed)
    }
}

impl From<ShakeNoise> for u32 {
    fn from(noise: ShakeNoise) -> Self {
        noise.seed
    }
}

impl PartialEq for ShakeNoise {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
    }
}

impl fmt::Debug for ShakeNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShakeNoise").field("seed", &self.seed).finish()
    }
}

/// Camera rig state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    /// Follow anchor, including the applied shake
    pub position: Vec2,
    /// Highest tracked height this round
    pub max_height_reached: f32,
    /// Follow smoothing velocity (x, y)
    pub velocity: Vec2,
    /// Half view height
    pub ortho_size: f32,
    /// Zoom smoothing velocity
    pub zoom_velocity: f32,
    /// Active shake
    pub shake: Option<Shake>,
    /// Offset applied last tick
    pub applied_shake: Vec2,
    /// Noise sample coordinates per axis
    pub shake_seed: Vec2,
    /// Shake noise generator
    pub noise: ShakeNoise,
    /// Rig clock, drives the noise (s)
    pub clock: f32,
    /// Winner being focused
    pub focus: Option<PlayerSlot>,
    /// Whether the rig moves at all
    pub can_move: bool,
}

impl CameraRig {
    /// Create a rig at rest.
    pub fn new(cfg: &CameraConfig, rng: &mut DeterministicRng) -> Self {
        let shake_seed = Vec2::new(rng.next_f32_range(0.0, 1000.0), rng.next_f32_range(0.0, 1000.0));
        Self {
            position: Vec2::ZERO,
            max_height_reached: 0.0,
            velocity: Vec2::ZERO,
            ortho_size: cfg.normal_ortho_size,
            zoom_velocity: 0.0,
            shake: None,
            applied_shake: Vec2::ZERO,
            shake_seed,
            noise: ShakeNoise::new(shake_seed.x.to_bits() ^ shake_seed.y.to_bits()),
            clock: 0.0,
            focus: None,
            can_move: false,
        }
    }

    /// Lower edge of the view.
    pub fn view_bottom(&self) -> f32 {
        self.position.y - self.ortho_size
    }

    /// Height below which players are eliminated.
    pub fn kill_line(&self, cfg: &CameraConfig) -> f32 {
        self.view_bottom() - cfg.kill_margin
    }

    /// Advance the rig one tick.
    pub fn update(&mut self, target: CameraTarget, cfg: &CameraConfig, dt: f32) {
        if !self.can_move {
            return;
        }
        self.clock += dt;
        self.update_shake(cfg, dt);

        match target {
            CameraTarget::Winner(position) if self.focus.is_some() => {
                if let Some(winner) = position {
                    self.follow_up_only(winner.y, cfg, dt);
                    self.position.x = smooth_damp(
                        self.position.x,
                        winner.x,
                        &mut self.velocity.x,
                        cfg.smooth_time_y,
                        dt,
                    );
                    self.zoom_to(cfg.winner_ortho_size, cfg, dt);
                }
            }
            CameraTarget::Highest(Some(height)) => {
                self.follow_up_only(height.max(cfg.min_follow_height), cfg, dt);
                self.zoom_to(cfg.normal_ortho_size, cfg, dt);
            }
            _ => {}
        }
    }

    /// Start a shake, falling back to the configured defaults for
    /// non-positive arguments.
    pub fn do_death_shake(&mut self, duration: f32, amplitude: f32, cfg: &CameraConfig) {
        let duration = if duration > 0.0 { duration } else { cfg.shake_duration };
        let amplitude = if amplitude > 0.0 { amplitude } else { cfg.shake_amplitude };
        self.shake = Some(Shake {
            remaining: duration,
            duration: cfg.shake_duration,
            amplitude,
        });
    }

    /// Focus a round winner and stop shaking.
    pub fn focus_winner(&mut self, winner: PlayerSlot) {
        self.focus = Some(winner);
        self.clear_shake();
    }

    /// Back to the start of a round.
    pub fn reset_to_gameplay(&mut self, cfg: &CameraConfig) {
        self.focus = None;
        self.velocity = Vec2::ZERO;
        self.zoom_velocity = 0.0;
        self.ortho_size = cfg.normal_ortho_size;
        self.max_height_reached = 0.0;
        self.position = Vec2::ZERO;
        self.shake = None;
        self.applied_shake = Vec2::ZERO;
    }

    fn follow_up_only(&mut self, target_y: f32, cfg: &CameraConfig, dt: f32) {
        self.max_height_reached = self.max_height_reached.max(target_y);
        let desired = self.max_height_reached + cfg.y_offset;
        self.position.y = smooth_damp(self.position.y, desired, &mut self.velocity.y, cfg.smooth_time_y, dt);
    }

    fn zoom_to(&mut self, size: f32, cfg: &CameraConfig, dt: f32) {
        self.ortho_size = smooth_damp(self.ortho_size, size, &mut self.zoom_velocity, cfg.zoom_smooth_time, dt);
    }

    fn clear_shake(&mut self) {
        self.position -= self.applied_shake;
        self.applied_shake = Vec2::ZERO;
        self.shake = None;
    }

    fn update_shake(&mut self, cfg: &CameraConfig, dt: f32) {
        self.position -= self.applied_shake;
        self.applied_shake = Vec2::ZERO;

        let Some(shake) = self.shake.as_mut() else {
            return;
        };
        shake.remaining -= dt;
        if shake.remaining <= 0.0 {
            self.shake = None;
            return;
        }

        let amp = shake.amplitude * clamp01(shake.remaining / shake.duration);
        let t = (self.clock * cfg.shake_frequency) as f64;
        let nx = self.noise.sample(self.shake_seed.x as f64, t);
        let ny = self.noise.sample(self.shake_seed.y as f64, t);

        self.applied_shake = Vec2::new(
            if cfg.shake_x { nx * amp } else { 0.0 },
            if cfg.shake_y { ny * amp } else { 0.0 },
        );
        self.position += self.applied_shake;
    }
}

// =============================================================================
// TESTS
// =============================================================================
