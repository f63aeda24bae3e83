//! Spring Disc
//!
//! A placed spring bounces any player that starts touching it, away from the
//! spring's centre. When knocked around it bleeds off its own velocity and
//! falls asleep (kinematic, zero velocity) once nearly still, so it does not
//! drift. A kick wakes it up again.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::config::SpringConfig;
use crate::core::math::lerp;
use crate::core::vec2::Vec2;
use crate::game::player::PlayerSlot;

/// Per-spring state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpringState {
    /// Time left on the squash animation (s)
    pub squash: f32,
    /// Players touching the spring last tick
    pub touching: BTreeSet<PlayerSlot>,
}

impl SpringState {
    /// Update the contact set and return players that just started touching.
    pub fn update_contacts(&mut self, now: BTreeSet<PlayerSlot>) -> Vec<PlayerSlot> {
        let entered = now.difference(&self.touching).copied().collect();
        self.touching = now;
        entered
    }

    /// Start the squash animation.
    pub fn trigger_squash(&mut self, cfg: &SpringConfig) {
        self.squash = cfg.squash_time;
    }

    /// Count the squash animation down.
    pub fn update(&mut self, dt: f32) {
        self.squash = (self.squash - dt).max(0.0);
    }

    /// Squash amount in [0, 1] for rendering.
    pub fn squash_amount(&self, cfg: &SpringConfig) -> f32 {
        if cfg.squash_time <= 0.0 {
            0.0
        } else {
            self.squash / cfg.squash_time
        }
    }

    /// Forget contacts (pooled or woken up).
    pub fn reset(&mut self) {
        self.squash = 0.0;
        self.touching.clear();
    }
}

/// Impulse given to a player touching a spring.
pub fn bounce_impulse(spring: Vec2, player: Vec2, cfg: &SpringConfig) -> Vec2 {
    (player - spring).normalize_or(Vec2::UP) * cfg.bounce_force
}

/// Bleed velocity toward zero; vertical damps twice as fast.
pub fn damp_velocity(velocity: Vec2, cfg: &SpringConfig, dt: f32) -> Vec2 {
    let k = cfg.attenuation_on_movement;
    Vec2::new(lerp(velocity.x, 0.0, k * dt), lerp(velocity.y, 0.0, 2.0 * k * dt))
}

/// Whether a spring moving at `velocity` should go to sleep.
pub fn should_sleep(velocity: Vec2, cfg: &SpringConfig) -> bool {
    velocity.length_squared() < cfg.sleep_speed_sq
}
