//! Movement Integrator
//!
//! Horizontal smoothing and the custom vertical gravity curve for player
//! characters. Gravity and jump velocity are derived from the desired apex
//! height and time-to-apex rather than tuned directly:
//!
//! ```text
//! g  = 2h / -(t²)
//! v0 = -g · t
//! ```
//!
//! With jump held the ascent is a clean parabola peaking at `h` after `t`.
//! Releasing early adds extra gravity (short hop); falling adds more (snappy
//! landings) unless jump is held, which glides at a capped fall speed.

use crate::config::PlatformerValues;
use crate::core::math::{smooth_damp, facing_sign};
use crate::core::vec2::Vec2;

/// Target speeds below this count as "no input" for smoothing purposes.
const TARGET_EPSILON: f32 = 0.01;

/// Gravity and launch velocity derived from jump shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpKinematics {
    /// Constant gravity (negative)
    pub gravity: f32,
    /// Initial vertical velocity of a jump
    pub jump_velocity: f32,
}

impl JumpKinematics {
    /// Derive from apex height and time to apex.
    pub fn derive(peak_height: f32, time_to_peak: f32) -> Self {
        let gravity = 2.0 * peak_height / -(time_to_peak * time_to_peak);
        Self {
            gravity,
            jump_velocity: -gravity * time_to_peak,
        }
    }

    /// Derive from the platformer tuning.
    pub fn from_values(values: &PlatformerValues) -> Self {
        Self::derive(values.peak_height, values.time_to_peak)
    }
}

/// Result of one horizontal step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalStep {
    /// New horizontal velocity
    pub velocity_x: f32,
    /// New facing, if the axis asked for one
    pub facing: Option<f32>,
}

/// Smooth horizontal velocity toward `axis · max_speed`.
///
/// `smoothing` is the persistent smoothing velocity of the player.
pub fn horizontal_step(
    velocity_x: f32,
    axis: f32,
    smoothing: &mut f32,
    values: &PlatformerValues,
    dt: f32,
) -> HorizontalStep {
    let axis = axis.clamp(-1.0, 1.0);
    let target = axis * values.max_speed;
    let smooth_time = if target.abs() > TARGET_EPSILON {
        values.acceleration_time
    } else {
        values.deceleration_time
    };

    HorizontalStep {
        velocity_x: smooth_damp(velocity_x, target, smoothing, smooth_time, dt),
        facing: (axis != 0.0).then(|| facing_sign(axis)),
    }
}

/// Apply the gravity curve for one step.
pub fn vertical_step(
    velocity_y: f32,
    hold_jump: bool,
    grounded: bool,
    kinematics: &JumpKinematics,
    values: &PlatformerValues,
    dt: f32,
) -> f32 {
    let g = kinematics.gravity;

    // No gravity on the ground; only settling velocities are pinned
    if grounded {
        return if velocity_y <= 0.0 { values.ground_stick_velocity } else { velocity_y };
    }

    let mut vy = velocity_y + g * dt;

    if vy < 0.0 {
        let glide = if hold_jump { values.glide_resistance } else { 0.0 };
        let limit = if hold_jump { values.glide_fall_limit } else { values.max_fall_speed };
        vy = (vy + g * (values.fall_multiplier - 1.0 - glide) * dt).clamp(limit, values.max_rise_speed);
    } else if vy > 0.0 && !hold_jump {
        vy += g * (values.low_jump_multiplier - 1.0) * dt;
    }

    vy
}

/// Advance a position using the average of the old and new velocity.
#[inline]
pub fn integrate(position: Vec2, old_velocity: Vec2, new_velocity: Vec2, dt: f32) -> Vec2 {
    position + (old_velocity + new_velocity) * (0.5 * dt)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    /// Simulate a held jump from the ground, returning (apex height, apex time).
    fn held_jump_apex(h: f32, t: f32, steps_to_peak: u32) -> (f32, f32) {
        let values = PlatformerValues {
            peak_height: h,
            time_to_peak: t,
            ..Default::default()
        };
        let kin = JumpKinematics::from_values(&values);
        let dt = t / steps_to_peak as f32;

        let mut y = 0.0f32;
        let mut vy = kin.jump_velocity;
        let mut best = (0.0f32, 0.0f32);
        for step in 1..=(steps_to_peak * 2) {
            let new_vy = vertical_step(vy, true, false, &kin, &values, dt);
            y += (vy + new_vy) * 0.5 * dt;
            vy = new_vy;
            if y > best.0 {
                best = (y, step as f32 * dt);
            }
        }
        best
    }

    #[test]
    fn test_derive_reference_values() {
        let kin = JumpKinematics::derive(4.0, 0.4);
        assert!((kin.gravity - -50.0).abs() < 1e-4);
        assert!((kin.jump_velocity - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_held_jump_peaks_at_height() {
        let (apex, at) = held_jump_apex(4.0, 0.4, 24);
        assert!((apex - 4.0).abs() < 1e-3, "apex {}", apex);
        assert!((at - 0.4).abs() < 1e-3, "time {}", at);
    }

    #[test]
    fn test_released_jump_is_lower() {
        let values = PlatformerValues::default();
        let kin = JumpKinematics::from_values(&values);

        let mut y = 0.0f32;
        let mut vy = kin.jump_velocity;
        let mut apex = 0.0f32;
        for _ in 0..120 {
            let new_vy = vertical_step(vy, false, false, &kin, &values, DT);
            y += (vy + new_vy) * 0.5 * DT;
            vy = new_vy;
            apex = apex.max(y);
        }
        assert!(apex < values.peak_height * 0.6);
    }

    #[test]
    fn test_grounded_sticks() {
        let values = PlatformerValues::default();
        let kin = JumpKinematics::from_values(&values);
        assert_eq!(vertical_step(-5.0, false, true, &kin, &values, DT), -0.1);
        assert_eq!(vertical_step(0.0, true, true, &kin, &values, DT), -0.1);
        // Take-off velocity is kept whole while the ground rays still hit
        let v0 = kin.jump_velocity;
        assert_eq!(vertical_step(v0, false, true, &kin, &values, DT), v0);
        assert_eq!(vertical_step(v0, true, true, &kin, &values, DT), v0);
    }

    #[test]
    fn test_fall_speed_limits() {
        let values = PlatformerValues::default();
        let kin = JumpKinematics::from_values(&values);

        let mut vy = 0.0;
        for _ in 0..600 {
            vy = vertical_step(vy, false, false, &kin, &values, DT);
        }
        assert_eq!(vy, values.max_fall_speed);

        let mut vy = 0.0;
        for _ in 0..600 {
            vy = vertical_step(vy, true, false, &kin, &values, DT);
        }
        assert_eq!(vy, values.glide_fall_limit);
    }

    #[test]
    fn test_horizontal_accelerates_and_faces() {
        let values = PlatformerValues::default();
        let mut smoothing = 0.0;
        let mut vx = 0.0;
        let mut facing = 1.0;
        for _ in 0..60 {
            let step = horizontal_step(vx, -1.0, &mut smoothing, &values, DT);
            vx = step.velocity_x;
            if let Some(f) = step.facing {
                facing = f;
            }
        }
        assert!((vx + values.max_speed).abs() < 0.01);
        assert_eq!(facing, -1.0);

        // Releasing keeps facing and decelerates
        let step = horizontal_step(vx, 0.0, &mut smoothing, &values, DT);
        assert!(step.facing.is_none());
        assert!(step.velocity_x > vx);
    }

    #[test]
    fn test_integrate_average_velocity() {
        let p = integrate(Vec2::ZERO, Vec2::new(0.0, 2.0), Vec2::new(2.0, 0.0), 1.0);
        assert_eq!(p, Vec2::new(1.0, 1.0));
    }

    proptest! {
        #[test]
        fn test_apex_matches_peak_height(
            h in 0.5f32..10.0,
            t in 0.1f32..1.5,
            steps in 8u32..90,
        ) {
            let (apex, at) = held_jump_apex(h, t, steps);
            prop_assert!((apex - h).abs() <= h * 1e-3 + 1e-4, "apex {} vs {}", apex, h);
            prop_assert!((at - t).abs() <= t / steps as f32 + 1e-4);
        }
    }
}
