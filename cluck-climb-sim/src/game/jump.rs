//! Jump Buffer / Coyote Timer
//!
//! Two countdowns reconcile human timing with frame-exact ground contact:
//! a press is remembered for `jump_buffer_time`, and the ground is remembered
//! for `coyote_time` after walking off a ledge. A jump needs both.

use serde::{Serialize, Deserialize};

use crate::config::PlatformerValues;

/// Per-player jump timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpTimers {
    /// Remaining buffered-press time (s)
    pub buffer: f32,
    /// Remaining coyote time (s)
    pub coyote: f32,
}

impl JumpTimers {
    /// Remember a jump press.
    pub fn press(&mut self, values: &PlatformerValues) {
        self.buffer = values.jump_buffer_time;
    }

    /// Advance both timers by one step.
    pub fn update(&mut self, grounded: bool, values: &PlatformerValues, dt: f32) {
        if self.buffer > 0.0 {
            self.buffer -= dt;
        }
        if grounded {
            self.coyote = values.coyote_time;
        } else {
            self.coyote -= dt;
        }
    }

    /// Whether a jump fires now.
    pub fn can_jump(&self, head_blocked: bool) -> bool {
        self.buffer > 0.0 && self.coyote > 0.0 && !head_blocked
    }

    /// Consume a jump if one is due. Zeroes both timers when it fires.
    pub fn try_consume(&mut self, head_blocked: bool) -> bool {
        if self.can_jump(head_blocked) {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Zero both timers.
    pub fn clear(&mut self) {
        self.buffer = 0.0;
        self.coyote = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_jump_needs_both_timers() {
        let values = PlatformerValues::default();
        let mut timers = JumpTimers::default();

        // Grounded but no press
        timers.update(true, &values, DT);
        assert!(!timers.can_jump(false));

        // Press while grounded
        timers.press(&values);
        assert!(timers.can_jump(false));
        assert!(!timers.can_jump(true));
    }

    #[test]
    fn test_consume_is_idempotent() {
        let values = PlatformerValues::default();
        let mut timers = JumpTimers::default();
        timers.update(true, &values, DT);
        timers.press(&values);

        assert!(timers.try_consume(false));
        assert_eq!(timers, JumpTimers::default());

        // Next tick, still grounded, no new press
        timers.update(true, &values, DT);
        assert!(!timers.try_consume(false));
    }

    #[test]
    fn test_coyote_window() {
        let values = PlatformerValues::default();
        let mut timers = JumpTimers::default();
        timers.update(true, &values, DT);

        // Walk off a ledge: 0.1 s later a press still jumps
        for _ in 0..6 {
            timers.update(false, &values, DT);
        }
        timers.press(&values);
        assert!(timers.can_jump(false));

        // 0.2 s later it does not
        let mut late = JumpTimers::default();
        late.update(true, &values, DT);
        for _ in 0..12 {
            late.update(false, &values, DT);
        }
        late.press(&values);
        assert!(!late.can_jump(false));
    }

    #[test]
    fn test_buffered_press_lands() {
        let values = PlatformerValues::default();
        let mut timers = JumpTimers::default();

        // Press in the air, land 0.1 s later
        timers.press(&values);
        for _ in 0..6 {
            timers.update(false, &values, DT);
        }
        timers.update(true, &values, DT);
        assert!(timers.try_consume(false));
    }
}
