//! Input Capture and Normalization
//!
//! One `InputFrame` per occupied slot per tick. The host samples its devices,
//! quantises the horizontal axis to an `i8` and reports which buttons are held
//! and which went down since the previous tick.

use serde::{Serialize, Deserialize};
use bitflags::bitflags;

bitflags! {
    /// Action buttons.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        /// Jump (held = glide / full-height jump)
        const JUMP = 0b0000_0001;
        /// Place the held item
        const PLACE = 0b0000_0010;
        /// Kick
        const KICK = 0b0000_0100;
        /// Cluck (toggles ready in the lobby)
        const CLUCK = 0b0000_1000;
    }
}

/// Raw input state for a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Horizontal axis: -127 (left) to +127 (right).
    /// -128 = stick released / no input
    pub move_x: i8,

    /// Buttons currently down
    pub held: Buttons,

    /// Buttons that went down this tick
    pub pressed: Buttons,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Special value indicating no input (stick released)
    pub const NO_INPUT: i8 = -128;

    /// Create a new empty input frame.
    pub const fn new() -> Self {
        Self {
            move_x: Self::NO_INPUT,
            held: Buttons::empty(),
            pressed: Buttons::empty(),
        }
    }

    /// Create input with a horizontal direction.
    pub const fn with_movement(move_x: i8) -> Self {
        Self {
            move_x,
            held: Buttons::empty(),
            pressed: Buttons::empty(),
        }
    }

    /// Quantise a float axis in [-1, 1].
    pub fn quantize_axis(axis: f32) -> i8 {
        if axis.abs() < f32::EPSILON {
            return Self::NO_INPUT;
        }
        (axis.clamp(-1.0, 1.0) * 127.0).round() as i8
    }

    /// Builder: mark buttons as pressed this tick (implies held).
    pub fn press(mut self, buttons: Buttons) -> Self {
        self.pressed |= buttons;
        self.held |= buttons;
        self
    }

    /// Builder: mark buttons as held.
    pub fn hold(mut self, buttons: Buttons) -> Self {
        self.held |= buttons;
        self
    }

    /// Horizontal axis in [-1, 1].
    #[inline]
    pub fn axis(&self) -> f32 {
        if self.move_x == Self::NO_INPUT {
            0.0
        } else {
            self.move_x as f32 / 127.0
        }
    }

    /// Check if jump went down this tick.
    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.pressed.contains(Buttons::JUMP)
    }

    /// Check if jump is held.
    #[inline]
    pub fn jump_held(&self) -> bool {
        self.held.contains(Buttons::JUMP)
    }

    /// Check if place went down this tick.
    #[inline]
    pub fn place_pressed(&self) -> bool {
        self.pressed.contains(Buttons::PLACE)
    }

    /// Check if kick went down this tick.
    #[inline]
    pub fn kick_pressed(&self) -> bool {
        self.pressed.contains(Buttons::KICK)
    }

    /// Check if cluck went down this tick.
    #[inline]
    pub fn cluck_pressed(&self) -> bool {
        self.pressed.contains(Buttons::CLUCK)
    }

    /// Check if this is an idle frame (no input).
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.move_x == Self::NO_INPUT && self.held.is_empty() && self.pressed.is_empty()
    }
}

// =============================================================================
// INPUT SCHEMES
// =============================================================================

/// Keyboard layouts two players can share one keyboard with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyboardScheme {
    /// Left half of the keyboard, joined with E
    Keyboard1,
    /// Right half of the keyboard, joined with Right Shift
    Keyboard2,
}

/// Device a player joined with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InputScheme {
    /// Shared keyboard
    Keyboard(KeyboardScheme),
    /// Gamepad, by host device id
    Gamepad(u32),
}

impl std::fmt::Display for InputScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputScheme::Keyboard(k) => write!(f, "{:?}", k),
            InputScheme::Gamepad(id) => write!(f, "Gamepad{}", id),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_frame_default() {
        let frame = InputFrame::new();
        assert_eq!(frame.move_x, InputFrame::NO_INPUT);
        assert!(frame.is_idle());
        assert_eq!(frame.axis(), 0.0);
    }

    #[test]
    fn test_axis_quantization() {
        assert_eq!(InputFrame::quantize_axis(1.0), 127);
        assert_eq!(InputFrame::quantize_axis(-1.0), -127);
        assert_eq!(InputFrame::quantize_axis(0.0), InputFrame::NO_INPUT);
        assert_eq!(InputFrame::quantize_axis(5.0), 127);

        assert_eq!(InputFrame::with_movement(127).axis(), 1.0);
        assert_eq!(InputFrame::with_movement(-127).axis(), -1.0);
    }

    #[test]
    fn test_press_implies_held() {
        let frame = InputFrame::new().press(Buttons::JUMP).hold(Buttons::KICK);
        assert!(frame.jump_pressed());
        assert!(frame.jump_held());
        assert!(!frame.kick_pressed());
        assert!(frame.held.contains(Buttons::KICK));
        assert!(!frame.is_idle());
    }

    #[test]
    fn test_scheme_display() {
        assert_eq!(InputScheme::Keyboard(KeyboardScheme::Keyboard1).to_string(), "Keyboard1");
        assert_eq!(InputScheme::Gamepad(3).to_string(), "Gamepad3");
    }
}
