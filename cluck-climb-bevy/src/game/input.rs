//! Device joining and per-slot input sampling
//!
//! Two players share the keyboard (left and right halves), everyone else
//! brings a gamepad. Presses are latched every frame and handed to the next
//! fixed step so no press is lost or doubled.

use bevy::input::gamepad::{GamepadConnection, GamepadConnectionEvent};
use bevy::prelude::*;

use cluck_climb::game::input::{Buttons, InputFrame, InputScheme, KeyboardScheme};
use cluck_climb::game::tick::TickInputs;
use cluck_climb::{PlayerSlot, MAX_PLAYERS};

use super::SimWorld;

/// Stick values inside this radius count as centred.
const STICK_DEADZONE: f32 = 0.2;

// ============================================================================
// BINDINGS
// ============================================================================

/// Keys for one half of the keyboard
pub struct KeyBindings {
    pub left: KeyCode,
    pub right: KeyCode,
    pub jump: KeyCode,
    pub place: KeyCode,
    pub kick: KeyCode,
    /// Also the join key
    pub cluck: KeyCode,
}

impl KeyBindings {
    pub fn for_scheme(scheme: KeyboardScheme) -> Self {
        match scheme {
            KeyboardScheme::Keyboard1 => Self {
                left: KeyCode::KeyA,
                right: KeyCode::KeyD,
                jump: KeyCode::KeyW,
                place: KeyCode::KeyS,
                kick: KeyCode::KeyQ,
                cluck: KeyCode::KeyE,
            },
            KeyboardScheme::Keyboard2 => Self {
                left: KeyCode::ArrowLeft,
                right: KeyCode::ArrowRight,
                jump: KeyCode::ArrowUp,
                place: KeyCode::ArrowDown,
                kick: KeyCode::ControlRight,
                cluck: KeyCode::ShiftRight,
            },
        }
    }

    fn buttons(&self, keyboard: &ButtonInput<KeyCode>, just: bool) -> Buttons {
        let check = |key: KeyCode| if just { keyboard.just_pressed(key) } else { keyboard.pressed(key) };
        let mut buttons = Buttons::empty();
        buttons.set(Buttons::JUMP, check(self.jump));
        buttons.set(Buttons::PLACE, check(self.place));
        buttons.set(Buttons::KICK, check(self.kick));
        buttons.set(Buttons::CLUCK, check(self.cluck));
        buttons
    }

    fn axis(&self, keyboard: &ButtonInput<KeyCode>) -> f32 {
        let mut axis = 0.0;
        if keyboard.pressed(self.left) {
            axis -= 1.0;
        }
        if keyboard.pressed(self.right) {
            axis += 1.0;
        }
        axis
    }
}

fn gamepad_buttons(gamepad: &Gamepad, just: bool) -> Buttons {
    let check = |button: GamepadButton| if just { gamepad.just_pressed(button) } else { gamepad.pressed(button) };
    let mut buttons = Buttons::empty();
    buttons.set(Buttons::JUMP, check(GamepadButton::South));
    buttons.set(Buttons::PLACE, check(GamepadButton::West));
    buttons.set(Buttons::KICK, check(GamepadButton::East));
    buttons.set(Buttons::CLUCK, check(GamepadButton::North) || check(GamepadButton::Start));
    buttons
}

fn gamepad_axis(gamepad: &Gamepad) -> f32 {
    let stick = gamepad.left_stick().x;
    if stick.abs() > STICK_DEADZONE {
        return stick;
    }
    let mut axis = 0.0;
    if gamepad.pressed(GamepadButton::DPadLeft) {
        axis -= 1.0;
    }
    if gamepad.pressed(GamepadButton::DPadRight) {
        axis += 1.0;
    }
    axis
}

fn slot_of(sim: &SimWorld, scheme: InputScheme) -> Option<PlayerSlot> {
    sim.state.joined().find(|p| p.scheme == scheme).map(|p| p.slot)
}

// ============================================================================
// RESOURCES
// ============================================================================

/// Presses seen since the last fixed step, per slot.
#[derive(Resource, Default)]
pub struct PendingPresses(pub [Buttons; MAX_PLAYERS]);

// ============================================================================
// SYSTEMS
// ============================================================================

/// Latch this frame's presses for joined players.
pub fn collect_presses(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<(Entity, &Gamepad)>,
    sim: Res<SimWorld>,
    mut pending: ResMut<PendingPresses>,
) {
    for player in sim.state.joined() {
        let pressed = match player.scheme {
            InputScheme::Keyboard(scheme) => KeyBindings::for_scheme(scheme).buttons(&keyboard, true),
            InputScheme::Gamepad(id) => gamepads
                .iter()
                .find(|(entity, _)| entity.index() == id)
                .map(|(_, gamepad)| gamepad_buttons(gamepad, true))
                .unwrap_or_default(),
        };
        pending.0[player.slot.index()] |= pressed;
    }
}

/// Join with E, Right Shift or a gamepad's Start while in the lobby.
pub fn join_devices(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<(Entity, &Gamepad)>,
    mut sim: ResMut<SimWorld>,
) {
    let mut wanting = Vec::new();
    for scheme in [KeyboardScheme::Keyboard1, KeyboardScheme::Keyboard2] {
        if keyboard.just_pressed(KeyBindings::for_scheme(scheme).cluck) {
            wanting.push(InputScheme::Keyboard(scheme));
        }
    }
    for (entity, gamepad) in &gamepads {
        if gamepad.just_pressed(GamepadButton::Start) {
            wanting.push(InputScheme::Gamepad(entity.index()));
        }
    }

    let sim = &mut *sim;
    for scheme in wanting {
        if slot_of(sim, scheme).is_some() {
            continue;
        }
        match sim.state.join_player(scheme, &sim.config) {
            Ok(slot) => info!("{} joined with {}", slot, scheme),
            Err(err) => debug!("Join refused for {}: {}", scheme, err),
        }
    }
}

/// Free the slot of a gamepad that went away.
pub fn drop_disconnected(mut connections: EventReader<GamepadConnectionEvent>, mut sim: ResMut<SimWorld>) {
    for event in connections.read() {
        if !matches!(event.connection, GamepadConnection::Disconnected) {
            continue;
        }
        let Some(slot) = slot_of(&sim, InputScheme::Gamepad(event.gamepad.index())) else {
            continue;
        };
        match sim.state.remove_player(slot) {
            Ok(()) => info!("{} left (gamepad disconnected)", slot),
            Err(err) => warn!("Could not remove {}: {}", slot, err),
        }
    }
}

/// Build the frame for every joined slot and clear the latched presses.
pub fn take_inputs(
    keyboard: &ButtonInput<KeyCode>,
    gamepads: &Query<(Entity, &Gamepad)>,
    sim: &SimWorld,
    pending: &mut PendingPresses,
) -> TickInputs {
    let mut inputs = TickInputs::new();
    for player in sim.state.joined() {
        let (axis, held) = match player.scheme {
            InputScheme::Keyboard(scheme) => {
                let keys = KeyBindings::for_scheme(scheme);
                (keys.axis(keyboard), keys.buttons(keyboard, false))
            }
            InputScheme::Gamepad(id) => gamepads
                .iter()
                .find(|(entity, _)| entity.index() == id)
                .map(|(_, gamepad)| (gamepad_axis(gamepad), gamepad_buttons(gamepad, false)))
                .unwrap_or_default(),
        };

        let pressed = std::mem::take(&mut pending.0[player.slot.index()]);
        let frame = InputFrame::with_movement(InputFrame::quantize_axis(axis))
            .hold(held)
            .press(pressed);
        inputs.insert(player.slot, frame);
    }
    inputs
}
