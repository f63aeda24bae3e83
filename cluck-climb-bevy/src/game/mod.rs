//! Game module - drives the Cluck Climb simulation
//!
//! The simulation is authoritative. Each fixed step samples input, runs one
//! tick, mirrors the match phase into `AppState` and rebroadcasts the tick's
//! events for visuals, audio and UI.

use bevy::app::{AppExit, RunFixedMainLoop, RunFixedMainLoopSystem};
use bevy::prelude::*;

use cluck_climb::game::events::GameEvent;
use cluck_climb::game::tick::tick;
use cluck_climb::{GameConfig, MatchState};

use crate::AppState;

pub mod audio;
pub mod components;
pub mod input;
pub mod visuals;

pub use components::*;
pub use input::PendingPresses;

// ============================================================================
// RESOURCES
// ============================================================================

/// The running match and its tuning
#[derive(Resource)]
pub struct SimWorld {
    pub state: MatchState,
    pub config: GameConfig,
}

// ============================================================================
// EVENTS
// ============================================================================

/// A simulation event, forwarded to Bevy systems
#[derive(Event, Clone, Debug)]
pub struct SimEvent(pub GameEvent);

// ============================================================================
// GAME PLUGIN
// ============================================================================

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app
            // Resources
            .init_resource::<PendingPresses>()
            .init_resource::<audio::CurrentTrack>()

            // Events
            .add_event::<SimEvent>()

            // Scene
            .add_systems(Startup, visuals::spawn_arena)

            // Presses are latched once per frame, before any fixed steps run
            .add_systems(
                RunFixedMainLoop,
                input::collect_presses.in_set(RunFixedMainLoopSystem::BeforeFixedMainLoop),
            )

            // Simulation (fixed timestep)
            .add_systems(FixedUpdate, step_simulation)

            // Devices, presentation and effects (variable timestep)
            .add_systems(Update, (
                input::join_devices.run_if(in_state(AppState::Menu)),
                input::drop_disconnected,
                visuals::spawn_missing_sprites,
                visuals::sync_chickens,
                visuals::sync_items,
                visuals::sync_capsules,
                visuals::sync_camera,
                visuals::spawn_bursts,
                visuals::update_particles,
                audio::play_cues,
            ))
            .add_systems(Last, log_session_digest);
    }
}

// ============================================================================
// SIMULATION STEP
// ============================================================================

/// Run one tick with the latest input.
fn step_simulation(
    keyboard: Res<ButtonInput<KeyCode>>,
    gamepads: Query<(Entity, &Gamepad)>,
    mut sim: ResMut<SimWorld>,
    mut pending: ResMut<PendingPresses>,
    mut events: EventWriter<SimEvent>,
    state: Res<State<AppState>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let inputs = input::take_inputs(&keyboard, &gamepads, &sim, &mut pending);

    let sim = &mut *sim;
    let result = tick(&mut sim.state, &inputs, &sim.config);

    if result.match_ended {
        if let Some(winner) = result.winner {
            info!("{} wins the match!", winner);
        }
    }
    events.send_batch(result.events.into_iter().map(SimEvent));

    let phase = AppState::from(result.phase);
    if *state.get() != phase {
        next_state.set(phase);
    }
}

/// Log the final digest so sessions can be compared.
fn log_session_digest(mut exits: EventReader<AppExit>, sim: Res<SimWorld>) {
    if exits.read().next().is_some() {
        info!(
            "Session ended at tick {} with digest {}",
            sim.state.tick,
            hex::encode(sim.state.digest())
        );
    }
}
