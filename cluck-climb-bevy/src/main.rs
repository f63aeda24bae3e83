//! Cluck Climb - Local Multiplayer Party Platformer
//!
//! Up to four chickens share a keyboard and gamepads, break capsules for
//! blocks, bombs and springs, and climb away from the rising camera.

mod game;
mod ui;

use bevy::prelude::*;
use bevy::render::camera::ScalingMode;
use bevy::window::WindowMode;

use cluck_climb::config::{seed_from_env, GameConfig};
use cluck_climb::{MatchPhase, MatchState, TICK_RATE};

use game::{GamePlugin, MainCamera, SimWorld};
use ui::UiPlugin;

/// App states, mirrored from the match phase.
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Menu,
    Prepare,
    Game,
    Win,
}

impl From<MatchPhase> for AppState {
    fn from(phase: MatchPhase) -> Self {
        match phase {
            MatchPhase::Menu => AppState::Menu,
            MatchPhase::Prepare => AppState::Prepare,
            MatchPhase::Game => AppState::Game,
            MatchPhase::Win => AppState::Win,
        }
    }
}

/// How the session was configured, logged once logging is up.
#[derive(Resource)]
struct LaunchReport {
    config_error: Option<String>,
    seed: u64,
}

fn main() {
    let (config, config_error) = match GameConfig::from_env() {
        Ok(config) => (config, None),
        Err(err) => (GameConfig::default(), Some(err.to_string())),
    };
    let seed = seed_from_env().unwrap_or_else(|_| rand::random());

    App::new()
        // Bevy defaults with custom window
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Cluck Climb".into(),
                resolution: (1280., 720.).into(),
                mode: WindowMode::Windowed,
                ..default()
            }),
            ..default()
        }))
        // Simulation runs at its own fixed rate
        .insert_resource(Time::<Fixed>::from_hz(TICK_RATE as f64))
        .insert_resource(SimWorld {
            state: MatchState::new(&config, seed),
            config,
        })
        .insert_resource(LaunchReport { config_error, seed })
        .init_state::<AppState>()
        // Our plugins
        .add_plugins((GamePlugin, UiPlugin))
        // Startup
        .add_systems(Startup, (log_launch, setup_2d_camera))
        .run();
}

fn log_launch(report: Res<LaunchReport>) {
    if let Some(err) = &report.config_error {
        warn!("Config error ({}), using defaults", err);
    }
    info!("Match seed {}", report.seed);
}

/// 2D camera sized by the rig's orthographic half-height
fn setup_2d_camera(mut commands: Commands, sim: Res<SimWorld>) {
    let ortho_size = sim.state.camera.ortho_size;
    commands.spawn((
        Camera2d,
        Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.55, 0.78, 0.95)), // Sky
            ..default()
        },
        OrthographicProjection {
            scaling_mode: ScalingMode::FixedVertical { viewport_height: ortho_size * 2.0 },
            near: -1000.0,
            far: 1000.0,
            ..OrthographicProjection::default_2d()
        },
        MainCamera,
    ));

    info!("Cluck Climb initialized with seed {}", sim.state.rng_seed);
}
