//! UI module - lobby title, slot panels and countdown overlay
//!
//! Everything shown here is read from the simulation's UI model; the UI
//! never changes match state itself.

use bevy::prelude::*;

use cluck_climb::game::ui::{PlayerUiState, SlotPanel};
use cluck_climb::MAX_PLAYERS;

use crate::game::SimWorld;
use crate::AppState;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app
            .add_systems(Startup, setup_hud)
            .add_systems(OnEnter(AppState::Menu), setup_main_menu)
            .add_systems(OnExit(AppState::Menu), cleanup_main_menu)
            .add_systems(Update, (
                handle_menu_input.run_if(in_state(AppState::Menu)),
                update_panels,
                update_overlay,
            ));
    }
}

/// Marker for main menu UI
#[derive(Component)]
struct MainMenuUI;

/// Lobby dimming layer
#[derive(Component)]
struct DimLayer;

/// Countdown text
#[derive(Component)]
struct CountdownText;

/// Text of one slot panel
#[derive(Component)]
struct PanelText(usize);

/// Panel colours per slot
const PANEL_COLORS: [Color; MAX_PLAYERS] = [
    Color::srgb(0.9, 0.9, 0.9),
    Color::srgb(1.0, 0.85, 0.3),
    Color::srgb(0.95, 0.55, 0.2),
    Color::srgb(0.7, 0.5, 0.35),
];

fn panel_label(slot: usize, panel: &SlotPanel) -> String {
    match panel.state {
        PlayerUiState::WaitJoin => "Press to join".to_string(),
        PlayerUiState::Joined => format!("P{}\nCluck when ready", slot + 1),
        PlayerUiState::Ready => format!("P{}\nREADY!", slot + 1),
        PlayerUiState::InGame => format!("P{}", slot + 1),
        PlayerUiState::Dead => format!("P{}\nOUT", slot + 1),
        PlayerUiState::NotPlayer => String::new(),
        PlayerUiState::Round => format!("P{}\n{} won", slot + 1, panel.rounds_won),
        PlayerUiState::Results => match panel.rank {
            Some(rank) => format!("P{}\n{}", slot + 1, rank.label()),
            None => format!("P{}", slot + 1),
        },
    }
}

/// Dim layer, countdown overlay and the four slot panels
fn setup_hud(mut commands: Commands) {
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            position_type: PositionType::Absolute,
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.45)),
        DimLayer,
    ));

    // Countdown (center)
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            position_type: PositionType::Absolute,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
    )).with_children(|parent| {
        parent.spawn((
            Text::new(""),
            TextFont {
                font_size: 96.0,
                ..default()
            },
            TextColor(Color::WHITE),
            CountdownText,
        ));
    });

    // Slot panels (bottom row)
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            height: Val::Px(110.0),
            position_type: PositionType::Absolute,
            bottom: Val::Px(0.0),
            left: Val::Px(0.0),
            padding: UiRect::all(Val::Px(10.0)),
            flex_direction: FlexDirection::Row,
            justify_content: JustifyContent::SpaceEvenly,
            align_items: AlignItems::Center,
            ..default()
        },
    )).with_children(|parent| {
        for slot in 0..MAX_PLAYERS {
            parent.spawn((
                Node {
                    width: Val::Px(220.0),
                    height: Val::Px(90.0),
                    justify_content: JustifyContent::Center,
                    align_items: AlignItems::Center,
                    border: UiRect::all(Val::Px(2.0)),
                    ..default()
                },
                BorderColor(PANEL_COLORS[slot]),
                BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            )).with_children(|panel| {
                panel.spawn((
                    Text::new(""),
                    TextFont {
                        font_size: 22.0,
                        ..default()
                    },
                    TextColor(PANEL_COLORS[slot]),
                    TextLayout::new_with_justify(JustifyText::Center),
                    PanelText(slot),
                ));
            });
        }
    });
}

/// Title and controls while in the lobby
fn setup_main_menu(mut commands: Commands) {
    commands.spawn((
        Node {
            width: Val::Percent(100.0),
            position_type: PositionType::Absolute,
            top: Val::Px(60.0),
            flex_direction: FlexDirection::Column,
            align_items: AlignItems::Center,
            ..default()
        },
        MainMenuUI,
    )).with_children(|parent| {
        // Title
        parent.spawn((
            Text::new("CLUCK CLIMB"),
            TextFont {
                font_size: 72.0,
                ..default()
            },
            TextColor(Color::srgb(1.0, 0.85, 0.3)),
            Node {
                margin: UiRect::bottom(Val::Px(10.0)),
                ..default()
            },
        ));

        // Instructions
        parent.spawn((
            Text::new("Join: E | Right Shift | Start    Cluck to ready up    ESC to quit"),
            TextFont {
                font_size: 18.0,
                ..default()
            },
            TextColor(Color::srgb(0.95, 0.95, 1.0)),
        ));
    });
}

fn cleanup_main_menu(
    mut commands: Commands,
    query: Query<Entity, With<MainMenuUI>>,
) {
    for entity in query.iter() {
        commands.entity(entity).despawn_recursive();
    }
}

fn handle_menu_input(keyboard: Res<ButtonInput<KeyCode>>, mut exit: EventWriter<AppExit>) {
    if keyboard.just_pressed(KeyCode::Escape) {
        info!("Quit from lobby");
        exit.send(AppExit::Success);
    }
}

/// Panel text from the UI model
fn update_panels(sim: Res<SimWorld>, mut query: Query<(&PanelText, &mut Text)>) {
    for (panel, mut text) in query.iter_mut() {
        let label = panel_label(panel.0, sim.state.ui.panel(panel.0));
        if **text != label {
            **text = label;
        }
    }
}

/// Countdown text and lobby dimming
fn update_overlay(
    sim: Res<SimWorld>,
    mut countdown: Query<&mut Text, With<CountdownText>>,
    mut dim: Query<&mut Visibility, With<DimLayer>>,
) {
    let ui = &sim.state.ui;
    if let Ok(mut text) = countdown.get_single_mut() {
        let label = ui.countdown_text.as_deref().unwrap_or_default();
        if **text != label {
            **text = label.to_string();
        }
    }
    if let Ok(mut visibility) = dim.get_single_mut() {
        *visibility = if ui.dim_background { Visibility::Inherited } else { Visibility::Hidden };
    }
}
