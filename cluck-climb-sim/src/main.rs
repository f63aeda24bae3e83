//! Cluck Climb headless runner
//!
//! Plays a bot match on the deterministic simulation and checks that a
//! replay of the recorded inputs lands on the same state digest.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cluck_climb::{
    config::{seed_from_env, GameConfig},
    game::{
        events::GameEventData,
        input::{Buttons, InputFrame, InputScheme, KeyboardScheme},
        player::PlayerSlot,
        tick::{replay_match, tick, Recording, TickInputs},
    },
    MatchState, TICK_RATE, VERSION,
};

/// Give up after ten minutes of simulated play.
const TICK_LIMIT: u32 = TICK_RATE * 600;

const BOTS: [InputScheme; 4] = [
    InputScheme::Keyboard(KeyboardScheme::Keyboard1),
    InputScheme::Keyboard(KeyboardScheme::Keyboard2),
    InputScheme::Gamepad(0),
    InputScheme::Gamepad(1),
];

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Cluck Climb Sim v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = GameConfig::from_env().context("failed to load game config")?;
    let seed = seed_from_env().context("failed to read match seed")?;

    demo_match(&config, seed)
}

/// Scripted bot input: wander, hop, kick and drop whatever it carries.
fn bot_input(state: &MatchState, slot: PlayerSlot, t: u32) -> InputFrame {
    let phase = t + slot.0 as u32 * 37;
    let move_x = if (phase / 90) % 2 == 0 { 90 } else { -90 };
    let mut input = InputFrame::with_movement(move_x);

    let mut pressed = Buttons::empty();
    if phase % 45 == 0 {
        pressed |= Buttons::JUMP;
    }
    if phase % 40 == 7 {
        pressed |= Buttons::KICK;
    }
    if state.player(slot).is_some_and(|p| p.held_item.is_some()) && phase % 30 == 0 {
        pressed |= Buttons::PLACE;
    }
    input = input.press(pressed);
    if phase % 45 < 12 {
        input = input.hold(Buttons::JUMP);
    }
    input
}

/// Demo function to exercise the simulation.
fn demo_match(config: &GameConfig, seed: u64) -> Result<()> {
    info!("=== Starting Demo Match ===");
    info!("RNG Seed: {}", seed);

    let mut state = MatchState::new(config, seed);
    let mut recording = Recording {
        seed,
        joins: BOTS.to_vec(),
        frames: Vec::new(),
    };
    for scheme in BOTS {
        let slot = state.join_player(scheme, config).context("bot failed to join")?;
        info!("{} joined with {}", slot, scheme);
    }
    state.take_events();

    // Everyone clucks to ready up
    let mut inputs: TickInputs = state
        .joined()
        .map(|p| (p.slot, InputFrame::new().press(Buttons::CLUCK)))
        .collect();

    let mut total_events = 0;
    let mut champion = None;
    for t in 0..TICK_LIMIT {
        let result = tick(&mut state, &inputs, config);
        recording.frames.push(std::mem::take(&mut inputs));
        total_events += result.events.len();

        // Log important events
        for event in &result.events {
            match &event.data {
                GameEventData::PhaseChanged { from, to } => {
                    info!("Tick {}: {:?} -> {:?}", state.tick, from, to);
                }
                GameEventData::PlayerEliminated { slot, cause, alive_left } => {
                    info!("{} eliminated ({:?}), {} left", slot, cause, alive_left);
                }
                GameEventData::RoundWon { slot, rounds_won } => {
                    info!("{} wins round {} ({} won)", slot, state.round, rounds_won);
                }
                GameEventData::ItemAcquired { slot, prefab, .. } => {
                    if let Some(spec) = config.catalog.get(prefab.0 as usize) {
                        info!("{} got a {}", slot, spec.name);
                    }
                }
                _ => {}
            }
        }

        if result.match_ended {
            info!("Match ended at tick {}", t);
            champion = result.winner;
            break;
        }

        inputs = state.joined().map(|p| (p.slot, bot_input(&state, p.slot, t))).collect();
    }

    // Print final results
    info!("=== Match Results ===");
    match champion {
        Some(slot) => info!("Champion: {}", slot),
        None => info!("No champion after {} ticks", TICK_LIMIT),
    }
    for player in state.joined() {
        info!("{}: {} rounds", player.slot, player.rounds_won);
    }
    let hash = state.digest();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Total events: {}", total_events);

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let (replayed, _) = replay_match(config, &recording).context("replay failed to join")?;
    let replay_hash = replayed.digest();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("replay diverged from live run");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
