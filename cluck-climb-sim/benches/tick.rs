//! Tick throughput with four players mid-round.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cluck_climb::{
    config::GameConfig,
    game::{
        input::{Buttons, InputFrame, InputScheme, KeyboardScheme},
        player::PlayerSlot,
        tick::{tick, TickInputs},
    },
    MatchPhase, MatchState,
};

fn running_match(config: &GameConfig) -> MatchState {
    let mut state = MatchState::new(config, 42);
    for scheme in [
        InputScheme::Keyboard(KeyboardScheme::Keyboard1),
        InputScheme::Keyboard(KeyboardScheme::Keyboard2),
        InputScheme::Gamepad(0),
        InputScheme::Gamepad(1),
    ] {
        state.join_player(scheme, config).unwrap();
    }

    let clucks: TickInputs = (0..4)
        .map(|slot| (PlayerSlot(slot), InputFrame::new().press(Buttons::CLUCK)))
        .collect();
    tick(&mut state, &clucks, config);
    while state.phase != MatchPhase::Game {
        tick(&mut state, &TickInputs::new(), config);
    }
    state
}

fn bench_tick(c: &mut Criterion) {
    let config = GameConfig::default();
    let state = running_match(&config);
    let inputs: TickInputs = (0..4u8)
        .map(|slot| {
            let dir = if slot % 2 == 0 { 100 } else { -100 };
            (PlayerSlot(slot), InputFrame::with_movement(dir).hold(Buttons::JUMP))
        })
        .collect();

    c.bench_function("tick_4_players", |b| {
        b.iter_batched(
            || state.clone(),
            |mut state| {
                for _ in 0..60 {
                    black_box(tick(&mut state, &inputs, &config));
                }
                state
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
