//! Simulation Tick
//!
//! One fixed step of the whole match. Players are visited in slot order and
//! items and capsules in id order; all randomness comes from `state.rng`.
//! Two runs fed the same seed, joins and inputs produce the same digest.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Deserialize};
#[cfg(feature = "debug-tracing")]
use tracing::trace;
use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::core::vec2::Vec2;
use crate::game::arena::platform_colliders;
use crate::game::bomb::{plan_explosion, BlastEffect, BombState, FuseTimer};
use crate::game::camera::CameraTarget;
use crate::game::capsule::{CapsuleId, DamageOutcome};
use crate::game::collision::{Aabb, Body, CollisionScene, Layer};
use crate::game::events::{DeathCause, GameEvent, GameEventData, SoundCue};
use crate::game::holdable::{BodyType, Item, ItemBehavior, ItemId, PrefabId};
use crate::game::input::{InputFrame, InputScheme};
use crate::game::movement::JumpKinematics;
use crate::game::player::PlayerSlot;
use crate::game::probe::probe;
use crate::game::spring::{bounce_impulse, damp_velocity, should_sleep};
use crate::game::state::{JoinError, MatchPhase, MatchSignal, MatchState};
use crate::TICK_DT;

/// How far outside its body a player still counts as touching a spring.
const CONTACT_SKIN: f32 = 0.05;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, ordered by (tick, priority, slot)
    pub events: Vec<GameEvent>,
    /// Phase after the tick
    pub phase: MatchPhase,
    /// Whether a match was won this tick
    pub match_ended: bool,
    /// Match winner, if the match was won this tick
    pub winner: Option<PlayerSlot>,
}

/// Inputs for one tick, by slot.
pub type TickInputs = BTreeMap<PlayerSlot, InputFrame>;

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The match state (will be mutated)
/// * `inputs` - Inputs per occupied slot; missing slots count as idle
/// * `config` - Game tuning
pub fn tick(state: &mut MatchState, inputs: &TickInputs, config: &GameConfig) -> TickResult {
    let mut result = TickResult::default();
    let dt = TICK_DT;
    let kinematics = JumpKinematics::from_values(&config.platformer);

    // 0. Advance tick counter
    state.tick += 1;

    #[cfg(feature = "debug-tracing")]
    trace!("tick {} phase {:?}", state.tick, state.phase);

    // 1. Snapshot colliders
    let mut scene = build_scene(state, config);

    // 2-3. Players move and act, except during the countdown
    if state.phase != MatchPhase::Prepare {
        update_players(state, &mut scene, inputs, &kinematics, config, dt);
        process_actions(state, &mut scene, inputs, config);
    }

    // 4. Cluck, which doubles as the lobby ready toggle
    process_clucks(state, inputs);

    // 5. Carried items follow their holders
    update_held_items(state, &mut scene, config);

    // 6. Placed items fall and settle
    update_dynamic_items(state, &mut scene, config, dt);

    // 7. Capsules fall
    update_capsules(state, &mut scene, config, dt);

    // 8. Springs bounce new contacts
    process_springs(state, config, dt);

    // 9. Fuses burn and bombs explode
    process_bombs(state, &mut scene, config, dt);

    // 10. Appear animations and consumed items
    update_item_timers(state, dt);

    // 11. Spawn capsules above the view
    spawn_capsules(state, config, dt);

    // 12. Players below the camera fall out
    check_kill_line(state, config);

    // 13. Camera follows the climb
    update_camera(state, config, dt);

    // 14. Match flow reacts to this tick's signals and timers
    state.process_signals(config);
    state.update_flow(config, dt);

    // Collect events
    result.events = state.take_events();
    result.events.sort();
    for event in &result.events {
        if let GameEventData::MatchWon { slot } = event.data {
            result.match_ended = true;
            result.winner = Some(slot);
        }
    }
    result.phase = state.phase;

    result
}

/// Colliders for the arena, active players, items and capsules.
fn build_scene(state: &MatchState, config: &GameConfig) -> CollisionScene {
    let mut scene = CollisionScene::new();
    for collider in platform_colliders(&config.arena) {
        scene.push(collider);
    }
    for player in state.joined().filter(|p| p.is_active()) {
        scene.push(player.collider(&config.player));
    }
    for item in state.items.values() {
        for collider in item.colliders() {
            scene.push(collider);
        }
    }
    for capsule in state.capsules.values() {
        if let Some(collider) = capsule.collider(&config.capsule) {
            scene.push(collider);
        }
    }
    scene
}

// =============================================================================
// PLAYERS
// =============================================================================

/// Timers, probe, jump, motor and resolution for every active player.
fn update_players(
    state: &mut MatchState,
    scene: &mut CollisionScene,
    inputs: &TickInputs,
    kinematics: &JumpKinematics,
    config: &GameConfig,
    dt: f32,
) {
    let tick = state.tick;

    for player in state.players.iter_mut().flatten() {
        if !player.is_active() {
            continue;
        }
        let input = inputs.get(&player.slot).copied().unwrap_or_default();

        player.update_timers(&input, &config.platformer, dt);
        let contact = probe(scene, player.body(), player.position, &config.probe);
        if player.apply_probe(contact, kinematics) {
            let slot = player.slot;
            state.pending_events.push(GameEvent::movement(tick, GameEventData::PlayerJumped { slot }));
            state.pending_events.push(GameEvent::sound(tick, SoundCue::Jump));
        }

        let delta = player.motor_step(&input, &config.platformer, kinematics, dt);
        let moved = scene.move_body(player.body(), delta, Layer::PLAYER_SOLID);
        player.apply_move(moved);
        player.update_kick(dt);
    }
}

/// Place and kick presses, then open kick windows.
fn process_actions(state: &mut MatchState, scene: &mut CollisionScene, inputs: &TickInputs, config: &GameConfig) {
    let active: Vec<PlayerSlot> = state.joined().filter(|p| p.is_active()).map(|p| p.slot).collect();

    for slot in active {
        let input = inputs.get(&slot).copied().unwrap_or_default();
        if input.place_pressed() {
            try_place(state, scene, slot, config);
        }
        if input.kick_pressed() {
            start_kick(state, slot, config);
        }
        resolve_kick(state, scene, slot, config);
    }
}

fn process_clucks(state: &mut MatchState, inputs: &TickInputs) {
    for (slot, input) in inputs {
        if !input.cluck_pressed() || state.player(*slot).is_none() {
            continue;
        }
        state.push_event(GameEvent::sound(state.tick, SoundCue::Cluck));
        if state.can_toggle_ready(*slot) {
            state.push_signal(MatchSignal::ReadyToggled { slot: *slot });
        }
    }
}

/// Commit the held item if the player stands on something and it fits.
fn try_place(state: &mut MatchState, scene: &mut CollisionScene, slot: PlayerSlot, config: &GameConfig) -> bool {
    let Some(player) = state.player(slot) else {
        return false;
    };
    let Some(item_id) = player.held_item else {
        return false;
    };
    if !player.grounded || player.place_cooldown > 0.0 {
        return false;
    }
    let anchor = player.carry_anchor(&config.holding);
    let facing = player.facing;
    let body = player.body();

    let Some(item) = state.items.get_mut(&item_id) else {
        warn!("{} holds missing {}", slot, item_id);
        return false;
    };
    item.follow(anchor, facing);
    if item.update_overlap(scene, config.holding.overlap_margin, body) {
        return false;
    }

    item.stop_hold(&config.holding);
    if let ItemBehavior::Bomb(bomb) = &mut item.behavior {
        *bomb = BombState::Lit(FuseTimer::light(&config.bomb));
    }
    scene.remove_body(item.body());
    for collider in item.colliders() {
        scene.push(collider);
    }
    let position = item.position;

    if let Some(player) = state.player_mut(slot) {
        player.held_item = None;
    }
    debug!("{} placed {} at {}", slot, item_id, position);
    state.push_event(GameEvent::item(
        state.tick,
        GameEventData::ItemPlaced { slot, item: item_id, position },
    ));
    state.push_event(GameEvent::sound(state.tick, SoundCue::BlockPlacement));
    true
}

fn start_kick(state: &mut MatchState, slot: PlayerSlot, config: &GameConfig) {
    let started = state
        .player_mut(slot)
        .is_some_and(|p| p.start_kick(&config.player));
    if started {
        state.push_event(GameEvent::movement(state.tick, GameEventData::PlayerKicked { slot }));
        state.push_event(GameEvent::sound(state.tick, SoundCue::Kick));
    }
}

/// Hit everything in an open kick window that has not been hit yet.
fn resolve_kick(state: &mut MatchState, scene: &mut CollisionScene, slot: PlayerSlot, config: &GameConfig) {
    let Some(player) = state.player(slot) else {
        return;
    };
    let Some(area) = player.kick_area(&config.player) else {
        return;
    };
    let impulse = player.kick_impulse(&config.platformer);
    let targets: BTreeSet<Body> = scene
        .overlap_box(&area, Layer::KICK_DETECT, Some(player.body()))
        .map(|c| c.body)
        .collect();

    for body in targets {
        let fresh = state.player_mut(slot).is_some_and(|p| p.register_kick_hit(body));
        if !fresh {
            continue;
        }
        match body {
            Body::Player(other) => {
                if let Some(target) = state.player_mut(other).filter(|p| p.is_active()) {
                    target.add_impulse(impulse);
                }
            }
            Body::Capsule(capsule) => damage_capsule(state, scene, capsule, slot, config),
            Body::Item(item) => {
                // Kicking a placed spring wakes it up
                if let Some(item) = state.items.get_mut(&item) {
                    if item.is_placed() && matches!(item.behavior, ItemBehavior::Spring(_)) {
                        item.body_type = BodyType::Dynamic;
                        item.add_impulse(impulse);
                    }
                }
            }
            Body::Platform(_) => {}
        }
    }
}

fn damage_capsule(
    state: &mut MatchState,
    scene: &mut CollisionScene,
    id: CapsuleId,
    kicker: PlayerSlot,
    config: &GameConfig,
) {
    let Some(capsule) = state.capsules.get_mut(&id) else {
        return;
    };
    match capsule.take_damage(config.player.kick_damage, &config.capsule) {
        DamageOutcome::Ignored => {}
        DamageOutcome::Damaged { life, .. } => {
            state.push_event(GameEvent::hazard(state.tick, GameEventData::CapsuleDamaged { capsule: id, life }));
            state.push_event(GameEvent::sound(state.tick, SoundCue::CapsuleHit));
        }
        DamageOutcome::Broken => {
            state.release_capsule(id);
            scene.remove_body(Body::Capsule(id));
            state.push_event(GameEvent::hazard(
                state.tick,
                GameEventData::CapsuleBroken { capsule: id, slot: kicker },
            ));
            state.push_event(GameEvent::sound(state.tick, SoundCue::CapsuleBreak));
            give_random_item(state, scene, kicker, config);
        }
    }
}

/// Hand a player a random catalog item, replacing whatever they held.
fn give_random_item(state: &mut MatchState, scene: &mut CollisionScene, slot: PlayerSlot, config: &GameConfig) {
    let Some((anchor, facing, previous)) = state
        .player(slot)
        .map(|p| (p.carry_anchor(&config.holding), p.facing, p.held_item))
    else {
        return;
    };

    let Some(prefab) = state.rng.choose_index(config.catalog.len()).map(|i| PrefabId(i as u16)) else {
        warn!("Item catalog is empty, {} gets nothing", slot);
        return;
    };

    if let Some(previous) = previous {
        scene.remove_body(Body::Item(previous));
        state.release_item(previous);
    }

    let Some(id) = state.acquire_item(prefab, config) else {
        return;
    };
    if let Some(item) = state.items.get_mut(&id) {
        item.start_hold(slot, anchor, facing);
        for collider in item.colliders() {
            scene.push(collider);
        }
    }
    if let Some(player) = state.player_mut(slot) {
        player.held_item = Some(id);
        player.place_cooldown = config.holding.pickup_cooldown;
    }
    state.push_event(GameEvent::item(state.tick, GameEventData::ItemAcquired { slot, item: id, prefab }));
}

// =============================================================================
// ITEMS
// =============================================================================

fn update_held_items(state: &mut MatchState, scene: &mut CollisionScene, config: &GameConfig) {
    for item in state.items.values_mut() {
        let Some(holder) = item.holder() else {
            continue;
        };
        let Some(player) = state.players.get(holder.index()).and_then(Option::as_ref) else {
            continue;
        };

        item.follow(player.carry_anchor(&config.holding), player.facing);
        scene.remove_body(item.body());
        for collider in item.colliders() {
            scene.push(collider);
        }
        item.update_overlap(scene, config.holding.overlap_margin, player.body());
    }
}

fn update_dynamic_items(state: &mut MatchState, scene: &mut CollisionScene, config: &GameConfig, dt: f32) {
    for item in state.items.values_mut() {
        if !item.is_placed() || item.body_type != BodyType::Dynamic {
            continue;
        }
        let delta = item.gravity_step(config.holding.item_gravity, dt);
        let moved = scene.move_body(item.body(), delta, Layer::ITEM_SOLID);
        item.apply_move(moved, dt);

        if matches!(item.behavior, ItemBehavior::Spring(_)) {
            item.velocity = damp_velocity(item.velocity, &config.spring, dt);
            if item.supported && should_sleep(item.velocity, &config.spring) {
                item.velocity = Vec2::ZERO;
                item.body_type = BodyType::Kinematic;
            }
        }
    }
}

fn update_capsules(state: &mut MatchState, scene: &mut CollisionScene, config: &GameConfig, dt: f32) {
    for capsule in state.capsules.values_mut().filter(|c| c.active) {
        let old = capsule.velocity;
        capsule.velocity.y = (old.y + config.holding.item_gravity * dt).max(config.platformer.max_fall_speed);
        let delta = (old + capsule.velocity) * (0.5 * dt);

        let moved = scene.move_body(capsule.body(), delta, Layer::CAPSULE_SOLID);
        capsule.position += moved.applied;
        if moved.blocked_x {
            capsule.velocity.x = 0.0;
        }
        if moved.blocked_y {
            capsule.velocity.y = 0.0;
            capsule.velocity.x *= 0.5;
        }
    }
}

fn process_springs(state: &mut MatchState, config: &GameConfig, dt: f32) {
    let bodies: Vec<(PlayerSlot, Aabb)> = state
        .joined()
        .filter(|p| p.is_active())
        .map(|p| {
            let half = config.player.half_extents + Vec2::splat(CONTACT_SKIN);
            (p.slot, Aabb::from_center(p.position, half))
        })
        .collect();

    let mut bounces = Vec::new();
    for item in state.items.values_mut() {
        if !item.is_placed() {
            continue;
        }
        let bounds: Vec<Aabb> = item
            .cells
            .iter()
            .filter(|c| c.active)
            .map(|c| item.cell_bounds(c))
            .collect();
        let ItemBehavior::Spring(spring) = &mut item.behavior else {
            continue;
        };

        spring.update(dt);
        let touching: BTreeSet<PlayerSlot> = bodies
            .iter()
            .filter(|(_, hitbox)| bounds.iter().any(|b| b.overlaps(hitbox)))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in spring.update_contacts(touching) {
            spring.trigger_squash(&config.spring);
            bounces.push((item.id, item.position, slot));
        }
    }

    for (item, spring_at, slot) in bounces {
        if let Some(player) = state.player_mut(slot) {
            let impulse = bounce_impulse(spring_at, player.position, &config.spring);
            player.add_impulse(impulse);
        }
        state.push_event(GameEvent::hazard(state.tick, GameEventData::SpringBounced { item, slot }));
        state.push_event(GameEvent::sound(state.tick, SoundCue::Spring));
    }
}

fn process_bombs(state: &mut MatchState, scene: &mut CollisionScene, config: &GameConfig, dt: f32) {
    let mut detonations = Vec::new();
    let mut spent = Vec::new();

    for item in state.items.values_mut() {
        if !item.is_placed() {
            continue;
        }
        let ItemBehavior::Bomb(bomb) = &mut item.behavior else {
            continue;
        };
        match bomb {
            BombState::Lit(fuse) => {
                let burnt = fuse.advance(dt);
                item.tint = fuse.tint();
                if burnt {
                    *bomb = BombState::Spent { remaining: config.bomb.despawn_delay };
                    detonations.push((item.id, item.position));
                }
            }
            BombState::Spent { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    spent.push(item.id);
                }
            }
            BombState::Idle => {}
        }
    }

    for (bomb, center) in detonations {
        explode(state, scene, bomb, center, config);
    }
    for bomb in spent {
        if let Some(item) = state.items.get_mut(&bomb) {
            item.consume(config.holding.consumed_linger);
        }
    }
}

fn explode(state: &mut MatchState, scene: &mut CollisionScene, bomb: ItemId, center: Vec2, config: &GameConfig) {
    let bomb_body = Body::Item(bomb);
    scene.remove_body(bomb_body);
    if let Some(item) = state.items.get_mut(&bomb) {
        for cell in 0..item.cells.len() {
            item.disable_cell(cell as u8);
        }
    }

    let effects = {
        let items = &state.items;
        let players = &state.players;
        let capsules = &state.capsules;
        plan_explosion(
            scene,
            bomb_body,
            center,
            &config.bomb,
            |id| items.get(&id).is_some_and(Item::is_block),
            |body| match body {
                Body::Player(slot) => players
                    .get(slot.index())
                    .and_then(Option::as_ref)
                    .map(|p| p.position),
                Body::Item(id) => items.get(&id).map(|i| i.position),
                Body::Capsule(id) => capsules.get(&id).map(|c| c.position),
                Body::Platform(_) => None,
            },
        )
    };

    debug!("{} exploded at {} with {} effects", bomb, center, effects.len());
    let (duration, amplitude) = config.bomb.shake;
    state.camera.do_death_shake(duration, amplitude, &config.camera);
    state.push_event(GameEvent::hazard(state.tick, GameEventData::BombExploded { item: bomb, position: center }));
    state.push_event(GameEvent::hazard(state.tick, GameEventData::CameraShake { duration, amplitude }));
    state.push_event(GameEvent::sound(state.tick, SoundCue::Explosion));

    for effect in effects {
        match effect {
            BlastEffect::Kill(slot) => state.push_signal(MatchSignal::PlayerDied {
                slot,
                cause: DeathCause::Exploded,
            }),
            BlastEffect::DisableCell { item, cell } => {
                scene.remove_cell(Body::Item(item), cell);
                if let Some(block) = state.items.get_mut(&item) {
                    if block.disable_cell(cell) {
                        block.consume(config.holding.consumed_linger);
                    }
                }
            }
            BlastEffect::Push { body: Body::Item(id), impulse } => {
                if let Some(item) = state.items.get_mut(&id) {
                    if matches!(item.behavior, ItemBehavior::Spring(_)) {
                        item.body_type = BodyType::Dynamic;
                    }
                    item.add_impulse(impulse);
                }
            }
            BlastEffect::Push { body: Body::Capsule(id), impulse } => {
                if let Some(capsule) = state.capsules.get_mut(&id) {
                    capsule.velocity += impulse;
                }
            }
            BlastEffect::Push { .. } => {}
        }
    }

    if config.bomb.despawn_delay <= 0.0 {
        if let Some(item) = state.items.get_mut(&bomb) {
            item.consume(config.holding.consumed_linger);
        }
    }
}

fn update_item_timers(state: &mut MatchState, dt: f32) {
    let mut finished = Vec::new();
    for item in state.items.values_mut() {
        item.update_appear(dt);
        if item.update_consumed(dt) {
            finished.push(item.id);
        }
    }
    for id in finished {
        state.release_item(id);
    }
}

// =============================================================================
// ARENA
// =============================================================================

fn spawn_capsules(state: &mut MatchState, config: &GameConfig, dt: f32) {
    let Some(x) = state.spawner.update(&config.spawner, &mut state.rng, dt) else {
        return;
    };
    let position = Vec2::new(x, state.camera.position.y + config.spawner.y_offset);
    let capsule = state.acquire_capsule(position, config);
    debug!("Spawned {} at {}", capsule, position);
    state.push_event(GameEvent::hazard(state.tick, GameEventData::CapsuleSpawned { capsule, position }));
}

/// Eliminate players and retire capsules below the camera during a round.
fn check_kill_line(state: &mut MatchState, config: &GameConfig) {
    if state.phase != MatchPhase::Game {
        return;
    }
    let line = state.camera.kill_line(&config.camera);

    let fallen: Vec<PlayerSlot> = state
        .joined()
        .filter(|p| p.is_active() && p.position.y < line)
        .map(|p| p.slot)
        .collect();
    for slot in fallen {
        state.push_signal(MatchSignal::PlayerDied { slot, cause: DeathCause::Fell });
    }

    let lost: Vec<CapsuleId> = state
        .capsules
        .values()
        .filter(|c| c.active && c.position.y < line)
        .map(|c| c.id)
        .collect();
    for capsule in lost {
        state.release_capsule(capsule);
    }
}

fn update_camera(state: &mut MatchState, config: &GameConfig, dt: f32) {
    let target = match state.camera.focus {
        Some(winner) => CameraTarget::Winner(state.player(winner).map(|p| p.position)),
        None => CameraTarget::Highest(
            state
                .joined()
                .filter(|p| p.is_active() && p.grounded)
                .map(|p| p.position.y)
                .max_by(f32::total_cmp),
        ),
    };
    state.camera.update(target, &config.camera, dt);
}

// =============================================================================
// REPLAY
// =============================================================================

/// A recorded session: who joined, then one input map per tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    /// Match seed
    pub seed: u64,
    /// Devices that joined, in order, before the first tick
    pub joins: Vec<InputScheme>,
    /// Inputs per tick
    pub frames: Vec<TickInputs>,
}

/// Replay a match from recorded inputs.
///
/// Returns the final state and every event, including the joins.
pub fn replay_match(config: &GameConfig, recording: &Recording) -> Result<(MatchState, Vec<GameEvent>), JoinError> {
    let mut state = MatchState::new(config, recording.seed);
    for scheme in &recording.joins {
        state.join_player(*scheme, config)?;
    }

    let mut all_events = state.take_events();
    for inputs in &recording.frames {
        let result = tick(&mut state, inputs, config);
        all_events.extend(result.events);
    }

    Ok((state, all_events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::{Buttons, KeyboardScheme};
    use crate::game::player::PlayerPhase;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SCHEMES: [InputScheme; 4] = [
        InputScheme::Keyboard(KeyboardScheme::Keyboard1),
        InputScheme::Keyboard(KeyboardScheme::Keyboard2),
        InputScheme::Gamepad(0),
        InputScheme::Gamepad(1),
    ];

    fn lobby(players: usize) -> (MatchState, GameConfig) {
        let config = GameConfig::default();
        let mut state = MatchState::new(&config, 12345);
        for scheme in SCHEMES.into_iter().take(players) {
            state.join_player(scheme, &config).unwrap();
        }
        (state, config)
    }

    fn idle(state: &mut MatchState, config: &GameConfig, ticks: u32) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(tick(state, &TickInputs::new(), config).events);
        }
        events
    }

    fn press(slot: u8, buttons: Buttons) -> TickInputs {
        let mut inputs = TickInputs::new();
        inputs.insert(PlayerSlot(slot), InputFrame::new().press(buttons));
        inputs
    }

    fn everyone_clucks(players: usize) -> TickInputs {
        (0..players as u8)
            .map(|slot| (PlayerSlot(slot), InputFrame::new().press(Buttons::CLUCK)))
            .collect()
    }

    fn start_round(players: usize) -> (MatchState, GameConfig) {
        let (mut state, config) = lobby(players);
        tick(&mut state, &everyone_clucks(players), &config);
        assert_eq!(state.phase, MatchPhase::Prepare);
        idle(&mut state, &config, 250);
        assert_eq!(state.phase, MatchPhase::Game);
        (state, config)
    }

    fn prefab_named(config: &GameConfig, name: &str) -> PrefabId {
        let index = config.catalog.iter().position(|s| s.name == name).unwrap();
        PrefabId(index as u16)
    }

    #[test]
    fn test_player_settles_on_floor() {
        let (mut state, config) = lobby(1);
        idle(&mut state, &config, 30);

        let player = state.player(PlayerSlot(0)).unwrap();
        assert!(player.grounded);
        assert!((player.position.y - config.arena.spawn_points[0].y).abs() < 0.01);
    }

    #[test]
    fn test_player_runs_right() {
        let (mut state, config) = lobby(1);
        let start = state.player(PlayerSlot(0)).unwrap().position.x;
        let mut inputs = TickInputs::new();
        inputs.insert(PlayerSlot(0), InputFrame::with_movement(127));
        for _ in 0..30 {
            tick(&mut state, &inputs, &config);
        }
        let player = state.player(PlayerSlot(0)).unwrap();
        assert!(player.position.x > start + 1.0);
        assert_eq!(player.facing, 1.0);
    }

    #[test]
    fn test_jump_emits_events_and_rises() {
        let (mut state, config) = lobby(1);
        idle(&mut state, &config, 10);

        let result = tick(&mut state, &press(0, Buttons::JUMP), &config);
        assert!(result
            .events
            .iter()
            .any(|e| e.data == GameEventData::PlayerJumped { slot: PlayerSlot(0) }));
        assert!(result.events.iter().any(|e| e.data == GameEventData::Sound(SoundCue::Jump)));

        let before = state.player(PlayerSlot(0)).unwrap().position.y;
        let mut held = TickInputs::new();
        held.insert(PlayerSlot(0), InputFrame::new().hold(Buttons::JUMP));
        for _ in 0..10 {
            tick(&mut state, &held, &config);
        }
        assert!(state.player(PlayerSlot(0)).unwrap().position.y > before + 1.0);
    }

    #[test]
    fn test_cluck_readies_and_round_starts() {
        let (state, _) = start_round(2);
        assert!(state.joined().all(|p| p.phase == PlayerPhase::InGame));
        assert!(state.camera.can_move);
    }

    #[test]
    fn test_players_frozen_during_countdown() {
        let (mut state, config) = lobby(2);
        tick(&mut state, &everyone_clucks(2), &config);
        let before = state.player(PlayerSlot(0)).unwrap().position;

        let mut inputs = TickInputs::new();
        inputs.insert(PlayerSlot(0), InputFrame::with_movement(127));
        for _ in 0..30 {
            tick(&mut state, &inputs, &config);
        }
        assert_eq!(state.player(PlayerSlot(0)).unwrap().position, before);
    }

    #[test]
    fn test_falling_below_camera_ends_round() {
        let (mut state, config) = start_round(2);
        state.player_mut(PlayerSlot(1)).unwrap().position.y = -50.0;

        let result = tick(&mut state, &TickInputs::new(), &config);
        assert_eq!(result.phase, MatchPhase::Win);
        assert_eq!(state.winner, Some(PlayerSlot(0)));
        assert!(result.events.iter().any(|e| matches!(
            e.data,
            GameEventData::PlayerEliminated { slot: PlayerSlot(1), cause: DeathCause::Fell, .. }
        )));
        assert!(result.events.iter().any(|e| matches!(e.data, GameEventData::RoundWon { .. })));
    }

    #[test]
    fn test_place_held_block() {
        let (mut state, config) = lobby(1);
        idle(&mut state, &config, 10);

        let id = state.acquire_item(prefab_named(&config, "block_o"), &config).unwrap();
        let anchor = state.player(PlayerSlot(0)).unwrap().carry_anchor(&config.holding);
        state.items.get_mut(&id).unwrap().start_hold(PlayerSlot(0), anchor, 1.0);
        state.player_mut(PlayerSlot(0)).unwrap().held_item = Some(id);

        let result = tick(&mut state, &press(0, Buttons::PLACE), &config);
        assert!(result.events.iter().any(|e| matches!(e.data, GameEventData::ItemPlaced { .. })));
        assert!(result
            .events
            .iter()
            .any(|e| e.data == GameEventData::Sound(SoundCue::BlockPlacement)));
        assert!(state.items[&id].is_placed());
        assert!(state.player(PlayerSlot(0)).unwrap().held_item.is_none());
    }

    #[test]
    fn test_kicking_capsule_open_gives_item() {
        let (mut state, config) = start_round(2);
        let player = state.player(PlayerSlot(0)).unwrap();
        let at = player.position + config.player.kick_offset;
        state.acquire_capsule(at, &config);

        let mut broken = false;
        for _ in 0..3 {
            let result = tick(&mut state, &press(0, Buttons::KICK), &config);
            broken |= result
                .events
                .iter()
                .any(|e| matches!(e.data, GameEventData::CapsuleBroken { .. }));
            // Let the kick window close
            idle(&mut state, &config, 35);
        }

        assert!(broken);
        let held = state.held_item(PlayerSlot(0)).unwrap();
        assert_eq!(held.holder(), Some(PlayerSlot(0)));
    }

    #[test]
    fn test_bomb_blast_kills_nearby_players() {
        let (mut state, config) = start_round(3);
        let id = state.acquire_item(prefab_named(&config, "bomb"), &config).unwrap();
        {
            let bomb = state.items.get_mut(&id).unwrap();
            bomb.start_hold(PlayerSlot(0), Vec2::new(-4.0, -5.5), 1.0);
            bomb.stop_hold(&config.holding);
            bomb.behavior = ItemBehavior::Bomb(BombState::Lit(FuseTimer::light(&config.bomb)));
        }

        let events = idle(&mut state, &config, 90);
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::BombExploded { .. })));
        assert_eq!(state.phase, MatchPhase::Win);
        assert_eq!(state.winner, Some(PlayerSlot(2)));
        assert!(!state.player(PlayerSlot(0)).unwrap().alive);
        assert!(!state.player(PlayerSlot(1)).unwrap().alive);
    }

    #[test]
    fn test_tick_determinism() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut recording = Recording {
            seed: 99999,
            joins: SCHEMES.to_vec(),
            frames: Vec::new(),
        };
        recording.frames.push(everyone_clucks(4));
        for _ in 0..900 {
            let frame: TickInputs = (0..4u8)
                .map(|slot| {
                    let mut input = InputFrame::with_movement(rng.gen_range(-127..=127));
                    input.pressed = Buttons::from_bits_truncate(rng.gen::<u8>() & 0b0111);
                    input.held = input.pressed;
                    (PlayerSlot(slot), input)
                })
                .collect();
            recording.frames.push(frame);
        }

        let (final1, events1) = replay_match(&GameConfig::default(), &recording).unwrap();
        let (final2, events2) = replay_match(&GameConfig::default(), &recording).unwrap();

        assert_eq!(final1.digest(), final2.digest());
        assert_eq!(events1.len(), events2.len());
        assert_eq!(final1.tick, 901);
    }

    #[test]
    fn test_events_are_ordered() {
        let (mut state, config) = start_round(2);
        state.player_mut(PlayerSlot(1)).unwrap().position.y = -50.0;
        let mut inputs = press(0, Buttons::JUMP);
        inputs.insert(PlayerSlot(1), InputFrame::new().press(Buttons::CLUCK));

        let result = tick(&mut state, &inputs, &config);
        assert!(result.events.windows(2).all(|w| w[0] <= w[1]));
    }
}
