//! Match State and Flow
//!
//! Everything a match owns: four player slots, items, capsules, their pools,
//! the camera rig, the spawner, the countdown and the UI model. The match
//! moves through
//!
//! ```text
//! Menu ──all ready──► Prepare ──GO!──► Game ──one left──► Win ─┬─► Prepare
//!   ▲                    │                                     │
//!   └──── unready ───────┘◄──────────── match won ─────────────┘
//! ```
//!
//! Deaths, ready toggles and leaves arrive as `MatchSignal`s and are drained
//! once per tick. Uses BTreeMap for deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::arena::spawn_point;
use crate::game::camera::CameraRig;
use crate::game::capsule::{Capsule, CapsuleId};
use crate::game::countdown::{Countdown, CountdownStage};
use crate::game::events::{DeathCause, GameEvent, GameEventData, MusicTrack, SoundCue};
use crate::game::holdable::{HoldPhase, Item, ItemId, PrefabId};
use crate::game::input::InputScheme;
use crate::game::player::{PlayerPhase, PlayerSlot, PlayerState};
use crate::game::pool::{Acquire, Pool, PoolRegistry};
use crate::game::spawner::CapsuleSpawner;
use crate::game::ui::{MatchUi, PlayerUiState};
use crate::MAX_PLAYERS;

// =============================================================================
// PHASE
// =============================================================================

/// Current phase of the match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MatchPhase {
    /// Lobby: joining and readying up
    #[default]
    Menu = 0,
    /// Round countdown
    Prepare = 1,
    /// Round being played
    Game = 2,
    /// Round over, showing results
    Win = 3,
}

/// Post-round timer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WinTimer {
    /// Showing rounds won
    RoundResult {
        /// Time left (s)
        remaining: f32,
    },
    /// Showing final ranks
    Results {
        /// Time left (s)
        remaining: f32,
    },
}

/// Notification drained by the match flow once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MatchSignal {
    /// A player should be eliminated
    PlayerDied {
        /// Victim
        slot: PlayerSlot,
        /// Cause
        cause: DeathCause,
    },
    /// A player pressed cluck in the lobby
    ReadyToggled {
        /// Player
        slot: PlayerSlot,
    },
    /// A player left their slot
    PlayerLeft {
        /// Freed slot
        slot: PlayerSlot,
        /// Was alive in the current round
        was_alive: bool,
    },
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why a join was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    /// Joining is only possible in the lobby
    #[error("cannot join during {0:?}")]
    WrongPhase(MatchPhase),

    /// Every slot is taken
    #[error("all {} slots are taken", MAX_PLAYERS)]
    Full,

    /// Keyboard layout already belongs to a player
    #[error("{0} is already in use")]
    SchemeInUse(InputScheme),

    /// Gamepad already paired to a player
    #[error("gamepad {0} is already paired")]
    DeviceInUse(u32),
}

/// Why a leave was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaveError {
    /// Nobody in that slot
    #[error("slot {0} is empty")]
    EmptySlot(PlayerSlot),
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Complete state of a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    /// Ticks simulated
    pub tick: u32,

    /// Current match phase
    pub phase: MatchPhase,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Player per slot
    pub players: [Option<PlayerState>; MAX_PLAYERS],

    /// Every item instance, pooled or not
    pub items: BTreeMap<ItemId, Item>,

    /// Every capsule instance, pooled or not
    pub capsules: BTreeMap<CapsuleId, Capsule>,

    /// Free lists per item prefab
    pub item_pools: PoolRegistry<PrefabId, ItemId>,

    /// Free list of capsules
    pub capsule_pool: Pool<CapsuleId>,

    /// Camera rig
    pub camera: CameraRig,

    /// Capsule spawner
    pub spawner: CapsuleSpawner,

    /// Running countdown
    pub countdown: Option<Countdown>,

    /// What the screen should show
    pub ui: MatchUi,

    /// Winner of the last round
    pub winner: Option<PlayerSlot>,

    /// Reset every player on the next Menu entry
    pub reset_pending: bool,

    /// Slots taking part in the current round
    pub participants: BTreeSet<PlayerSlot>,

    /// Rounds started this match (0 before the first GO)
    pub round: u32,

    /// Post-round timer
    pub win_timer: Option<WinTimer>,

    /// Signals waiting for the match flow
    #[serde(skip)]
    pub signals: Vec<MatchSignal>,

    /// Events generated this tick (cleared each tick)
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,

    next_item_id: u32,
    next_capsule_id: u32,
}

impl MatchState {
    /// Create a match in the lobby with prewarmed pools.
    pub fn new(config: &GameConfig, rng_seed: u64) -> Self {
        let mut rng = DeterministicRng::new(rng_seed);
        let camera = CameraRig::new(&config.camera, &mut rng);

        let mut state = Self {
            tick: 0,
            phase: MatchPhase::Menu,
            rng_seed,
            rng,
            players: Default::default(),
            items: BTreeMap::new(),
            capsules: BTreeMap::new(),
            item_pools: PoolRegistry::new(),
            capsule_pool: Pool::default(),
            camera,
            spawner: CapsuleSpawner::default(),
            countdown: None,
            ui: MatchUi::default(),
            winner: None,
            reset_pending: false,
            participants: BTreeSet::new(),
            round: 0,
            win_timer: None,
            signals: Vec::new(),
            pending_events: Vec::new(),
            next_item_id: 0,
            next_capsule_id: 0,
        };
        state.prewarm(config);
        state
    }

    fn prewarm(&mut self, config: &GameConfig) {
        for (index, spec) in config.catalog.iter().enumerate() {
            let prefab = PrefabId(index as u16);
            let mut ids = Vec::with_capacity(spec.prewarm as usize);
            for _ in 0..spec.prewarm {
                let id = ItemId(self.next_item_id);
                self.next_item_id += 1;
                self.items.insert(id, Item::from_prefab(id, prefab, spec));
                ids.push(id);
            }
            self.item_pools.register(prefab, Pool::with_instances(ids));
        }

        let mut ids = Vec::with_capacity(config.capsule.prewarm as usize);
        for _ in 0..config.capsule.prewarm {
            let id = CapsuleId(self.next_capsule_id);
            self.next_capsule_id += 1;
            self.capsules.insert(id, Capsule::new(id, &config.capsule));
            ids.push(id);
        }
        self.capsule_pool = Pool::with_instances(ids);
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Player in a slot.
    pub fn player(&self, slot: PlayerSlot) -> Option<&PlayerState> {
        self.players.get(slot.index()).and_then(Option::as_ref)
    }

    /// Player in a slot, mutably.
    pub fn player_mut(&mut self, slot: PlayerSlot) -> Option<&mut PlayerState> {
        self.players.get_mut(slot.index()).and_then(Option::as_mut)
    }

    /// Occupied players in slot order.
    pub fn joined(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().flatten()
    }

    /// Number of occupied slots.
    pub fn joined_count(&self) -> usize {
        self.joined().count()
    }

    /// Number of ready players.
    pub fn ready_count(&self) -> usize {
        self.joined().filter(|p| p.ready).count()
    }

    /// Participants still alive this round, in slot order.
    pub fn alive_participants(&self) -> Vec<PlayerSlot> {
        self.participants
            .iter()
            .copied()
            .filter(|slot| self.player(*slot).is_some_and(|p| p.alive))
            .collect()
    }

    /// Which slots are occupied.
    pub fn occupied_mask(&self) -> [bool; MAX_PLAYERS] {
        std::array::from_fn(|i| self.players[i].is_some())
    }

    /// Rounds won per occupied slot.
    pub fn rounds_table(&self) -> [Option<u8>; MAX_PLAYERS] {
        std::array::from_fn(|i| self.players[i].as_ref().map(|p| p.rounds_won))
    }

    /// Slot that reached the round target, if any.
    pub fn match_winner(&self, config: &GameConfig) -> Option<PlayerSlot> {
        self.joined()
            .filter(|p| p.rounds_won >= config.rules.rounds_to_win)
            .max_by_key(|p| (p.rounds_won, std::cmp::Reverse(p.slot)))
            .map(|p| p.slot)
    }

    /// Item held by a player.
    pub fn held_item(&self, slot: PlayerSlot) -> Option<&Item> {
        self.player(slot)
            .and_then(|p| p.held_item)
            .and_then(|id| self.items.get(&id))
    }

    // =========================================================================
    // JOIN / LEAVE
    // =========================================================================

    /// Seat a new player in the lowest free slot.
    pub fn join_player(&mut self, scheme: InputScheme, config: &GameConfig) -> Result<PlayerSlot, JoinError> {
        if self.phase != MatchPhase::Menu {
            return Err(JoinError::WrongPhase(self.phase));
        }
        if self.joined().any(|p| p.scheme == scheme) {
            return Err(match scheme {
                InputScheme::Keyboard(_) => JoinError::SchemeInUse(scheme),
                InputScheme::Gamepad(id) => JoinError::DeviceInUse(id),
            });
        }
        let index = self
            .players
            .iter()
            .position(Option::is_none)
            .ok_or(JoinError::Full)?;

        let slot = PlayerSlot(index as u8);
        let spawn = spawn_point(&config.arena, slot);
        self.players[index] = Some(PlayerState::new(slot, scheme, spawn));
        info!("{} joined with {}", slot, scheme);

        self.push_event(GameEvent::flow(self.tick, GameEventData::PlayerJoined { slot, scheme }));
        self.ui.update_joined(self.occupied_mask());
        self.evaluate_readiness(config);
        Ok(slot)
    }

    /// Free a slot. The match reacts on the next tick.
    pub fn remove_player(&mut self, slot: PlayerSlot) -> Result<(), LeaveError> {
        let player = self
            .players
            .get_mut(slot.index())
            .and_then(Option::take)
            .ok_or(LeaveError::EmptySlot(slot))?;
        info!("{} left", slot);

        if let Some(item) = player.held_item {
            self.release_item(item);
        }
        self.signals.push(MatchSignal::PlayerLeft {
            slot,
            was_alive: player.alive && player.phase == PlayerPhase::InGame,
        });
        self.push_event(GameEvent::flow(self.tick, GameEventData::PlayerLeft { slot }));
        self.ui.update_joined(self.occupied_mask());
        Ok(())
    }

    // =========================================================================
    // POOLS
    // =========================================================================

    /// Take an item of a prefab out of its pool.
    pub fn acquire_item(&mut self, prefab: PrefabId, config: &GameConfig) -> Option<ItemId> {
        let next_id = &mut self.next_item_id;
        let acquired = self.item_pools.acquire(prefab, || {
            let id = ItemId(*next_id);
            *next_id += 1;
            id
        })?;

        if let Acquire::Allocated(id) = acquired {
            match config.catalog.get(prefab.0 as usize) {
                Some(spec) => {
                    self.items.insert(id, Item::from_prefab(id, prefab, spec));
                }
                None => {
                    warn!("Prefab {:?} missing from the catalog", prefab);
                    self.item_pools.release(prefab, id);
                    return None;
                }
            }
        }
        Some(acquired.id())
    }

    /// Put an item back in its pool.
    pub fn release_item(&mut self, id: ItemId) {
        let Some(item) = self.items.get_mut(&id) else {
            warn!("Releasing unknown {}", id);
            return;
        };
        if let Some(holder) = item.holder() {
            if let Some(player) = self.players.get_mut(holder.index()).and_then(Option::as_mut) {
                if player.held_item == Some(id) {
                    player.held_item = None;
                }
            }
        }
        item.return_to_pool();
        let prefab = item.prefab;
        self.item_pools.release(prefab, id);
    }

    /// Take a capsule out of the pool at `position`.
    pub fn acquire_capsule(&mut self, position: Vec2, config: &GameConfig) -> CapsuleId {
        let next_id = &mut self.next_capsule_id;
        let acquired = self.capsule_pool.acquire(|| {
            let id = CapsuleId(*next_id);
            *next_id += 1;
            id
        });
        let id = acquired.id();
        let capsule = self
            .capsules
            .entry(id)
            .or_insert_with(|| Capsule::new(id, &config.capsule));
        capsule.activate(position, &config.capsule);
        id
    }

    /// Put a capsule back in the pool.
    pub fn release_capsule(&mut self, id: CapsuleId) {
        if let Some(capsule) = self.capsules.get_mut(&id) {
            capsule.deactivate();
        }
        self.capsule_pool.release(id);
    }

    /// Return every live item and capsule to its pool.
    pub fn release_all(&mut self) {
        for (_, id) in self.item_pools.reset() {
            if let Some(item) = self.items.get_mut(&id) {
                item.return_to_pool();
            }
        }
        for id in self.capsule_pool.reset() {
            if let Some(capsule) = self.capsules.get_mut(&id) {
                capsule.deactivate();
            }
        }
        for player in self.players.iter_mut().flatten() {
            player.held_item = None;
        }
    }

    // =========================================================================
    // MATCH FLOW
    // =========================================================================

    /// Start the countdown when everyone joined is ready, or cancel it when
    /// that stops being true before the first round.
    pub fn evaluate_readiness(&mut self, config: &GameConfig) {
        let joined = self.joined_count();
        let ready = self.ready_count();
        let all_ready = ready == joined && ready >= config.rules.required_players as usize;

        match self.phase {
            MatchPhase::Menu if all_ready => self.enter_prepare(config),
            MatchPhase::Prepare if self.round == 0 && !all_ready => {
                info!("Countdown cancelled ({}/{} ready)", ready, joined);
                self.countdown = None;
                self.ui.on_countdown_stopped();
                self.enter_menu(config);
            }
            _ => {}
        }
    }

    /// Whether cluck toggles the ready flag of this player right now.
    pub fn can_toggle_ready(&self, slot: PlayerSlot) -> bool {
        let lobby = self.phase == MatchPhase::Menu
            || (self.phase == MatchPhase::Prepare && self.round == 0);
        lobby && self.player(slot).is_some_and(|p| p.phase == PlayerPhase::InLobby)
    }

    /// Drain queued signals in order.
    pub fn process_signals(&mut self, config: &GameConfig) {
        let signals = std::mem::take(&mut self.signals);
        for signal in signals {
            match signal {
                MatchSignal::PlayerDied { slot, cause } => self.handle_death(slot, cause, config),
                MatchSignal::ReadyToggled { slot } => self.toggle_ready(slot, config),
                MatchSignal::PlayerLeft { slot, was_alive } => self.handle_leave(slot, was_alive, config),
            }
        }
    }

    /// Advance the countdown and post-round timers.
    pub fn update_flow(&mut self, config: &GameConfig, dt: f32) {
        if let Some(countdown) = self.countdown.as_mut() {
            let entered = countdown.update(&config.rules, dt);
            let done = countdown.is_done();
            for stage in entered {
                self.ui.on_countdown(stage);
                self.push_event(GameEvent::flow(self.tick, GameEventData::Countdown { stage }));
                if stage == CountdownStage::Go && self.phase == MatchPhase::Prepare {
                    self.enter_game(config);
                    if self.phase != MatchPhase::Game {
                        break;
                    }
                }
            }
            if done {
                self.countdown = None;
            }
        }

        if self.phase != MatchPhase::Win {
            return;
        }
        let Some(timer) = self.win_timer.as_mut() else {
            return;
        };
        let expired = match timer {
            WinTimer::RoundResult { remaining } | WinTimer::Results { remaining } => {
                *remaining -= dt;
                *remaining <= 0.0
            }
        };
        if !expired {
            return;
        }

        let finished = *timer;
        match finished {
            WinTimer::RoundResult { .. } => match self.match_winner(config) {
                Some(champion) => {
                    info!("{} wins the match", champion);
                    self.ui.on_match_won(&self.rounds_table());
                    self.push_event(GameEvent::flow(self.tick, GameEventData::MatchWon { slot: champion }));
                    self.win_timer = Some(WinTimer::Results {
                        remaining: config.rules.results_delay,
                    });
                }
                None => self.enter_prepare(config),
            },
            WinTimer::Results { .. } => {
                self.reset_pending = true;
                self.enter_menu(config);
            }
        }
    }

    fn set_phase(&mut self, to: MatchPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        info!("Match phase {:?} -> {:?}", from, to);
        self.phase = to;
        self.push_event(GameEvent::phase_changed(self.tick, from, to));
    }

    fn enter_menu(&mut self, config: &GameConfig) {
        self.set_phase(MatchPhase::Menu);
        self.countdown = None;
        self.win_timer = None;
        self.spawner.stop();
        self.camera.can_move = false;

        if self.reset_pending {
            self.reset_pending = false;
            self.release_all();
            for player in self.players.iter_mut().flatten() {
                let spawn = spawn_point(&config.arena, player.slot);
                player.reset_for_match(spawn);
            }
            self.camera.reset_to_gameplay(&config.camera);
            self.ui.reset_joined(self.occupied_mask());
            self.participants.clear();
            self.round = 0;
            self.winner = None;
        }
        self.push_event(GameEvent::music(self.tick, MusicTrack::Menu));
    }

    fn enter_prepare(&mut self, config: &GameConfig) {
        self.set_phase(MatchPhase::Prepare);
        self.participants = self.joined().map(|p| p.slot).collect();

        if self.participants.len() < config.rules.required_players as usize {
            warn!(
                "Only {} players left, back to the lobby",
                self.participants.len()
            );
            self.reset_pending = true;
            self.enter_menu(config);
            return;
        }

        self.release_all();
        for player in self.players.iter_mut().flatten() {
            let spawn = spawn_point(&config.arena, player.slot);
            player.reset_for_round(spawn);
        }
        self.camera.reset_to_gameplay(&config.camera);
        self.camera.can_move = false;
        self.spawner.stop();
        self.winner = None;
        self.win_timer = None;

        self.countdown = Some(Countdown::new());
        self.ui.on_countdown(CountdownStage::Ready);
        self.push_event(GameEvent::flow(
            self.tick,
            GameEventData::Countdown { stage: CountdownStage::Ready },
        ));
    }

    fn enter_game(&mut self, config: &GameConfig) {
        if self.participants.len() < config.rules.required_players as usize {
            warn!("Round needs {} players, back to the lobby", config.rules.required_players);
            self.back_to_lobby(config);
            return;
        }
        self.set_phase(MatchPhase::Game);
        self.round += 1;

        let mut mask = [false; MAX_PLAYERS];
        for slot in &self.participants {
            mask[slot.index()] = true;
            if let Some(player) = self.players[slot.index()].as_mut() {
                player.phase = PlayerPhase::InGame;
            }
        }
        self.ui.on_game_started(mask);
        self.spawner.start(&config.spawner, &mut self.rng);
        self.camera.can_move = true;
        self.push_event(GameEvent::music(self.tick, MusicTrack::Game));
        info!("Round {} started with {} players", self.round, self.participants.len());
    }

    fn enter_win(&mut self, winner: PlayerSlot, config: &GameConfig) {
        self.set_phase(MatchPhase::Win);
        self.winner = Some(winner);

        let rounds_won = match self.player_mut(winner) {
            Some(player) => {
                player.rounds_won += 1;
                player.rounds_won
            }
            None => {
                warn!("Round winner {} is gone", winner);
                0
            }
        };
        info!("{} wins round {} ({} won)", winner, self.round, rounds_won);

        self.camera.focus_winner(winner);
        self.spawner.stop();
        self.ui.on_win_round(&self.rounds_table());
        self.push_event(GameEvent::flow(self.tick, GameEventData::RoundWon { slot: winner, rounds_won }));
        self.win_timer = Some(WinTimer::RoundResult {
            remaining: config.rules.round_result_delay,
        });
    }

    fn handle_death(&mut self, slot: PlayerSlot, cause: DeathCause, config: &GameConfig) {
        if self.phase != MatchPhase::Game || !self.participants.contains(&slot) {
            debug!("Ignoring death of {} during {:?}", slot, self.phase);
            return;
        }
        let before = self.alive_participants().len();

        let Some(player) = self.players[slot.index()].as_mut() else {
            return;
        };
        if !player.alive {
            return;
        }
        player.alive = false;
        player.phase = PlayerPhase::Dead;
        player.velocity = Vec2::ZERO;
        player.kick = None;
        let dropped = player.held_item.take();

        if let Some(item) = dropped.and_then(|id| self.items.get_mut(&id)) {
            item.consume(config.holding.consumed_linger);
        }

        self.camera.do_death_shake(0.0, 0.0, &config.camera);
        self.ui.set_state(slot.index(), PlayerUiState::Dead);

        let after = before.saturating_sub(1);
        info!("{} eliminated ({:?}), {} left", slot, cause, after);
        self.push_event(GameEvent::player_eliminated(self.tick, slot, cause, after as u8));
        self.push_event(GameEvent::sound(self.tick, SoundCue::Death));

        if before == 2 && after == 1 {
            if let Some(&survivor) = self.alive_participants().first() {
                self.enter_win(survivor, config);
            }
        }
    }

    fn toggle_ready(&mut self, slot: PlayerSlot, config: &GameConfig) {
        if !self.can_toggle_ready(slot) {
            return;
        }
        let Some(player) = self.player_mut(slot) else {
            return;
        };
        player.ready = !player.ready;
        let ready = player.ready;
        debug!("{} ready: {}", slot, ready);

        self.ui.set_ready(slot.index(), ready);
        self.push_event(GameEvent::flow(self.tick, GameEventData::ReadyChanged { slot, ready }));
        self.evaluate_readiness(config);
    }

    fn handle_leave(&mut self, slot: PlayerSlot, was_alive: bool, config: &GameConfig) {
        let was_participant = self.participants.remove(&slot);

        match self.phase {
            MatchPhase::Game if was_participant && was_alive => {
                let after = self.alive_participants();
                self.push_event(GameEvent::player_eliminated(
                    self.tick,
                    slot,
                    DeathCause::Left,
                    after.len() as u8,
                ));
                if after.len() == 1 {
                    self.enter_win(after[0], config);
                } else if after.is_empty() {
                    warn!("Everyone left mid-round, back to the lobby");
                    self.back_to_lobby(config);
                }
            }
            MatchPhase::Prepare if self.round > 0 => {
                if self.participants.len() < config.rules.required_players as usize {
                    warn!("{} left between rounds, back to the lobby", slot);
                    self.back_to_lobby(config);
                }
            }
            MatchPhase::Menu | MatchPhase::Prepare => self.evaluate_readiness(config),
            _ => {}
        }
    }

    /// Drop the running match and return everyone to a fresh lobby.
    fn back_to_lobby(&mut self, config: &GameConfig) {
        self.ui.on_countdown_stopped();
        self.reset_pending = true;
        self.enter_menu(config);
    }

    // =========================================================================
    // EVENTS / DIGEST
    // =========================================================================

    /// Queue a signal for the next drain.
    pub fn push_signal(&mut self, signal: MatchSignal) {
        self.signals.push(signal);
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    /// SHA-256 over everything that affects future ticks.
    pub fn digest(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u8(self.phase as u8);
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);
            hasher.update_u32(self.round);

            for (index, slot) in self.players.iter().enumerate() {
                hasher.update_u8(index as u8);
                let Some(player) = slot else {
                    hasher.update_bool(false);
                    continue;
                };
                hasher.update_bool(true);
                hasher.update_vec2(player.position);
                hasher.update_vec2(player.velocity);
                hasher.update_f32(player.facing);
                hasher.update_bool(player.grounded);
                hasher.update_f32(player.jump.buffer);
                hasher.update_f32(player.jump.coyote);
                hasher.update_u8(player.rounds_won);
                hasher.update_bool(player.alive);
                hasher.update_bool(player.ready);
                hasher.update_u32(player.held_item.map_or(u32::MAX, |id| id.0));
            }

            // BTreeMap iteration is ordered by id
            for (id, item) in &self.items {
                hasher.update_u32(id.0);
                hasher.update_u8(match item.phase {
                    HoldPhase::Pooled => 0,
                    HoldPhase::Held { .. } => 1,
                    HoldPhase::Placed => 2,
                    HoldPhase::Consumed { .. } => 3,
                });
                hasher.update_vec2(item.position);
                hasher.update_vec2(item.velocity);
                for cell in &item.cells {
                    hasher.update_bool(cell.active);
                }
            }

            for (id, capsule) in &self.capsules {
                hasher.update_u32(id.0);
                hasher.update_bool(capsule.active);
                hasher.update_vec2(capsule.position);
                hasher.update_f32(capsule.life);
            }

            hasher.update_vec2(self.camera.position);
            hasher.update_f32(self.camera.max_height_reached);
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::KeyboardScheme;
    use crate::game::ui::Rank;

    const DT: f32 = 1.0 / 60.0;

    fn lobby(players: usize) -> (MatchState, GameConfig) {
        let config = GameConfig::default();
        let mut state = MatchState::new(&config, 42);
        let schemes = [
            InputScheme::Keyboard(KeyboardScheme::Keyboard1),
            InputScheme::Keyboard(KeyboardScheme::Keyboard2),
            InputScheme::Gamepad(0),
            InputScheme::Gamepad(1),
        ];
        for scheme in schemes.into_iter().take(players) {
            state.join_player(scheme, &config).unwrap();
        }
        (state, config)
    }

    fn ready_all(state: &mut MatchState, config: &GameConfig) {
        let slots: Vec<_> = state.joined().map(|p| p.slot).collect();
        for slot in slots {
            state.push_signal(MatchSignal::ReadyToggled { slot });
        }
        state.process_signals(config);
    }

    fn run_flow(state: &mut MatchState, config: &GameConfig, seconds: f32) {
        let ticks = (seconds / DT).ceil() as u32;
        for _ in 0..ticks {
            state.process_signals(config);
            state.update_flow(config, DT);
        }
    }

    fn start_round(players: usize) -> (MatchState, GameConfig) {
        let (mut state, config) = lobby(players);
        ready_all(&mut state, &config);
        run_flow(&mut state, &config, 4.1);
        assert_eq!(state.phase, MatchPhase::Game);
        (state, config)
    }

    #[test]
    fn test_prewarmed_pools() {
        let config = GameConfig::default();
        let state = MatchState::new(&config, 1);
        let expected: u32 = config.catalog.iter().map(|s| s.prewarm).sum();
        assert_eq!(state.items.len(), expected as usize);
        assert_eq!(state.capsules.len(), config.capsule.prewarm as usize);
        assert!(state.items.values().all(|i| i.phase == HoldPhase::Pooled));
    }

    #[test]
    fn test_join_rules() {
        let (mut state, config) = lobby(2);
        assert_eq!(
            state.join_player(InputScheme::Keyboard(KeyboardScheme::Keyboard1), &config),
            Err(JoinError::SchemeInUse(InputScheme::Keyboard(KeyboardScheme::Keyboard1)))
        );
        assert_eq!(
            state.join_player(InputScheme::Gamepad(7), &config),
            Ok(PlayerSlot(2))
        );
        assert_eq!(
            state.join_player(InputScheme::Gamepad(7), &config),
            Err(JoinError::DeviceInUse(7))
        );
        state.join_player(InputScheme::Gamepad(8), &config).unwrap();
        assert_eq!(
            state.join_player(InputScheme::Gamepad(9), &config),
            Err(JoinError::Full)
        );
        assert_eq!(state.ui.panel(3).state, PlayerUiState::Joined);
    }

    #[test]
    fn test_join_takes_lowest_free_slot() {
        let (mut state, config) = lobby(3);
        state.remove_player(PlayerSlot(1)).unwrap();
        assert_eq!(state.remove_player(PlayerSlot(1)), Err(LeaveError::EmptySlot(PlayerSlot(1))));

        let slot = state.join_player(InputScheme::Gamepad(5), &config).unwrap();
        assert_eq!(slot, PlayerSlot(1));
        assert_eq!(state.player(slot).map(|p| p.position), Some(config.arena.spawn_points[1]));
    }

    #[test]
    fn test_all_ready_starts_countdown() {
        let (mut state, config) = lobby(2);
        state.push_signal(MatchSignal::ReadyToggled { slot: PlayerSlot(0) });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert_eq!(state.ui.panel(0).state, PlayerUiState::Ready);

        state.push_signal(MatchSignal::ReadyToggled { slot: PlayerSlot(1) });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert_eq!(state.ui.countdown_text.as_deref(), Some("Ready..."));
        assert!(!state.ui.dim_background);

        assert_eq!(
            state.join_player(InputScheme::Gamepad(3), &config),
            Err(JoinError::WrongPhase(MatchPhase::Prepare))
        );
    }

    #[test]
    fn test_single_ready_player_does_not_start() {
        let (mut state, config) = lobby(1);
        ready_all(&mut state, &config);
        assert_eq!(state.phase, MatchPhase::Menu);
    }

    #[test]
    fn test_unready_cancels_countdown() {
        let (mut state, config) = lobby(2);
        ready_all(&mut state, &config);
        run_flow(&mut state, &config, 1.0);

        state.push_signal(MatchSignal::ReadyToggled { slot: PlayerSlot(0) });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert!(state.countdown.is_none());
        assert!(state.ui.countdown_text.is_none());

        // Nothing fires late
        run_flow(&mut state, &config, 5.0);
        assert_eq!(state.phase, MatchPhase::Menu);
    }

    #[test]
    fn test_countdown_reaches_game() {
        let (mut state, config) = lobby(3);
        ready_all(&mut state, &config);
        run_flow(&mut state, &config, 3.9);
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert_eq!(state.ui.countdown_text.as_deref(), Some("Steady..."));

        run_flow(&mut state, &config, 0.2);
        assert_eq!(state.phase, MatchPhase::Game);
        assert_eq!(state.ui.countdown_text.as_deref(), Some("GO!"));
        assert!(state.camera.can_move);
        assert!(state.spawner.running);
        assert!(state.joined().all(|p| p.phase == PlayerPhase::InGame));
        assert_eq!(state.ui.panel(0).state, PlayerUiState::InGame);
        assert_eq!(state.ui.panel(3).state, PlayerUiState::NotPlayer);

        run_flow(&mut state, &config, 1.1);
        assert!(state.ui.countdown_text.is_none());
        assert!(state.countdown.is_none());
    }

    #[test]
    fn test_win_fires_on_two_to_one() {
        let (mut state, config) = start_round(3);

        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Game);
        assert_eq!(state.ui.panel(0).state, PlayerUiState::Dead);

        // Dead players cannot die twice
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Game);

        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(2), cause: DeathCause::Exploded });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Win);
        assert_eq!(state.winner, Some(PlayerSlot(1)));
        assert_eq!(state.player(PlayerSlot(1)).map(|p| p.rounds_won), Some(1));
        assert_eq!(state.camera.focus, Some(PlayerSlot(1)));
        assert!(!state.spawner.running);
        assert_eq!(state.ui.panel(1).state, PlayerUiState::Round);
    }

    #[test]
    fn test_deaths_outside_game_are_ignored() {
        let (mut state, config) = lobby(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert!(state.player(PlayerSlot(0)).is_some_and(|p| p.alive));
    }

    #[test]
    fn test_simultaneous_deaths_resolve_in_slot_order() {
        let (mut state, config) = start_round(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Exploded });
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Exploded });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Win);
        assert_eq!(state.winner, Some(PlayerSlot(1)));
        assert!(state.player(PlayerSlot(1)).is_some_and(|p| p.alive));
    }

    #[test]
    fn test_next_round_after_result_delay() {
        let (mut state, config) = start_round(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Fell });
        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert!(state.joined().all(|p| p.alive));
        assert_eq!(state.camera.max_height_reached, 0.0);
        assert!(state.camera.focus.is_none());
        assert_eq!(state.player(PlayerSlot(0)).map(|p| p.rounds_won), Some(1));
    }

    #[test]
    fn test_match_win_and_reset() {
        let (mut state, config) = start_round(2);
        for round in 1..=config.rules.rounds_to_win {
            assert_eq!(state.phase, MatchPhase::Game);
            state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Fell });
            state.process_signals(&config);
            assert_eq!(state.player(PlayerSlot(0)).map(|p| p.rounds_won), Some(round));
            if round < config.rules.rounds_to_win {
                run_flow(&mut state, &config, 3.1 + 4.1);
            }
        }

        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Win);
        assert_eq!(state.ui.panel(0).state, PlayerUiState::Results);
        assert_eq!(state.ui.panel(0).rank, Some(Rank(1)));
        assert_eq!(state.ui.panel(1).rank, Some(Rank(2)));

        run_flow(&mut state, &config, 4.1);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert!(state.joined().all(|p| p.rounds_won == 0 && !p.ready));
        assert_eq!(state.ui.panel(0).state, PlayerUiState::Joined);
        assert_eq!(state.round, 0);
    }

    #[test]
    fn test_leaving_mid_round_counts_as_death() {
        let (mut state, config) = start_round(2);
        state.remove_player(PlayerSlot(0)).unwrap();
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Win);
        assert_eq!(state.winner, Some(PlayerSlot(1)));
    }

    #[test]
    fn test_leave_between_rounds_returns_to_lobby() {
        let (mut state, config) = start_round(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Fell });
        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert_eq!(state.round, 1);

        state.remove_player(PlayerSlot(1)).unwrap();
        run_flow(&mut state, &config, 4.1);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert_eq!(state.round, 0);
        assert!(state.countdown.is_none());
        assert!(state.ui.countdown_text.is_none());
        assert_eq!(state.player(PlayerSlot(0)).map(|p| p.rounds_won), Some(0));
        assert_eq!(state.ui.panel(0).state, PlayerUiState::Joined);
        assert_eq!(state.ui.panel(1).state, PlayerUiState::WaitJoin);

        run_flow(&mut state, &config, 60.0);
        assert_eq!(state.phase, MatchPhase::Menu);
    }

    #[test]
    fn test_round_needs_enough_participants() {
        let (mut state, config) = start_round(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Fell });
        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Prepare);

        state.participants.remove(&PlayerSlot(1));
        run_flow(&mut state, &config, 4.1);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert!(!state.spawner.running);
        assert!(!state.camera.can_move);
    }

    #[test]
    fn test_leave_during_round_result() {
        let (mut state, config) = start_round(2);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(1), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Win);

        state.remove_player(PlayerSlot(1)).unwrap();
        state.process_signals(&config);
        assert_eq!(state.phase, MatchPhase::Win);

        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Menu);
        assert_eq!(state.round, 0);
    }

    #[test]
    fn test_leave_during_round_result_keeps_playing() {
        let (mut state, config) = start_round(3);
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Fell });
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(2), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert_eq!(state.winner, Some(PlayerSlot(1)));

        state.remove_player(PlayerSlot(2)).unwrap();
        run_flow(&mut state, &config, 3.1);
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert_eq!(state.participants.len(), 2);

        run_flow(&mut state, &config, 4.1);
        assert_eq!(state.phase, MatchPhase::Game);
        assert_eq!(state.round, 2);
        assert_eq!(state.ui.panel(2).state, PlayerUiState::NotPlayer);
    }

    #[test]
    fn test_winner_leaving_forfeits_match() {
        let (mut state, mut config) = start_round(3);
        config.rules.rounds_to_win = 1;
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(0), cause: DeathCause::Fell });
        state.push_signal(MatchSignal::PlayerDied { slot: PlayerSlot(2), cause: DeathCause::Fell });
        state.process_signals(&config);
        assert_eq!(state.winner, Some(PlayerSlot(1)));

        state.remove_player(PlayerSlot(1)).unwrap();
        state.take_events();
        run_flow(&mut state, &config, 3.1);

        assert!(!state
            .take_events()
            .iter()
            .any(|e| matches!(e.data, GameEventData::MatchWon { .. })));
        assert_eq!(state.phase, MatchPhase::Prepare);
        assert_eq!(state.winner, None);
        assert!(state.camera.focus.is_none());
    }

    #[test]
    fn test_pool_round_trip() {
        let (mut state, config) = lobby(1);
        let id = state.acquire_item(PrefabId(0), &config).unwrap();
        assert!(state.item_pools.get(PrefabId(0)).is_some_and(|p| p.busy().any(|b| *b == id)));

        state.release_item(id);
        assert_eq!(state.items[&id].phase, HoldPhase::Pooled);
        assert_eq!(state.acquire_item(PrefabId(0), &config), Some(id));

        // Missing prefab is a no-op
        assert!(state.acquire_item(PrefabId(999), &config).is_none());
    }

    #[test]
    fn test_pool_grows_when_exhausted() {
        let (mut state, config) = lobby(1);
        let before = state.items.len();
        let prewarm = config.catalog[0].prewarm;
        let ids: Vec<_> = (0..=prewarm)
            .map(|_| state.acquire_item(PrefabId(0), &config).unwrap())
            .collect();
        assert_eq!(state.items.len(), before + 1);
        assert_eq!(ids.len(), prewarm as usize + 1);
    }

    #[test]
    fn test_digest_tracks_state() {
        let (state_a, _) = lobby(2);
        let (mut state_b, _) = lobby(2);
        assert_eq!(state_a.digest(), state_b.digest());

        if let Some(player) = state_b.player_mut(PlayerSlot(1)) {
            player.position.x += 0.001;
        }
        assert_ne!(state_a.digest(), state_b.digest());
    }
}
