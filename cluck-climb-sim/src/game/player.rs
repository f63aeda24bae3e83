//! Player State and Controller
//!
//! One `PlayerState` per occupied slot. The controller runs in four steps per
//! tick, with the caller probing the collision scene in between:
//!
//! 1. `update_timers`: latch jump presses, advance buffer/coyote
//! 2. `apply_probe`: take the fresh ground/head flags and fire a due jump
//! 3. `motor_step`: horizontal smoothing and the gravity curve
//! 4. `apply_move`: accept the resolved displacement

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::config::{HoldConfig, PlatformerValues, PlayerConfig};
use crate::core::vec2::Vec2;
use crate::game::collision::{Aabb, Body, Layer, MoveResult, SceneCollider};
use crate::game::holdable::ItemId;
use crate::game::input::{InputFrame, InputScheme};
use crate::game::jump::JumpTimers;
use crate::game::movement::{horizontal_step, integrate, vertical_step, JumpKinematics};
use crate::game::probe::ProbeResult;

/// One of the four fixed player slots (0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerSlot(pub u8);

impl PlayerSlot {
    /// Slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

/// Lifecycle of a player within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerPhase {
    /// Joined, waiting in the lobby or the countdown
    InLobby,
    /// Playing a round
    InGame,
    /// Eliminated this round
    Dead,
}

/// Open kick hitbox.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KickState {
    /// Time left (s)
    pub remaining: f32,
    /// Bodies already hit by this kick
    pub hits: BTreeSet<Body>,
}

/// State of a single player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerState {
    /// Slot
    pub slot: PlayerSlot,
    /// Device the player joined with
    pub scheme: InputScheme,
    /// Centre of the body
    pub position: Vec2,
    /// Velocity (units/s)
    pub velocity: Vec2,
    /// +1 facing right, -1 facing left
    pub facing: f32,
    /// Standing on something
    pub grounded: bool,
    /// Something directly overhead
    pub head_blocked: bool,
    /// Jump buffer and coyote timers
    pub jump: JumpTimers,
    /// Jump button held this tick
    pub hold_jump: bool,
    /// Horizontal smoothing velocity
    pub smoothing_x: f32,
    /// Item being carried
    pub held_item: Option<ItemId>,
    /// Rounds won this match
    pub rounds_won: u8,
    /// Alive this round
    pub alive: bool,
    /// Lobby / in-game / dead
    pub phase: PlayerPhase,
    /// Ready flag in the lobby
    pub ready: bool,
    /// Active kick
    pub kick: Option<KickState>,
    /// Time before the held item can be placed (s)
    pub place_cooldown: f32,
}

impl PlayerState {
    /// Create a player at a spawn point.
    pub fn new(slot: PlayerSlot, scheme: InputScheme, spawn: Vec2) -> Self {
        Self {
            slot,
            scheme,
            position: spawn,
            velocity: Vec2::ZERO,
            facing: 1.0,
            grounded: false,
            head_blocked: false,
            jump: JumpTimers::default(),
            hold_jump: false,
            smoothing_x: 0.0,
            held_item: None,
            rounds_won: 0,
            alive: true,
            phase: PlayerPhase::InLobby,
            ready: false,
            kick: None,
            place_cooldown: 0.0,
        }
    }

    /// Collision body handle.
    #[inline]
    pub fn body(&self) -> Body {
        Body::Player(self.slot)
    }

    /// Whether the player takes part in physics and input.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.alive && self.phase != PlayerPhase::Dead
    }

    /// World bounds of the body.
    pub fn hitbox(&self, cfg: &PlayerConfig) -> Aabb {
        Aabb::from_center(self.position, cfg.half_extents)
    }

    /// Scene collider for the body.
    pub fn collider(&self, cfg: &PlayerConfig) -> SceneCollider {
        SceneCollider {
            aabb: self.hitbox(cfg),
            layer: Layer::PLAYER,
            trigger: false,
            body: self.body(),
            cell: 0,
        }
    }

    /// Where a carried item sits.
    pub fn carry_anchor(&self, hold: &HoldConfig) -> Vec2 {
        self.position + hold.carry_offset.flip_x(self.facing)
    }

    /// Add an instantaneous velocity change.
    ///
    /// Leaves the ground and cancels coyote time.
    pub fn add_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse;
        self.grounded = false;
        self.jump.coyote = 0.0;
    }

    // =========================================================================
    // CONTROLLER
    // =========================================================================

    /// Latch input and advance the jump timers.
    ///
    /// Uses the grounded flag from the previous probe.
    pub fn update_timers(&mut self, input: &InputFrame, values: &PlatformerValues, dt: f32) {
        self.hold_jump = input.jump_held();
        if input.jump_pressed() {
            self.jump.press(values);
        }
        self.jump.update(self.grounded, values, dt);
        if self.place_cooldown > 0.0 {
            self.place_cooldown = (self.place_cooldown - dt).max(0.0);
        }
    }

    /// Take fresh probe flags and fire a jump if one is due.
    ///
    /// Returns true when the player jumped.
    pub fn apply_probe(&mut self, probe: ProbeResult, kinematics: &JumpKinematics) -> bool {
        self.grounded = probe.grounded;
        self.head_blocked = probe.head_blocked;

        if self.jump.try_consume(self.head_blocked) {
            self.velocity.y = kinematics.jump_velocity;
            self.grounded = false;
            true
        } else {
            false
        }
    }

    /// Advance velocity and return the desired displacement for this step.
    pub fn motor_step(
        &mut self,
        input: &InputFrame,
        values: &PlatformerValues,
        kinematics: &JumpKinematics,
        dt: f32,
    ) -> Vec2 {
        let old = self.velocity;

        let step = horizontal_step(old.x, input.axis(), &mut self.smoothing_x, values, dt);
        if let Some(facing) = step.facing {
            self.facing = facing;
        }
        let vy = vertical_step(old.y, self.hold_jump, self.grounded, kinematics, values, dt);

        self.velocity = Vec2::new(step.velocity_x, vy);
        integrate(self.position, old, self.velocity, dt) - self.position
    }

    /// Accept a resolved move.
    pub fn apply_move(&mut self, result: MoveResult) {
        self.position += result.applied;
        if result.blocked_x {
            self.velocity.x = 0.0;
            self.smoothing_x = 0.0;
        }
        if result.blocked_y {
            self.velocity.y = 0.0;
        }
    }

    // =========================================================================
    // KICK
    // =========================================================================

    /// Open the kick hitbox. Returns false if one is already open.
    pub fn start_kick(&mut self, cfg: &PlayerConfig) -> bool {
        if self.kick.is_some() {
            return false;
        }
        self.kick = Some(KickState {
            remaining: cfg.kick_duration,
            hits: BTreeSet::new(),
        });
        true
    }

    /// Area covered by the open kick, if any.
    pub fn kick_area(&self, cfg: &PlayerConfig) -> Option<Aabb> {
        self.kick.as_ref().map(|_| {
            Aabb::from_center(
                self.position + cfg.kick_offset.flip_x(self.facing),
                cfg.kick_half_extents,
            )
        })
    }

    /// Record a kick hit. Returns false if the body was already hit.
    pub fn register_kick_hit(&mut self, body: Body) -> bool {
        match self.kick.as_mut() {
            Some(kick) => kick.hits.insert(body),
            None => false,
        }
    }

    /// Count the kick window down.
    pub fn update_kick(&mut self, dt: f32) {
        if let Some(kick) = self.kick.as_mut() {
            kick.remaining -= dt;
            if kick.remaining <= 0.0 {
                self.kick = None;
            }
        }
    }

    /// Kick impulse for this player's facing.
    pub fn kick_impulse(&self, values: &PlatformerValues) -> Vec2 {
        values.kick_force.flip_x(self.facing)
    }

    // =========================================================================
    // RESETS
    // =========================================================================

    /// Back to a spawn point for a new round.
    pub fn reset_for_round(&mut self, spawn: Vec2) {
        self.position = spawn;
        self.velocity = Vec2::ZERO;
        self.facing = 1.0;
        self.grounded = false;
        self.head_blocked = false;
        self.jump = JumpTimers::default();
        self.hold_jump = false;
        self.smoothing_x = 0.0;
        self.held_item = None;
        self.alive = true;
        self.phase = PlayerPhase::InLobby;
        self.kick = None;
        self.place_cooldown = 0.0;
    }

    /// Back to a fresh lobby player.
    pub fn reset_for_match(&mut self, spawn: Vec2) {
        self.reset_for_round(spawn);
        self.rounds_won = 0;
        self.ready = false;
    }
}

// =============================================================================
// TESTS
// =============================================================================
