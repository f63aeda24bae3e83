//! Capsule
//!
//! Damageable crate that falls into the arena. Kicking it wears it down; the
//! kick that breaks it hands the kicker a random item from the catalog. The
//! sprite shows how damaged it is.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::config::CapsuleConfig;
use crate::core::vec2::Vec2;
use crate::game::collision::{Aabb, Body, Layer, SceneCollider};

/// Capsule handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapsuleId(pub u32);

impl fmt::Display for CapsuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capsule#{}", self.0)
    }
}

/// Result of `take_damage`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Non-positive amount or capsule already inactive
    Ignored,
    /// Still standing
    Damaged {
        /// Life left
        life: f32,
        /// New damage sprite
        sprite: u8,
    },
    /// Life reached zero
    Broken,
}

/// Capsule instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    /// Handle
    pub id: CapsuleId,
    /// Centre
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Remaining life
    pub life: f32,
    /// Damage sprite index
    pub sprite: u8,
    /// In the arena (false while pooled)
    pub active: bool,
}

impl Capsule {
    /// Create a pooled (inactive) capsule.
    pub fn new(id: CapsuleId, cfg: &CapsuleConfig) -> Self {
        Self {
            id,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            life: cfg.base_life,
            sprite: 0,
            active: false,
        }
    }

    /// Take the capsule out of its pool at `position` with full life.
    pub fn activate(&mut self, position: Vec2, cfg: &CapsuleConfig) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.life = cfg.base_life;
        self.sprite = 0;
        self.active = true;
    }

    /// Return to the pool.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.velocity = Vec2::ZERO;
    }

    /// Apply damage.
    pub fn take_damage(&mut self, amount: f32, cfg: &CapsuleConfig) -> DamageOutcome {
        if amount <= 0.0 || !self.active {
            return DamageOutcome::Ignored;
        }

        self.life -= amount;
        if self.life <= 0.0 {
            return DamageOutcome::Broken;
        }

        self.sprite = damage_sprite(self.life, cfg);
        DamageOutcome::Damaged {
            life: self.life,
            sprite: self.sprite,
        }
    }

    /// Collision body handle.
    pub fn body(&self) -> Body {
        Body::Capsule(self.id)
    }

    /// Scene collider, if active.
    pub fn collider(&self, cfg: &CapsuleConfig) -> Option<SceneCollider> {
        self.active.then(|| SceneCollider {
            aabb: Aabb::from_center(self.position, cfg.half_extents),
            layer: Layer::CAPSULE,
            trigger: false,
            body: self.body(),
            cell: 0,
        })
    }
}

/// Sprite index for a life value.
pub fn damage_sprite(life: f32, cfg: &CapsuleConfig) -> u8 {
    let max_index = cfg.damage_sprites.saturating_sub(1) as f32;
    (cfg.base_life - life).clamp(0.0, max_index) as u8
}
