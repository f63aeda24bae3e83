//! Bomb
//!
//! Placing a bomb lights its fuse. The tint warms from white to red while it
//! burns, then the bomb explodes: every body within the blast radius is
//! pushed away with an impulse that falls off linearly with distance, players
//! caught in the blast are killed outright, and block cells in range are
//! knocked out individually.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::config::BombConfig;
use crate::core::math::clamp01;
use crate::core::vec2::Vec2;
use crate::game::collision::{Body, CollisionScene, Layer};
use crate::game::holdable::{ItemId, Tint};
use crate::game::player::PlayerSlot;

/// Shortest allowed fuse (s).
pub const MIN_FUSE: f32 = 0.0001;

/// Tint at fuse start.
pub const FUSE_START: Tint = Tint::WHITE;

/// Tint at detonation.
pub const FUSE_END: Tint = Tint::RED;

/// Burning fuse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuseTimer {
    /// Time burnt (s)
    pub elapsed: f32,
    /// Total length (s)
    pub duration: f32,
}

impl FuseTimer {
    /// Light a fuse.
    pub fn light(cfg: &BombConfig) -> Self {
        Self {
            elapsed: 0.0,
            duration: cfg.fuse_seconds.max(MIN_FUSE),
        }
    }

    /// Burn for `dt`. Returns true once the fuse is spent.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.elapsed >= self.duration
    }

    /// Progress in [0, 1].
    pub fn progress(&self) -> f32 {
        clamp01(self.elapsed / self.duration)
    }

    /// Current warning tint.
    pub fn tint(&self) -> Tint {
        FUSE_START.lerp(FUSE_END, self.progress())
    }
}

/// Bomb lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum BombState {
    /// Not yet placed
    #[default]
    Idle,
    /// Fuse burning
    Lit(FuseTimer),
    /// Exploded, waiting out the despawn delay
    Spent {
        /// Time left before the bomb is consumed (s)
        remaining: f32,
    },
}

/// Impulse magnitude at `distance` from the blast.
///
/// Falls off linearly and is zero at and beyond `radius`.
pub fn explosion_impulse(distance: f32, radius: f32, impulse: f32) -> f32 {
    let attenuation = clamp01(1.0 - distance / radius);
    impulse * attenuation
}

/// Push direction from the blast centre toward `target`, or up when on top.
pub fn explosion_direction(center: Vec2, target: Vec2) -> Vec2 {
    let to_target = target - center;
    if to_target.length() > 0.0001 {
        to_target.normalize()
    } else {
        Vec2::UP
    }
}

/// One consequence of an explosion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlastEffect {
    /// A player caught in the blast dies
    Kill(PlayerSlot),
    /// A block cell is knocked out
    DisableCell {
        /// Block
        item: ItemId,
        /// Cell
        cell: u8,
    },
    /// Any other body is pushed
    Push {
        /// Target
        body: Body,
        /// Impulse
        impulse: Vec2,
    },
}

/// Collect what an explosion at `center` does.
///
/// `is_block` tells block cells apart from other items, and `origin_of`
/// gives the position impulses are measured from. Each non-block body is
/// affected at most once.
pub fn plan_explosion(
    scene: &CollisionScene,
    bomb: Body,
    center: Vec2,
    cfg: &BombConfig,
    is_block: impl Fn(ItemId) -> bool,
    origin_of: impl Fn(Body) -> Option<Vec2>,
) -> Vec<BlastEffect> {
    let mut effects = Vec::new();
    let mut seen: BTreeSet<Body> = BTreeSet::new();

    for collider in scene.overlap_circle(center, cfg.explosion_radius, Layer::EXPLOSION_DETECT, Some(bomb)) {
        if let Body::Item(item) = collider.body {
            if is_block(item) {
                effects.push(BlastEffect::DisableCell { item, cell: collider.cell });
                continue;
            }
        }

        if !seen.insert(collider.body) {
            continue;
        }
        let Some(target) = origin_of(collider.body) else {
            continue;
        };

        match collider.body {
            Body::Player(slot) => effects.push(BlastEffect::Kill(slot)),
            body => {
                let distance = center.distance(target);
                let magnitude = explosion_impulse(distance, cfg.explosion_radius, cfg.explosion_impulse);
                effects.push(BlastEffect::Push {
                    body,
                    impulse: explosion_direction(center, target) * magnitude,
                });
            }
        }
    }

    effects
}

// =============================================================================
// TESTS
// =============================================================================
