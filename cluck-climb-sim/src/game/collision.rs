//! Collision Scene
//!
//! A flat snapshot of every collider in the arena, rebuilt from the match
//! state at the start of each tick and kept in step as bodies move. It answers
//! the three query shapes gameplay needs (ray, box, circle) and resolves
//! body movement one axis at a time against solid colliders.
//!
//! There is no rotation and no friction model: bodies are unions of
//! axis-aligned boxes.

use bitflags::bitflags;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::capsule::CapsuleId;
use crate::game::holdable::ItemId;
use crate::game::player::PlayerSlot;

/// Gap tolerated between touching boxes.
pub const SKIN: f32 = 1e-4;

bitflags! {
    /// Collision layers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Layer: u8 {
        /// Static arena geometry
        const GROUND = 0b0000_0001;
        /// Items that have been placed
        const PLACED = 0b0000_0010;
        /// Items being carried (trigger only)
        const START = 0b0000_0100;
        /// Player bodies
        const PLAYER = 0b0000_1000;
        /// Capsules
        const CAPSULE = 0b0001_0000;
    }
}

impl Layer {
    /// What the ground/head probe rays can hit.
    pub const GROUND_MASK: Layer = Layer::GROUND.union(Layer::PLACED).union(Layer::PLAYER);

    /// What blocks a player's movement.
    pub const PLAYER_SOLID: Layer = Layer::GROUND.union(Layer::PLACED).union(Layer::PLAYER);

    /// What blocks a placed item's movement.
    pub const ITEM_SOLID: Layer = Layer::GROUND.union(Layer::PLACED).union(Layer::PLAYER);

    /// What blocks a capsule's movement.
    pub const CAPSULE_SOLID: Layer = Layer::GROUND.union(Layer::PLACED);

    /// What a bomb blast reaches.
    pub const EXPLOSION_DETECT: Layer = Layer::PLAYER.union(Layer::PLACED).union(Layer::CAPSULE);

    /// What a kick hitbox reaches.
    pub const KICK_DETECT: Layer = Layer::PLAYER.union(Layer::PLACED).union(Layer::CAPSULE);
}

/// Owner of a collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Body {
    /// Static platform, by arena index
    Platform(u16),
    /// Player body
    Player(PlayerSlot),
    /// Holdable item (all of its cells)
    Item(ItemId),
    /// Capsule
    Capsule(CapsuleId),
}

// =============================================================================
// SHAPES
// =============================================================================

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower-left corner
    pub min: Vec2,
    /// Upper-right corner
    pub max: Vec2,
}

impl Aabb {
    /// Box from centre and half size.
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Centre point.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half size.
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Shift by an offset.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Shrink on every side (grows for negative margins).
    pub fn shrunk(&self, margin: f32) -> Self {
        let m = Vec2::splat(margin);
        let half = self.half_extents();
        let m = Vec2::new(m.x.min(half.x), m.y.min(half.y));
        Self {
            min: self.min + m,
            max: self.max - m,
        }
    }

    /// Strict overlap (touching edges do not count).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Point inside or on the boundary.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Closest point of the box to `p`.
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    /// Entry distance of a ray along a unit direction, if it hits within `max_distance`.
    ///
    /// A ray starting inside the box hits at distance zero.
    pub fn ray_entry(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_distance;

        for (o, d, lo, hi) in [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
        ] {
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
            } else {
                let inv = 1.0 / d;
                let mut t0 = (lo - o) * inv;
                let mut t1 = (hi - o) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }

        Some(t_min)
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// One collider in the scene.
#[derive(Clone, Copy, Debug)]
pub struct SceneCollider {
    /// World bounds
    pub aabb: Aabb,
    /// Layer
    pub layer: Layer,
    /// Trigger colliders are ignored by rays, overlap tests and resolution
    pub trigger: bool,
    /// Owner
    pub body: Body,
    /// Cell index for compound items
    pub cell: u8,
}

/// Result of a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Body that was hit
    pub body: Body,
    /// Cell that was hit
    pub cell: u8,
    /// Distance from the origin
    pub distance: f32,
}

/// Outcome of moving a body through the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveResult {
    /// Offset actually applied
    pub applied: Vec2,
    /// Horizontal movement was cut short
    pub blocked_x: bool,
    /// Vertical movement was cut short
    pub blocked_y: bool,
}

/// Collider snapshot for one tick.
#[derive(Clone, Debug, Default)]
pub struct CollisionScene {
    colliders: Vec<SceneCollider>,
}

impl CollisionScene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collider.
    pub fn push(&mut self, collider: SceneCollider) {
        self.colliders.push(collider);
    }

    /// All colliders.
    pub fn colliders(&self) -> &[SceneCollider] {
        &self.colliders
    }

    /// Remove every collider belonging to a body.
    pub fn remove_body(&mut self, body: Body) {
        self.colliders.retain(|c| c.body != body);
    }

    /// Remove one cell of a compound body.
    pub fn remove_cell(&mut self, body: Body, cell: u8) {
        self.colliders.retain(|c| !(c.body == body && c.cell == cell));
    }

    /// Shift every collider of a body.
    pub fn translate_body(&mut self, body: Body, offset: Vec2) {
        for c in self.colliders.iter_mut().filter(|c| c.body == body) {
            c.aabb = c.aabb.translated(offset);
        }
    }

    /// Cast a ray and return the closest solid hit.
    pub fn raycast(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: Layer,
        exclude: Option<Body>,
    ) -> Option<RayHit> {
        let dir = dir.normalize();
        self.colliders
            .iter()
            .filter(|c| !c.trigger && mask.intersects(c.layer) && Some(c.body) != exclude)
            .filter_map(|c| {
                c.aabb.ray_entry(origin, dir, max_distance).map(|distance| RayHit {
                    body: c.body,
                    cell: c.cell,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Solid colliders strictly overlapping a box.
    pub fn overlap_box(
        &self,
        area: &Aabb,
        mask: Layer,
        exclude: Option<Body>,
    ) -> impl Iterator<Item = &SceneCollider> + '_ {
        let area = *area;
        self.colliders
            .iter()
            .filter(move |c| !c.trigger && mask.intersects(c.layer) && Some(c.body) != exclude)
            .filter(move |c| c.aabb.overlaps(&area))
    }

    /// Solid colliders touching a circle.
    pub fn overlap_circle(
        &self,
        center: Vec2,
        radius: f32,
        mask: Layer,
        exclude: Option<Body>,
    ) -> impl Iterator<Item = &SceneCollider> + '_ {
        let radius_sq = radius * radius;
        self.colliders
            .iter()
            .filter(move |c| !c.trigger && mask.intersects(c.layer) && Some(c.body) != exclude)
            .filter(move |c| c.aabb.closest_point(center).distance_squared(center) <= radius_sq)
    }

    /// Move a body by `delta`, stopping at the first solid collider on each axis.
    ///
    /// X is resolved before Y. Colliders the body already overlaps are
    /// ignored so an embedded body can always move free. The scene is
    /// updated with the applied offset.
    pub fn move_body(&mut self, body: Body, delta: Vec2, mask: Layer) -> MoveResult {
        let own: Vec<Aabb> = self
            .colliders
            .iter()
            .filter(|c| c.body == body && !c.trigger)
            .map(|c| c.aabb)
            .collect();

        if own.is_empty() {
            self.translate_body(body, delta);
            return MoveResult {
                applied: delta,
                ..Default::default()
            };
        }

        let dx = self.sweep_axis(body, &own, delta.x, mask, Axis::X);
        let moved: Vec<Aabb> = own.iter().map(|b| b.translated(Vec2::new(dx, 0.0))).collect();
        let dy = self.sweep_axis(body, &moved, delta.y, mask, Axis::Y);

        let applied = Vec2::new(dx, dy);
        self.translate_body(body, applied);

        MoveResult {
            applied,
            blocked_x: (dx - delta.x).abs() > SKIN,
            blocked_y: (dy - delta.y).abs() > SKIN,
        }
    }

    fn sweep_axis(&self, body: Body, own: &[Aabb], delta: f32, mask: Layer, axis: Axis) -> f32 {
        if delta == 0.0 {
            return 0.0;
        }

        let mut allowed = delta;
        for other in self
            .colliders
            .iter()
            .filter(|c| c.body != body && !c.trigger && mask.intersects(c.layer))
        {
            for b in own {
                let (b_lo, b_hi, o_lo, o_hi, cross) = match axis {
                    Axis::X => (
                        b.min.x,
                        b.max.x,
                        other.aabb.min.x,
                        other.aabb.max.x,
                        b.min.y < other.aabb.max.y - SKIN && b.max.y > other.aabb.min.y + SKIN,
                    ),
                    Axis::Y => (
                        b.min.y,
                        b.max.y,
                        other.aabb.min.y,
                        other.aabb.max.y,
                        b.min.x < other.aabb.max.x - SKIN && b.max.x > other.aabb.min.x + SKIN,
                    ),
                };
                if !cross {
                    continue;
                }
                if delta > 0.0 && b_hi <= o_lo + SKIN {
                    allowed = allowed.min((o_lo - b_hi).max(0.0));
                } else if delta < 0.0 && b_lo >= o_hi - SKIN {
                    allowed = allowed.max((o_hi - b_lo).min(0.0));
                }
            }
        }
        allowed
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

// =============================================================================
// TESTS
// =============================================================================
