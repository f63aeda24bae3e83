//! Holdable Items
//!
//! Blocks, bombs and springs share one lifecycle:
//!
//! ```text
//! Pooled ──acquire──► Held ──place──► Placed ──► Consumed ──linger──► Pooled
//!                      │                                ▲
//!                      └──────────── dropped ───────────┘
//! ```
//!
//! A held item is kinematic, its cells are triggers on the start layer, and
//! it follows its holder's carry anchor. Each tick it checks whether it would
//! overlap anything solid; an overlapping item cannot be placed. A placed
//! item is dynamic with solid cells on the placed layer.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::config::{HoldConfig, PrefabKind, PrefabSpec};
use crate::core::math::lerp;
use crate::core::vec2::Vec2;
use crate::game::bomb::BombState;
use crate::game::collision::{Aabb, Body, CollisionScene, Layer, MoveResult, SceneCollider};
use crate::game::player::PlayerSlot;
use crate::game::spring::SpringState;

/// Horizontal slowdown for items resting on something.
const REST_FRICTION: f32 = 8.0;

/// Item handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Index into the item catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrefabId(pub u16);

/// RGBA colour multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tint {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Tint {
    /// Opaque white (no tint)
    pub const WHITE: Tint = Tint::rgba(1.0, 1.0, 1.0, 1.0);
    /// Opaque red
    pub const RED: Tint = Tint::rgba(1.0, 0.0, 0.0, 1.0);
    /// Ghost while carried
    pub const HELD: Tint = Tint::rgba(1.0, 1.0, 1.0, 0.25);
    /// Ghost while overlapping
    pub const OVERLAP: Tint = Tint::rgba(1.0, 0.0, 0.0, 0.25);
    /// Fully transparent white
    pub const CLEAR: Tint = Tint::rgba(1.0, 1.0, 1.0, 0.0);

    /// Create a tint.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise interpolation.
    pub fn lerp(self, other: Tint, t: f32) -> Tint {
        Tint {
            r: lerp(self.r, other.r, t),
            g: lerp(self.g, other.g, t),
            b: lerp(self.b, other.b, t),
            a: lerp(self.a, other.a, t),
        }
    }
}

/// Where an item is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HoldPhase {
    /// Inactive, waiting in its pool
    Pooled,
    /// Carried by a player
    Held {
        /// Carrier
        holder: PlayerSlot,
    },
    /// Committed to the world
    Placed,
    /// Used up; returns to the pool after lingering
    Consumed {
        /// Time left (s)
        linger: f32,
    },
}

/// Physics body mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Moved only by code
    Kinematic,
    /// Moved by gravity and impulses
    Dynamic,
}

/// One unit of an item's collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Centre relative to the item, for facing right
    pub offset: Vec2,
    /// Half size
    pub half_extents: Vec2,
    /// Still part of the item (blasted cells are not)
    pub active: bool,
    /// Has received the appear trigger
    pub visible: bool,
}

/// Kind-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemBehavior {
    /// Plain building block
    Block,
    /// Fused explosive
    Bomb(BombState),
    /// Bouncy disc
    Spring(SpringState),
}

/// Staggered appear animation after placing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppearSequence {
    /// Time since placing (s)
    pub elapsed: f32,
    /// Delay between cells (s)
    pub step: f32,
    /// Next cell to reveal
    pub next: u8,
}

/// Holdable item instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Handle
    pub id: ItemId,
    /// Catalog entry it was built from
    pub prefab: PrefabId,
    /// Kind-specific state
    pub behavior: ItemBehavior,
    /// Collider cells
    pub cells: Vec<Cell>,
    /// Lifecycle
    pub phase: HoldPhase,
    /// Origin
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Body mode
    pub body_type: BodyType,
    /// Would overlap something if placed now
    pub overlapping: bool,
    /// +1 or -1, mirrors the cell layout
    pub facing: f32,
    /// Sprite tint
    pub tint: Tint,
    /// Running appear animation
    pub appear: Option<AppearSequence>,
    /// Resting on something after the last move
    pub supported: bool,
}

impl Item {
    /// Build a pooled instance of a catalog entry.
    pub fn from_prefab(id: ItemId, prefab: PrefabId, spec: &PrefabSpec) -> Self {
        let (behavior, cells) = match &spec.kind {
            PrefabKind::Block { cells } => (
                ItemBehavior::Block,
                cells
                    .iter()
                    .map(|[x, y]| Cell::new(Vec2::new(*x as f32, *y as f32), Vec2::splat(0.5)))
                    .collect(),
            ),
            PrefabKind::Bomb => (
                ItemBehavior::Bomb(BombState::Idle),
                vec![Cell::new(Vec2::ZERO, Vec2::splat(0.4))],
            ),
            PrefabKind::Spring => (
                ItemBehavior::Spring(SpringState::default()),
                vec![Cell::new(Vec2::ZERO, Vec2::new(0.5, 0.25))],
            ),
        };

        Self {
            id,
            prefab,
            behavior,
            cells,
            phase: HoldPhase::Pooled,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            body_type: BodyType::Kinematic,
            overlapping: false,
            facing: 1.0,
            tint: Tint::WHITE,
            appear: None,
            supported: false,
        }
    }

    /// Collision body handle.
    #[inline]
    pub fn body(&self) -> Body {
        Body::Item(self.id)
    }

    /// Carrier, if held.
    pub fn holder(&self) -> Option<PlayerSlot> {
        match self.phase {
            HoldPhase::Held { holder } => Some(holder),
            _ => None,
        }
    }

    /// Placed in the world.
    pub fn is_placed(&self) -> bool {
        self.phase == HoldPhase::Placed
    }

    /// Plain block.
    pub fn is_block(&self) -> bool {
        matches!(self.behavior, ItemBehavior::Block)
    }

    /// World bounds of a cell.
    pub fn cell_bounds(&self, cell: &Cell) -> Aabb {
        Aabb::from_center(self.position + cell.offset.flip_x(self.facing), cell.half_extents)
    }

    /// Scene colliders for the current phase.
    pub fn colliders(&self) -> Vec<SceneCollider> {
        let (layer, trigger) = match self.phase {
            HoldPhase::Held { .. } => (Layer::START, true),
            HoldPhase::Placed => (Layer::PLACED, false),
            HoldPhase::Pooled | HoldPhase::Consumed { .. } => return Vec::new(),
        };

        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .map(|(i, c)| SceneCollider {
                aabb: self.cell_bounds(c),
                layer,
                trigger,
                body: self.body(),
                cell: i as u8,
            })
            .collect()
    }

    // =========================================================================
    // HOLD / PLACE
    // =========================================================================

    /// Hand the item to a player.
    pub fn start_hold(&mut self, holder: PlayerSlot, anchor: Vec2, facing: f32) {
        self.phase = HoldPhase::Held { holder };
        self.body_type = BodyType::Kinematic;
        self.velocity = Vec2::ZERO;
        self.overlapping = false;
        self.tint = Tint::HELD;
        self.appear = None;
        self.supported = false;
        for cell in &mut self.cells {
            cell.active = true;
            cell.visible = true;
        }
        match &mut self.behavior {
            ItemBehavior::Bomb(state) => *state = BombState::Idle,
            ItemBehavior::Spring(state) => state.reset(),
            ItemBehavior::Block => {}
        }
        self.follow(anchor, facing);
    }

    /// Track the carry anchor.
    pub fn follow(&mut self, anchor: Vec2, facing: f32) {
        self.position = anchor;
        self.facing = facing;
    }

    /// Re-test overlap against solid colliders other than `ignore`.
    ///
    /// Updates the tint and returns the new flag.
    pub fn update_overlap(&mut self, scene: &CollisionScene, margin: f32, ignore: Body) -> bool {
        let own = self.body();
        self.overlapping = self.cells.iter().filter(|c| c.active).any(|cell| {
            let area = self.cell_bounds(cell).shrunk(margin);
            scene
                .overlap_box(&area, Layer::all(), Some(own))
                .any(|c| c.body != ignore)
        });
        self.tint = if self.overlapping { Tint::OVERLAP } else { Tint::HELD };
        self.overlapping
    }

    /// Commit the item to the world and start the appear animation.
    pub fn stop_hold(&mut self, hold: &HoldConfig) {
        self.phase = HoldPhase::Placed;
        self.body_type = BodyType::Dynamic;
        self.overlapping = false;
        self.tint = Tint::WHITE;
        self.velocity = Vec2::ZERO;
        for cell in &mut self.cells {
            cell.visible = false;
        }
        self.appear = Some(AppearSequence {
            elapsed: 0.0,
            step: hold.appear_step,
            next: 0,
        });
        self.update_appear(0.0);
    }

    /// Advance the appear animation. Returns how many cells were revealed.
    pub fn update_appear(&mut self, dt: f32) -> usize {
        let Some(seq) = self.appear.as_mut() else {
            return 0;
        };
        seq.elapsed += dt;

        let mut revealed = 0;
        while (seq.next as usize) < self.cells.len()
            && seq.elapsed + 1e-6 >= seq.step * seq.next as f32
        {
            self.cells[seq.next as usize].visible = true;
            seq.next += 1;
            revealed += 1;
        }
        if seq.next as usize >= self.cells.len() {
            self.appear = None;
        }
        revealed
    }

    /// Mark as used up; it returns to the pool after `linger`.
    pub fn consume(&mut self, linger: f32) {
        self.phase = HoldPhase::Consumed { linger };
        self.velocity = Vec2::ZERO;
        self.body_type = BodyType::Kinematic;
        self.appear = None;
    }

    /// Count down a consumed item. Returns true when it should go back to its pool.
    pub fn update_consumed(&mut self, dt: f32) -> bool {
        if let HoldPhase::Consumed { linger } = &mut self.phase {
            *linger -= dt;
            *linger <= 0.0
        } else {
            false
        }
    }

    /// Deactivate and reset for reuse.
    pub fn return_to_pool(&mut self) {
        self.phase = HoldPhase::Pooled;
        self.velocity = Vec2::ZERO;
        self.body_type = BodyType::Kinematic;
        self.overlapping = false;
        self.tint = Tint::WHITE;
        self.appear = None;
        self.supported = false;
        for cell in &mut self.cells {
            cell.active = true;
            cell.visible = true;
        }
        match &mut self.behavior {
            ItemBehavior::Bomb(state) => *state = BombState::Idle,
            ItemBehavior::Spring(state) => state.reset(),
            ItemBehavior::Block => {}
        }
    }

    /// Knock out one cell. Returns true if no active cells remain.
    pub fn disable_cell(&mut self, cell: u8) -> bool {
        if let Some(c) = self.cells.get_mut(cell as usize) {
            c.active = false;
        }
        self.cells.iter().all(|c| !c.active)
    }

    // =========================================================================
    // PHYSICS
    // =========================================================================

    /// Add an impulse if the body is dynamic.
    pub fn add_impulse(&mut self, impulse: Vec2) {
        if self.body_type == BodyType::Dynamic {
            self.velocity += impulse;
        }
    }

    /// Gravity for a dynamic item. Returns the desired displacement.
    pub fn gravity_step(&mut self, gravity: f32, dt: f32) -> Vec2 {
        if self.body_type != BodyType::Dynamic {
            return Vec2::ZERO;
        }
        let old = self.velocity;
        self.velocity.y += gravity * dt;
        (old + self.velocity) * (0.5 * dt)
    }

    /// Accept a resolved move.
    pub fn apply_move(&mut self, result: MoveResult, dt: f32) {
        self.position += result.applied;
        self.supported = result.blocked_y && self.velocity.y <= 0.0;
        if result.blocked_x {
            self.velocity.x = 0.0;
        }
        if result.blocked_y {
            self.velocity.y = 0.0;
        }
        if self.supported {
            self.velocity.x = lerp(self.velocity.x, 0.0, REST_FRICTION * dt);
        }
    }
}

impl Cell {
    fn new(offset: Vec2, half_extents: Vec2) -> Self {
        Self {
            offset,
            half_extents,
            active: true,
            visible: true,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn block_item() -> Item {
        let config = GameConfig::default();
        // block_i: four cells in a row
        Item::from_prefab(ItemId(1), PrefabId(0), &config.catalog[0])
    }

    fn ground(center: Vec2, half: Vec2) -> SceneCollider {
        SceneCollider {
            aabb: Aabb::from_center(center, half),
            layer: Layer::GROUND,
            trigger: false,
            body: Body::Platform(0),
            cell: 0,
        }
    }

    #[test]
    fn test_lifecycle_colliders() {
        let hold = HoldConfig::default();
        let mut item = block_item();
        assert!(item.colliders().is_empty());

        item.start_hold(PlayerSlot(0), Vec2::ZERO, 1.0);
        let held = item.colliders();
        assert_eq!(held.len(), 4);
        assert!(held.iter().all(|c| c.trigger && c.layer == Layer::START));
        assert_eq!(item.holder(), Some(PlayerSlot(0)));
        assert_eq!(item.body_type, BodyType::Kinematic);
        assert_eq!(item.tint, Tint::HELD);

        item.stop_hold(&hold);
        let placed = item.colliders();
        assert!(placed.iter().all(|c| !c.trigger && c.layer == Layer::PLACED));
        assert_eq!(item.body_type, BodyType::Dynamic);
        assert!(item.holder().is_none());
        assert_eq!(item.tint, Tint::WHITE);

        item.consume(0.5);
        assert!(item.colliders().is_empty());
        assert!(!item.update_consumed(0.25));
        assert!(item.update_consumed(0.25));
        item.return_to_pool();
        assert_eq!(item.phase, HoldPhase::Pooled);
    }

    #[test]
    fn test_facing_mirrors_cells() {
        let mut item = block_item();
        item.start_hold(PlayerSlot(0), Vec2::new(5.0, 0.0), -1.0);
        let xs: Vec<f32> = item.colliders().iter().map(|c| c.aabb.center().x).collect();
        assert_eq!(xs, vec![5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_overlap_detection() {
        let hold = HoldConfig::default();
        let mut scene = CollisionScene::new();
        scene.push(ground(Vec2::new(0.0, -1.0), Vec2::new(10.0, 0.5)));

        let mut item = block_item();
        // Resting exactly on the ground: touching is not overlapping
        item.start_hold(PlayerSlot(0), Vec2::ZERO, 1.0);
        assert!(!item.update_overlap(&scene, hold.overlap_margin, Body::Player(PlayerSlot(0))));
        assert_eq!(item.tint, Tint::HELD);

        // Sunk into the ground
        item.follow(Vec2::new(0.0, -0.3), 1.0);
        assert!(item.update_overlap(&scene, hold.overlap_margin, Body::Player(PlayerSlot(0))));
        assert_eq!(item.tint, Tint::OVERLAP);

        // Within the margin only
        item.follow(Vec2::new(0.0, -0.05), 1.0);
        assert!(!item.update_overlap(&scene, hold.overlap_margin, Body::Player(PlayerSlot(0))));
    }

    #[test]
    fn test_overlap_ignores_holder() {
        let mut scene = CollisionScene::new();
        scene.push(SceneCollider {
            aabb: Aabb::from_center(Vec2::ZERO, Vec2::splat(1.0)),
            layer: Layer::PLAYER,
            trigger: false,
            body: Body::Player(PlayerSlot(2)),
            cell: 0,
        });

        let mut item = block_item();
        item.start_hold(PlayerSlot(2), Vec2::ZERO, 1.0);
        assert!(!item.update_overlap(&scene, 0.1, Body::Player(PlayerSlot(2))));
        assert!(item.update_overlap(&scene, 0.1, Body::Player(PlayerSlot(1))));
    }

    #[test]
    fn test_appear_sequence() {
        let hold = HoldConfig::default();
        let mut item = block_item();
        item.start_hold(PlayerSlot(0), Vec2::ZERO, 1.0);
        item.stop_hold(&hold);

        // First cell appears immediately, the rest 0.1 s apart
        let visible = |item: &Item| item.cells.iter().filter(|c| c.visible).count();
        assert_eq!(visible(&item), 1);
        item.update_appear(0.1);
        assert_eq!(visible(&item), 2);
        item.update_appear(0.25);
        assert_eq!(visible(&item), 4);
        assert!(item.appear.is_none());
    }

    #[test]
    fn test_disable_cells_until_empty() {
        let mut item = block_item();
        assert!(!item.disable_cell(0));
        assert!(!item.disable_cell(1));
        assert!(!item.disable_cell(2));
        assert!(item.disable_cell(3));
    }

    #[test]
    fn test_kinematic_ignores_impulse() {
        let hold = HoldConfig::default();
        let mut item = block_item();
        item.start_hold(PlayerSlot(0), Vec2::ZERO, 1.0);
        item.add_impulse(Vec2::UP);
        assert_eq!(item.velocity, Vec2::ZERO);

        item.stop_hold(&hold);
        item.add_impulse(Vec2::UP);
        assert_eq!(item.velocity, Vec2::UP);
    }

    #[test]
    fn test_tint_lerp() {
        let mid = Tint::WHITE.lerp(Tint::RED, 0.5);
        assert_eq!(mid, Tint::rgba(1.0, 0.5, 0.5, 1.0));
    }
}
