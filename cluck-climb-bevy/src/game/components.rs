//! Render-side components mirroring simulation entities
//!
//! The simulation owns every gameplay value; these only tie sprites back to
//! the slot or id they draw.

use bevy::prelude::*;

use cluck_climb::game::capsule::CapsuleId;
use cluck_climb::game::holdable::ItemId;
use cluck_climb::PlayerSlot;

// ============================================================================
// CAMERA
// ============================================================================

/// The one gameplay camera
#[derive(Component)]
pub struct MainCamera;

// ============================================================================
// SIM MIRRORS
// ============================================================================

/// Sprite for a player slot
#[derive(Component)]
pub struct ChickenSprite(pub PlayerSlot);

/// One cell of an item
#[derive(Component)]
pub struct CellSprite {
    pub item: ItemId,
    pub cell: usize,
}

/// Sprite for a capsule
#[derive(Component)]
pub struct CapsuleSprite(pub CapsuleId);

/// Static platform
#[derive(Component)]
pub struct PlatformSprite;

// ============================================================================
// EFFECTS
// ============================================================================

/// Short-lived burst particle
#[derive(Component)]
pub struct Particle {
    pub velocity: Vec2,
    pub lifetime: f32,
    pub max_lifetime: f32,
}

/// Looping background music
#[derive(Component)]
pub struct MusicPlayer;
