//! Arena Geometry
//!
//! Static ground colliders and per-slot spawn points.

use crate::config::ArenaConfig;
use crate::core::vec2::Vec2;
use crate::game::collision::{Aabb, Body, Layer, SceneCollider};
use crate::game::player::PlayerSlot;

/// Ground colliders for every platform, in config order.
pub fn platform_colliders(arena: &ArenaConfig) -> impl Iterator<Item = SceneCollider> + '_ {
    arena.platforms.iter().enumerate().map(|(i, platform)| SceneCollider {
        aabb: Aabb::from_center(platform.center, platform.half_extents),
        layer: Layer::GROUND,
        trigger: false,
        body: Body::Platform(i as u16),
        cell: 0,
    })
}

/// Spawn point of a slot. Falls back to the origin for slots without one.
pub fn spawn_point(arena: &ArenaConfig, slot: PlayerSlot) -> Vec2 {
    arena.spawn_points.get(slot.index()).copied().unwrap_or(Vec2::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platforms_are_ground() {
        let arena = ArenaConfig::default();
        let colliders: Vec<_> = platform_colliders(&arena).collect();
        assert_eq!(colliders.len(), arena.platforms.len());
        assert!(colliders.iter().all(|c| c.layer == Layer::GROUND && !c.trigger));
        assert_eq!(colliders[1].body, Body::Platform(1));
    }

    #[test]
    fn test_spawn_points_stand_on_the_floor() {
        let arena = ArenaConfig::default();
        let floor_top = arena.platforms[0].center.y + arena.platforms[0].half_extents.y;
        for slot in 0..4 {
            let spawn = spawn_point(&arena, PlayerSlot(slot));
            assert!(spawn.y > floor_top);
        }
        let empty = ArenaConfig {
            spawn_points: Vec::new(),
            ..Default::default()
        };
        assert_eq!(spawn_point(&empty, PlayerSlot(2)), Vec2::ZERO);
    }
}
