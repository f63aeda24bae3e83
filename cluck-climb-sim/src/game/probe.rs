//! Ground/Head Probe
//!
//! Three rays below and three above the player. Grounded and head-blocked are
//! the OR of their hits. The centre ray of each triple starts slightly further
//! out than the outer two.

use crate::config::ProbeConfig;
use crate::core::vec2::Vec2;
use crate::game::collision::{Body, CollisionScene, Layer};

/// Result of probing around one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Something solid is under the feet
    pub grounded: bool,
    /// Something solid is over the head
    pub head_blocked: bool,
}

/// Origins of the three downward rays.
pub fn ground_ray_origins(position: Vec2, probe: &ProbeConfig) -> [Vec2; 3] {
    let y = position.y - probe.spacing_y;
    [
        Vec2::new(position.x - probe.spacing, y),
        Vec2::new(position.x, y - probe.center_extra),
        Vec2::new(position.x + probe.spacing, y),
    ]
}

/// Origins of the three upward rays.
pub fn head_ray_origins(position: Vec2, probe: &ProbeConfig) -> [Vec2; 3] {
    let y = position.y + probe.head_check;
    [
        Vec2::new(position.x - probe.spacing, y),
        Vec2::new(position.x, y + probe.center_extra),
        Vec2::new(position.x + probe.spacing, y),
    ]
}

/// Probe the scene around `position`, ignoring the player's own body.
pub fn probe(scene: &CollisionScene, body: Body, position: Vec2, probe: &ProbeConfig) -> ProbeResult {
    let cast = |origin: Vec2, dir: Vec2| {
        scene
            .raycast(origin, dir, probe.ray_distance, Layer::GROUND_MASK, Some(body))
            .is_some()
    };

    ProbeResult {
        grounded: ground_ray_origins(position, probe)
            .into_iter()
            .any(|o| cast(o, Vec2::DOWN)),
        head_blocked: head_ray_origins(position, probe)
            .into_iter()
            .any(|o| cast(o, Vec2::UP)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::collision::{Aabb, SceneCollider};
    use crate::game::player::PlayerSlot;

    fn scene_with(boxes: &[(Vec2, Vec2, Layer)]) -> CollisionScene {
        let mut scene = CollisionScene::new();
        for (i, (center, half, layer)) in boxes.iter().enumerate() {
            scene.push(SceneCollider {
                aabb: Aabb::from_center(*center, *half),
                layer: *layer,
                trigger: false,
                body: Body::Platform(i as u16),
                cell: 0,
            });
        }
        scene
    }

    #[test]
    fn test_grounded_on_floor() {
        let scene = scene_with(&[(Vec2::new(0.0, -1.0), Vec2::new(5.0, 0.3), Layer::GROUND)]);
        let me = Body::Player(PlayerSlot(0));
        let cfg = ProbeConfig::default();

        // Floor top at -0.7, rays start at -0.2 and reach -0.75
        let result = probe(&scene, me, Vec2::ZERO, &cfg);
        assert!(result.grounded);
        assert!(!result.head_blocked);

        // Lifted one unit: nothing in reach
        let result = probe(&scene, me, Vec2::new(0.0, 1.0), &cfg);
        assert!(!result.grounded);
    }

    #[test]
    fn test_edge_caught_by_outer_ray() {
        // Ledge ends just right of the left ray
        let scene = scene_with(&[(Vec2::new(-1.0, -1.0), Vec2::new(0.85, 0.3), Layer::GROUND)]);
        let result = probe(&scene, Body::Player(PlayerSlot(0)), Vec2::ZERO, &ProbeConfig::default());
        assert!(result.grounded);
    }

    #[test]
    fn test_head_blocked() {
        let scene = scene_with(&[(Vec2::new(0.0, 1.0), Vec2::new(5.0, 0.3), Layer::PLACED)]);
        let result = probe(&scene, Body::Player(PlayerSlot(0)), Vec2::ZERO, &ProbeConfig::default());
        assert!(result.head_blocked);
        assert!(!result.grounded);
    }

    #[test]
    fn test_ignores_other_layers() {
        let scene = scene_with(&[(Vec2::new(0.0, -1.0), Vec2::new(5.0, 0.3), Layer::CAPSULE)]);
        let result = probe(&scene, Body::Player(PlayerSlot(0)), Vec2::ZERO, &ProbeConfig::default());
        assert!(!result.grounded);
    }
}
