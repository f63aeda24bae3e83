//! Visuals - sprites mirrored from the simulation, camera and particles

use bevy::prelude::*;
use bevy::render::camera::ScalingMode;

use cluck_climb::config::PrefabKind;
use cluck_climb::game::events::GameEventData;
use cluck_climb::game::holdable::{HoldPhase, Item, ItemBehavior, Tint};

use super::{CapsuleSprite, CellSprite, ChickenSprite, MainCamera, Particle, PlatformSprite, SimEvent, SimWorld};

/// Chicken colours per slot
const SLOT_COLORS: [Color; 4] = [
    Color::srgb(1.0, 1.0, 1.0),
    Color::srgb(1.0, 0.85, 0.3),
    Color::srgb(0.95, 0.55, 0.2),
    Color::srgb(0.55, 0.35, 0.2),
];

/// Block colours, cycled by catalog index
const BLOCK_COLORS: [Color; 5] = [
    Color::srgb(0.3, 0.8, 0.9),
    Color::srgb(0.95, 0.85, 0.25),
    Color::srgb(0.95, 0.55, 0.2),
    Color::srgb(0.7, 0.4, 0.9),
    Color::srgb(0.4, 0.85, 0.4),
];

fn item_color(item: &Item, sim: &SimWorld) -> Color {
    let kind = sim.config.catalog.get(item.prefab.0 as usize).map(|spec| &spec.kind);
    match kind {
        Some(PrefabKind::Bomb) => Color::srgb(0.2, 0.2, 0.25),
        Some(PrefabKind::Spring) => Color::srgb(0.3, 0.9, 0.45),
        _ => BLOCK_COLORS[item.prefab.0 as usize % BLOCK_COLORS.len()],
    }
}

fn tinted(base: Color, tint: Tint) -> Color {
    let base = base.to_srgba();
    Color::srgba(base.red * tint.r, base.green * tint.g, base.blue * tint.b, base.alpha * tint.a)
}

fn to_bevy(v: cluck_climb::Vec2) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// ============================================================================
// SPAWNING
// ============================================================================

/// Platforms from the arena layout
pub fn spawn_arena(mut commands: Commands, sim: Res<SimWorld>) {
    for platform in &sim.config.arena.platforms {
        commands.spawn((
            Sprite {
                color: Color::srgb(0.35, 0.25, 0.2),
                custom_size: Some(to_bevy(platform.half_extents) * 2.0),
                ..default()
            },
            Transform::from_translation(to_bevy(platform.center).extend(0.0)),
            PlatformSprite,
        ));
    }
}

/// Sprites for players, items and capsules that do not have one yet
pub fn spawn_missing_sprites(
    mut commands: Commands,
    sim: Res<SimWorld>,
    chickens: Query<&ChickenSprite>,
    cells: Query<&CellSprite>,
    capsules: Query<&CapsuleSprite>,
) {
    for player in sim.state.joined() {
        if chickens.iter().any(|c| c.0 == player.slot) {
            continue;
        }
        commands.spawn((
            Sprite {
                color: SLOT_COLORS[player.slot.index() % SLOT_COLORS.len()],
                custom_size: Some(to_bevy(sim.config.player.half_extents) * 2.0),
                ..default()
            },
            Transform::from_translation(to_bevy(player.position).extend(10.0)),
            ChickenSprite(player.slot),
            Name::new(format!("Chicken {}", player.slot)),
        ));
    }

    for item in sim.state.items.values() {
        if cells.iter().any(|c| c.item == item.id) {
            continue;
        }
        let color = item_color(item, &sim);
        for (index, cell) in item.cells.iter().enumerate() {
            commands.spawn((
                Sprite {
                    color,
                    custom_size: Some(to_bevy(cell.half_extents) * 2.0),
                    ..default()
                },
                Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)),
                Visibility::Hidden,
                CellSprite { item: item.id, cell: index },
            ));
        }
    }

    for capsule in sim.state.capsules.values() {
        if capsules.iter().any(|c| c.0 == capsule.id) {
            continue;
        }
        commands.spawn((
            Sprite {
                color: Color::srgb(0.9, 0.3, 0.5),
                custom_size: Some(to_bevy(sim.config.capsule.half_extents) * 2.0),
                ..default()
            },
            Transform::from_translation(Vec3::new(0.0, 0.0, 6.0)),
            Visibility::Hidden,
            CapsuleSprite(capsule.id),
        ));
    }
}

// ============================================================================
// SYNC
// ============================================================================

pub fn sync_chickens(
    sim: Res<SimWorld>,
    mut query: Query<(&ChickenSprite, &mut Transform, &mut Sprite, &mut Visibility)>,
) {
    for (chicken, mut transform, mut sprite, mut visibility) in query.iter_mut() {
        let Some(player) = sim.state.player(chicken.0) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        *visibility = if player.alive { Visibility::Inherited } else { Visibility::Hidden };
        transform.translation.x = player.position.x;
        transform.translation.y = player.position.y;
        sprite.flip_x = player.facing < 0.0;

        // Kicking chickens lean forward
        let lean = if player.kick.is_some() { -0.2 * player.facing } else { 0.0 };
        transform.rotation = Quat::from_rotation_z(lean);
    }
}

pub fn sync_items(
    sim: Res<SimWorld>,
    mut query: Query<(&CellSprite, &mut Transform, &mut Sprite, &mut Visibility)>,
) {
    for (cell_sprite, mut transform, mut sprite, mut visibility) in query.iter_mut() {
        let Some(item) = sim.state.items.get(&cell_sprite.item) else {
            continue;
        };
        let Some(cell) = item.cells.get(cell_sprite.cell) else {
            continue;
        };

        let shown = item.phase != HoldPhase::Pooled && cell.active && cell.visible;
        *visibility = if shown { Visibility::Inherited } else { Visibility::Hidden };
        if !shown {
            continue;
        }

        let center = item.cell_bounds(cell).center();
        transform.translation.x = center.x;
        transform.translation.y = center.y;
        transform.scale = match &item.behavior {
            ItemBehavior::Spring(spring) => {
                let squash = spring.squash_amount(&sim.config.spring);
                Vec3::new(1.0 + 0.2 * squash, 1.0 - 0.4 * squash, 1.0)
            }
            _ => Vec3::ONE,
        };
        sprite.color = tinted(item_color(item, &sim), item.tint);
    }
}

pub fn sync_capsules(
    sim: Res<SimWorld>,
    mut query: Query<(&CapsuleSprite, &mut Transform, &mut Sprite, &mut Visibility)>,
) {
    for (capsule_sprite, mut transform, mut sprite, mut visibility) in query.iter_mut() {
        let Some(capsule) = sim.state.capsules.get(&capsule_sprite.0) else {
            continue;
        };
        *visibility = if capsule.active { Visibility::Inherited } else { Visibility::Hidden };
        transform.translation.x = capsule.position.x;
        transform.translation.y = capsule.position.y;

        // Cracks darken the shell
        let wear = capsule.sprite as f32 / sim.config.capsule.damage_sprites.max(1) as f32;
        sprite.color = Color::srgb(0.9 - 0.4 * wear, 0.3, 0.5 - 0.2 * wear);
    }
}

/// Camera follows the rig, including shake and zoom
pub fn sync_camera(
    sim: Res<SimWorld>,
    mut query: Query<(&mut Transform, &mut OrthographicProjection), With<MainCamera>>,
) {
    let Ok((mut transform, mut projection)) = query.get_single_mut() else {
        return;
    };
    let rig = &sim.state.camera;
    let position = rig.position + rig.applied_shake;
    transform.translation.x = position.x;
    transform.translation.y = position.y;
    projection.scaling_mode = ScalingMode::FixedVertical { viewport_height: rig.ortho_size * 2.0 };
}

// ============================================================================
// PARTICLES
// ============================================================================

fn spawn_burst(commands: &mut Commands, at: Vec2, color: Color, count: usize, speed: f32) {
    for i in 0..count {
        let angle = (i as f32 / count as f32) * std::f32::consts::TAU;
        let speed = speed * (0.6 + rand::random::<f32>() * 0.4);
        let lifetime = 0.4 + rand::random::<f32>() * 0.3;

        commands.spawn((
            Particle {
                velocity: Vec2::new(angle.cos(), angle.sin()) * speed,
                lifetime,
                max_lifetime: lifetime,
            },
            Sprite {
                color,
                custom_size: Some(Vec2::splat(0.15 + rand::random::<f32>() * 0.1)),
                ..default()
            },
            Transform::from_translation(at.extend(12.0)),
        ));
    }
}

/// Explosions, feathers and capsule shards
pub fn spawn_bursts(mut commands: Commands, mut events: EventReader<SimEvent>, sim: Res<SimWorld>) {
    for SimEvent(event) in events.read() {
        match &event.data {
            GameEventData::BombExploded { position, .. } => {
                let radius = sim.config.bomb.explosion_radius;
                spawn_burst(&mut commands, to_bevy(*position), Color::srgb(1.0, 0.6, 0.1), 24, radius * 3.0);
            }
            GameEventData::PlayerEliminated { slot, .. } => {
                if let Some(player) = sim.state.player(*slot) {
                    spawn_burst(&mut commands, to_bevy(player.position), Color::WHITE, 12, 4.0);
                }
            }
            GameEventData::CapsuleBroken { capsule, .. } => {
                if let Some(capsule) = sim.state.capsules.get(capsule) {
                    spawn_burst(&mut commands, to_bevy(capsule.position), Color::srgb(0.9, 0.3, 0.5), 10, 3.0);
                }
            }
            _ => {}
        }
    }
}

/// Move, fade and expire particles
pub fn update_particles(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Particle, &mut Transform, &mut Sprite)>,
) {
    let dt = time.delta_secs();

    for (entity, mut particle, mut transform, mut sprite) in query.iter_mut() {
        transform.translation.x += particle.velocity.x * dt;
        transform.translation.y += particle.velocity.y * dt;
        particle.velocity *= 0.92;

        particle.lifetime -= dt;
        if particle.lifetime <= 0.0 {
            commands.entity(entity).despawn();
            continue;
        }

        let alpha = particle.lifetime / particle.max_lifetime;
        sprite.color = sprite.color.with_alpha(alpha);
    }
}
