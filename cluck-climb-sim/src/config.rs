//! Game Configuration
//!
//! Every tunable of the simulation, grouped by subsystem. `GameConfig::default()`
//! is the shipped tuning. A JSON file may override any subset of fields; missing
//! fields fall back to their defaults.
//!
//! Environment:
//! - `CLUCK_CONFIG`: path to a JSON config file (optional)
//! - `CLUCK_SEED`: match RNG seed (optional, decimal or `0x` hex)

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::core::Vec2;
use crate::MAX_PLAYERS;

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "CLUCK_CONFIG";

/// Environment variable carrying the match seed.
pub const SEED_ENV: &str = "CLUCK_SEED";

/// Seed used when `CLUCK_SEED` is not set.
pub const DEFAULT_SEED: u64 = 0xC1_0C_C1_1B;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `GameConfig`
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Seed variable is not a number
    #[error("invalid seed {0:?}")]
    Seed(String),

    /// A value is out of its allowed range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

// =============================================================================
// PLATFORMER
// =============================================================================

/// Movement tuning for player characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformerValues {
    /// Top horizontal speed (units/s)
    pub max_speed: f32,
    /// Smooth time while accelerating (s)
    pub acceleration_time: f32,
    /// Smooth time while decelerating (s)
    pub deceleration_time: f32,
    /// Apex height of a held jump (units)
    pub peak_height: f32,
    /// Time to reach the apex (s)
    pub time_to_peak: f32,
    /// Extra gravity while falling
    pub fall_multiplier: f32,
    /// Extra gravity while rising with jump released
    pub low_jump_multiplier: f32,
    /// Gravity reduction while falling with jump held
    pub glide_resistance: f32,
    /// Fall speed limit while gliding (negative)
    pub glide_fall_limit: f32,
    /// Fall speed limit otherwise (negative)
    pub max_fall_speed: f32,
    /// Rise speed limit
    pub max_rise_speed: f32,
    /// Vertical velocity applied while standing
    pub ground_stick_velocity: f32,
    /// Grace period after leaving ground (s)
    pub coyote_time: f32,
    /// How long a jump press is remembered (s)
    pub jump_buffer_time: f32,
    /// Impulse a kick gives a player, for a kicker facing right
    pub kick_force: Vec2,
}

impl Default for PlatformerValues {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            acceleration_time: 0.1,
            deceleration_time: 0.2,
            peak_height: 4.0,
            time_to_peak: 0.4,
            fall_multiplier: 2.5,
            low_jump_multiplier: 2.0,
            glide_resistance: 1.0,
            glide_fall_limit: -4.0,
            max_fall_speed: -25.0,
            max_rise_speed: 50.0,
            ground_stick_velocity: -0.1,
            coyote_time: 0.15,
            jump_buffer_time: 0.15,
            kick_force: Vec2::new(8.0, 6.0),
        }
    }
}

/// Player body and action timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Half size of the player's collider
    pub half_extents: Vec2,
    /// Kick hitbox lifetime (s)
    pub kick_duration: f32,
    /// Kick hitbox centre relative to the player, for facing right
    pub kick_offset: Vec2,
    /// Kick hitbox half size
    pub kick_half_extents: Vec2,
    /// Damage a kick deals to a capsule
    pub kick_damage: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(0.4, 0.7),
            kick_duration: 0.5,
            kick_offset: Vec2::new(0.8, 0.0),
            kick_half_extents: Vec2::new(0.5, 0.6),
            kick_damage: 1.0,
        }
    }
}

/// Ground and ceiling ray layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Length of every probe ray
    pub ray_distance: f32,
    /// Lateral offset of the outer rays
    pub spacing: f32,
    /// Downward offset of the ground ray origins
    pub spacing_y: f32,
    /// Upward offset of the head ray origins
    pub head_check: f32,
    /// Extra offset of the centre ray
    pub center_extra: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ray_distance: 0.55,
            spacing: 0.2,
            spacing_y: 0.2,
            head_check: 0.2,
            center_extra: 0.07,
        }
    }
}

// =============================================================================
// ITEMS AND HAZARDS
// =============================================================================

/// Carrying and placing items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Carry anchor relative to the player, for facing right
    pub carry_offset: Vec2,
    /// Shrink applied to each cell before the overlap query
    pub overlap_margin: f32,
    /// Time after pickup before the item can be placed (s)
    pub pickup_cooldown: f32,
    /// Delay between cells receiving the appear trigger (s)
    pub appear_step: f32,
    /// Time a consumed item lingers before returning to its pool (s)
    pub consumed_linger: f32,
    /// Gravity applied to dynamic items (units/s²)
    pub item_gravity: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            carry_offset: Vec2::new(1.3, 0.3),
            overlap_margin: 0.1,
            pickup_cooldown: 0.3,
            appear_step: 0.1,
            consumed_linger: 0.5,
            item_gravity: -25.0,
        }
    }
}

/// Bomb tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BombConfig {
    /// Fuse length (s), floored at 0.0001
    pub fuse_seconds: f32,
    /// Blast radius (units)
    pub explosion_radius: f32,
    /// Impulse at the blast centre
    pub explosion_impulse: f32,
    /// Delay between exploding and being consumed (s)
    pub despawn_delay: f32,
    /// Shake applied to the camera on explosion (s, amplitude)
    pub shake: (f32, f32),
}

impl Default for BombConfig {
    fn default() -> Self {
        Self {
            fuse_seconds: 1.25,
            explosion_radius: 3.0,
            explosion_impulse: 12.0,
            despawn_delay: 0.0,
            shake: (0.35, 0.5),
        }
    }
}

/// Spring tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Impulse given to a touching player
    pub bounce_force: f32,
    /// Velocity damping rate while moving
    pub attenuation_on_movement: f32,
    /// Length of the squash animation (s)
    pub squash_time: f32,
    /// Squared speed below which the spring goes to sleep
    pub sleep_speed_sq: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            bounce_force: 18.0,
            attenuation_on_movement: 2.0,
            squash_time: 0.2,
            sleep_speed_sq: 0.01,
        }
    }
}

/// Capsule tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Starting life
    pub base_life: f32,
    /// Number of damage sprites
    pub damage_sprites: u8,
    /// Half size of the capsule collider
    pub half_extents: Vec2,
    /// Instances created up front
    pub prewarm: u32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            base_life: 3.0,
            damage_sprites: 3,
            half_extents: Vec2::new(0.45, 0.45),
            prewarm: 4,
        }
    }
}

/// Capsule spawner tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Mean interval between spawns (s)
    pub spawn_time: f32,
    /// Random spread applied to the interval (s)
    pub spawn_time_modifier: f32,
    /// Leftmost spawn x
    pub x_min: f32,
    /// Rightmost spawn x
    pub x_max: f32,
    /// Spawn height above the camera
    pub y_offset: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            spawn_time: 2.0,
            spawn_time_modifier: 0.5,
            x_min: -6.0,
            x_max: 6.0,
            y_offset: 10.0,
        }
    }
}

// =============================================================================
// CAMERA AND MATCH
// =============================================================================

/// Rising camera tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical follow smooth time (s)
    pub smooth_time_y: f32,
    /// Lowest height the camera will follow to
    pub min_follow_height: f32,
    /// Offset added to the tracked height
    pub y_offset: f32,
    /// Half view height during play
    pub normal_ortho_size: f32,
    /// Half view height when focusing a winner
    pub winner_ortho_size: f32,
    /// Zoom smooth time (s)
    pub zoom_smooth_time: f32,
    /// Default death shake duration (s)
    pub shake_duration: f32,
    /// Default death shake amplitude
    pub shake_amplitude: f32,
    /// Shake noise frequency
    pub shake_frequency: f32,
    /// Shake along x
    pub shake_x: bool,
    /// Shake along y
    pub shake_y: bool,
    /// Distance below the view at which players die
    pub kill_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            smooth_time_y: 0.5,
            min_follow_height: 1.0,
            y_offset: 0.0,
            normal_ortho_size: 8.0,
            winner_ortho_size: 4.5,
            zoom_smooth_time: 0.4,
            shake_duration: 0.35,
            shake_amplitude: 0.5,
            shake_frequency: 25.0,
            shake_x: true,
            shake_y: true,
            kill_margin: 1.0,
        }
    }
}

/// Round and match rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Minimum ready players to start
    pub required_players: u8,
    /// Round wins needed to win the match
    pub rounds_to_win: u8,
    /// Duration of the "Ready..." step (s)
    pub ready_step: f32,
    /// Duration of the "Steady..." step (s)
    pub steady_step: f32,
    /// How long "GO!" stays on screen (s)
    pub go_hold: f32,
    /// Time the round result is shown (s)
    pub round_result_delay: f32,
    /// Time the final ranks are shown (s)
    pub results_delay: f32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            required_players: 2,
            rounds_to_win: 3,
            ready_step: 2.0,
            steady_step: 2.0,
            go_hold: 1.0,
            round_result_delay: 3.0,
            results_delay: 4.0,
        }
    }
}

// =============================================================================
// ARENA AND CATALOG
// =============================================================================

/// Static solid rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Centre
    pub center: Vec2,
    /// Half size
    pub half_extents: Vec2,
}

impl PlatformSpec {
    const fn new(x: f32, y: f32, hw: f32, hh: f32) -> Self {
        Self {
            center: Vec2::new(x, y),
            half_extents: Vec2::new(hw, hh),
        }
    }
}

/// Arena layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Static ground and walls
    pub platforms: Vec<PlatformSpec>,
    /// Spawn point per slot
    pub spawn_points: Vec<Vec2>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            platforms: vec![
                // Floor
                PlatformSpec::new(0.0, -7.0, 9.0, 1.0),
                // Side walls, tall enough for a long climb
                PlatformSpec::new(-9.5, 40.0, 0.5, 50.0),
                PlatformSpec::new(9.5, 40.0, 0.5, 50.0),
                // Starter ledges
                PlatformSpec::new(-5.0, -2.5, 1.5, 0.25),
                PlatformSpec::new(5.0, -2.5, 1.5, 0.25),
            ],
            spawn_points: vec![
                Vec2::new(-6.0, -5.3),
                Vec2::new(-2.0, -5.3),
                Vec2::new(2.0, -5.3),
                Vec2::new(6.0, -5.3),
            ],
        }
    }
}

/// What a catalog entry turns into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrefabKind {
    /// Unit cells at integer offsets from the block origin
    Block {
        /// Cell offsets
        cells: Vec<[i8; 2]>,
    },
    /// Fused explosive
    Bomb,
    /// Bouncy disc
    Spring,
}

/// Entry of the item catalog that capsules roll from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabSpec {
    /// Display name
    pub name: String,
    /// Behaviour
    pub kind: PrefabKind,
    /// Instances created up front
    pub prewarm: u32,
}

impl PrefabSpec {
    fn block(name: &str, cells: &[[i8; 2]]) -> Self {
        Self {
            name: name.to_string(),
            kind: PrefabKind::Block { cells: cells.to_vec() },
            prewarm: 2,
        }
    }
}

fn default_catalog() -> Vec<PrefabSpec> {
    vec![
        PrefabSpec::block("block_i", &[[0, 0], [1, 0], [2, 0], [3, 0]]),
        PrefabSpec::block("block_o", &[[0, 0], [1, 0], [0, 1], [1, 1]]),
        PrefabSpec::block("block_l", &[[0, 0], [1, 0], [2, 0], [2, 1]]),
        PrefabSpec::block("block_t", &[[0, 0], [1, 0], [2, 0], [1, 1]]),
        PrefabSpec::block("block_s", &[[0, 0], [1, 0], [1, 1], [2, 1]]),
        PrefabSpec {
            name: "bomb".to_string(),
            kind: PrefabKind::Bomb,
            prewarm: 2,
        },
        PrefabSpec {
            name: "spring".to_string(),
            kind: PrefabKind::Spring,
            prewarm: 2,
        },
    ]
}

// =============================================================================
// TOP LEVEL
// =============================================================================

/// Complete simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Movement tuning
    pub platformer: PlatformerValues,
    /// Player body and kick
    pub player: PlayerConfig,
    /// Ground/head probe
    pub probe: ProbeConfig,
    /// Item holding
    pub holding: HoldConfig,
    /// Bomb
    pub bomb: BombConfig,
    /// Spring
    pub spring: SpringConfig,
    /// Capsule
    pub capsule: CapsuleConfig,
    /// Capsule spawner
    pub spawner: SpawnerConfig,
    /// Camera rig
    pub camera: CameraConfig,
    /// Match rules
    pub rules: MatchRules,
    /// Arena layout
    pub arena: ArenaConfig,
    /// Items a capsule can break into
    pub catalog: Vec<PrefabSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            platformer: PlatformerValues::default(),
            player: PlayerConfig::default(),
            probe: ProbeConfig::default(),
            holding: HoldConfig::default(),
            bomb: BombConfig::default(),
            spring: SpringConfig::default(),
            capsule: CapsuleConfig::default(),
            spawner: SpawnerConfig::default(),
            camera: CameraConfig::default(),
            rules: MatchRules::default(),
            arena: ArenaConfig::default(),
            catalog: default_catalog(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Load from `CLUCK_CONFIG` if set, else the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => {
                info!("Loading config from {}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.platformer;
        positive("platformer.peak_height", p.peak_height)?;
        positive("platformer.time_to_peak", p.time_to_peak)?;
        positive("platformer.max_speed", p.max_speed)?;
        positive("platformer.acceleration_time", p.acceleration_time)?;
        positive("platformer.deceleration_time", p.deceleration_time)?;
        positive("player.kick_duration", self.player.kick_duration)?;
        positive("probe.ray_distance", self.probe.ray_distance)?;
        positive("bomb.explosion_radius", self.bomb.explosion_radius)?;
        positive("capsule.base_life", self.capsule.base_life)?;
        positive("spawner.spawn_time", self.spawner.spawn_time)?;
        positive("camera.normal_ortho_size", self.camera.normal_ortho_size)?;
        positive("camera.winner_ortho_size", self.camera.winner_ortho_size)?;

        if self.spawner.spawn_time_modifier >= self.spawner.spawn_time {
            return Err(ConfigError::Invalid(
                "spawner.spawn_time_modifier must be below spawn_time".into(),
            ));
        }
        if self.spawner.x_min > self.spawner.x_max {
            return Err(ConfigError::Invalid("spawner.x_min exceeds x_max".into()));
        }
        if self.capsule.damage_sprites == 0 {
            return Err(ConfigError::Invalid("capsule.damage_sprites must be at least 1".into()));
        }

        let rules = &self.rules;
        if rules.required_players < 2 || rules.required_players as usize > MAX_PLAYERS {
            return Err(ConfigError::Invalid(format!(
                "rules.required_players must be within 2..={}",
                MAX_PLAYERS
            )));
        }
        if rules.rounds_to_win == 0 {
            return Err(ConfigError::Invalid("rules.rounds_to_win must be at least 1".into()));
        }

        if self.arena.spawn_points.len() < MAX_PLAYERS {
            return Err(ConfigError::Invalid(format!(
                "arena needs {} spawn points, got {}",
                MAX_PLAYERS,
                self.arena.spawn_points.len()
            )));
        }
        if self.catalog.is_empty() {
            return Err(ConfigError::Invalid("item catalog is empty".into()));
        }
        if self.catalog.len() > u16::MAX as usize {
            return Err(ConfigError::Invalid("item catalog is too large".into()));
        }
        for spec in &self.catalog {
            if let PrefabKind::Block { cells } = &spec.kind {
                if cells.is_empty() {
                    return Err(ConfigError::Invalid(format!("block {} has no cells", spec.name)));
                }
            }
        }

        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)))
    }
}

/// Read the match seed from `CLUCK_SEED`, falling back to [`DEFAULT_SEED`].
pub fn seed_from_env() -> Result<u64, ConfigError> {
    match std::env::var(SEED_ENV) {
        Ok(raw) => parse_seed(&raw),
        Err(_) => Ok(DEFAULT_SEED),
    }
}

/// Parse a decimal or `0x`-prefixed hex seed.
pub fn parse_seed(raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| ConfigError::Seed(raw.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(
            r#"{ "platformer": { "peak_height": 5.0 }, "rules": { "rounds_to_win": 2 } }"#,
        )
        .unwrap();

        assert_eq!(config.platformer.peak_height, 5.0);
        assert_eq!(config.platformer.time_to_peak, 0.4);
        assert_eq!(config.rules.rounds_to_win, 2);
        assert_eq!(config.rules.required_players, 2);
        assert_eq!(config.catalog.len(), default_catalog().len());
    }

    #[test]
    fn test_catalog_json() {
        let config = GameConfig::from_json_str(
            r#"{ "catalog": [
                { "name": "domino", "kind": { "type": "block", "cells": [[0,0],[1,0]] }, "prewarm": 1 },
                { "name": "bomb", "kind": { "type": "bomb" }, "prewarm": 0 }
            ] }"#,
        )
        .unwrap();

        assert_eq!(config.catalog.len(), 2);
        assert_eq!(config.catalog[1].kind, PrefabKind::Bomb);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = GameConfig::default();
        config.platformer.time_to_peak = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = GameConfig::default();
        config.catalog.clear();
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.arena.spawn_points.truncate(2);
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.rules.required_players = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = GameConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42").unwrap(), 42);
        assert_eq!(parse_seed("0xff").unwrap(), 255);
        assert_eq!(parse_seed(" 7 ").unwrap(), 7);
        assert!(matches!(parse_seed("chicken"), Err(ConfigError::Seed(_))));
    }
}
