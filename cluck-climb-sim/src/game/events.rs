//! Game Events
//!
//! Everything observable a tick produced, in a stable order. The host turns
//! these into sounds, music changes, particles and log lines.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::capsule::CapsuleId;
use crate::game::countdown::CountdownStage;
use crate::game::holdable::{ItemId, PrefabId};
use crate::game::input::InputScheme;
use crate::game::player::PlayerSlot;
use crate::game::state::MatchPhase;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Player deaths processed first
    PlayerElimination = 0,
    /// Joins, readiness, phases, round results
    MatchFlow = 1,
    /// Item pickup and placement
    Items = 2,
    /// Bombs, springs, capsules
    Hazards = 3,
    /// Jumps and kicks
    Movement = 4,
    /// Sound and music cues
    Audio = 254,
    /// Lowest priority
    Other = 255,
}

/// Sound effect cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Player jumped
    Jump,
    /// Item placed
    BlockPlacement,
    /// Cluck button
    Cluck,
    /// Kick swing
    Kick,
    /// Bomb went off
    Explosion,
    /// Spring bounce
    Spring,
    /// Capsule damaged
    CapsuleHit,
    /// Capsule broken open
    CapsuleBreak,
    /// Player eliminated
    Death,
}

impl SoundCue {
    /// Asset id of the clip.
    pub fn id(self) -> &'static str {
        match self {
            SoundCue::Jump => "jump",
            SoundCue::BlockPlacement => "block_placement",
            SoundCue::Cluck => "cluck",
            SoundCue::Kick => "kick",
            SoundCue::Explosion => "explosion",
            SoundCue::Spring => "spring",
            SoundCue::CapsuleHit => "capsule_hit",
            SoundCue::CapsuleBreak => "capsule_break",
            SoundCue::Death => "death",
        }
    }
}

/// Background music track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicTrack {
    /// Lobby loop
    Menu,
    /// In-round loop
    Game,
}

impl MusicTrack {
    /// Asset id of the track.
    pub fn id(self) -> &'static str {
        match self {
            MusicTrack::Menu => "Menu",
            MusicTrack::Game => "Game",
        }
    }
}

/// Why a player was eliminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Fell below the camera
    Fell,
    /// Caught in a bomb blast
    Exploded,
    /// Left the match mid-round
    Left,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Player took a slot
    PlayerJoined {
        /// Slot taken
        slot: PlayerSlot,
        /// Device used
        scheme: InputScheme,
    },
    /// Player freed a slot
    PlayerLeft {
        /// Slot freed
        slot: PlayerSlot,
    },
    /// Lobby ready flag toggled
    ReadyChanged {
        /// Player
        slot: PlayerSlot,
        /// New flag
        ready: bool,
    },
    /// Match phase changed
    PhaseChanged {
        /// Previous phase
        from: MatchPhase,
        /// New phase
        to: MatchPhase,
    },
    /// Countdown moved on
    Countdown {
        /// Stage entered
        stage: CountdownStage,
    },
    /// Player jumped
    PlayerJumped {
        /// Player
        slot: PlayerSlot,
    },
    /// Player kicked
    PlayerKicked {
        /// Player
        slot: PlayerSlot,
    },
    /// Player was eliminated
    PlayerEliminated {
        /// Victim
        slot: PlayerSlot,
        /// Cause
        cause: DeathCause,
        /// Players still alive afterwards
        alive_left: u8,
    },
    /// Round won
    RoundWon {
        /// Survivor
        slot: PlayerSlot,
        /// Rounds won so far
        rounds_won: u8,
    },
    /// Match won
    MatchWon {
        /// First player to the round target
        slot: PlayerSlot,
    },
    /// Player got an item out of a capsule
    ItemAcquired {
        /// Player
        slot: PlayerSlot,
        /// Item
        item: ItemId,
        /// Catalog entry
        prefab: PrefabId,
    },
    /// Held item committed to the world
    ItemPlaced {
        /// Player
        slot: PlayerSlot,
        /// Item
        item: ItemId,
        /// Where
        position: Vec2,
    },
    /// Bomb went off
    BombExploded {
        /// Bomb
        item: ItemId,
        /// Blast centre
        position: Vec2,
    },
    /// Spring bounced a player
    SpringBounced {
        /// Spring
        item: ItemId,
        /// Player
        slot: PlayerSlot,
    },
    /// Capsule dropped into the arena
    CapsuleSpawned {
        /// Capsule
        capsule: CapsuleId,
        /// Where
        position: Vec2,
    },
    /// Capsule took damage
    CapsuleDamaged {
        /// Capsule
        capsule: CapsuleId,
        /// Life left
        life: f32,
    },
    /// Capsule broken open
    CapsuleBroken {
        /// Capsule
        capsule: CapsuleId,
        /// Kicker
        slot: PlayerSlot,
    },
    /// Play a sound
    Sound(SoundCue),
    /// Switch music
    Music(MusicTrack),
    /// Camera shake started
    CameraShake {
        /// Length (s)
        duration: f32,
        /// Peak offset
        amplitude: f32,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Player involved (for tie-breaking)
    pub slot: Option<PlayerSlot>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        let slot = match &data {
            GameEventData::PlayerJoined { slot, .. }
            | GameEventData::PlayerLeft { slot }
            | GameEventData::ReadyChanged { slot, .. }
            | GameEventData::PlayerJumped { slot }
            | GameEventData::PlayerKicked { slot }
            | GameEventData::PlayerEliminated { slot, .. }
            | GameEventData::RoundWon { slot, .. }
            | GameEventData::MatchWon { slot }
            | GameEventData::ItemAcquired { slot, .. }
            | GameEventData::ItemPlaced { slot, .. }
            | GameEventData::SpringBounced { slot, .. }
            | GameEventData::CapsuleBroken { slot, .. } => Some(*slot),
            _ => None,
        };

        Self {
            tick,
            priority,
            slot,
            data,
        }
    }

    /// Create player eliminated event.
    pub fn player_eliminated(tick: u32, slot: PlayerSlot, cause: DeathCause, alive_left: u8) -> Self {
        Self::new(
            tick,
            EventPriority::PlayerElimination,
            GameEventData::PlayerEliminated { slot, cause, alive_left },
        )
    }

    /// Create phase changed event.
    pub fn phase_changed(tick: u32, from: MatchPhase, to: MatchPhase) -> Self {
        Self::new(tick, EventPriority::MatchFlow, GameEventData::PhaseChanged { from, to })
    }

    /// Create a match flow event.
    pub fn flow(tick: u32, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::MatchFlow, data)
    }

    /// Create an item event.
    pub fn item(tick: u32, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::Items, data)
    }

    /// Create a hazard event.
    pub fn hazard(tick: u32, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::Hazards, data)
    }

    /// Create a movement event.
    pub fn movement(tick: u32, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::Movement, data)
    }

    /// Create sound cue event.
    pub fn sound(tick: u32, cue: SoundCue) -> Self {
        Self::new(tick, EventPriority::Audio, GameEventData::Sound(cue))
    }

    /// Create music change event.
    pub fn music(tick: u32, track: MusicTrack) -> Self {
        Self::new(tick, EventPriority::Audio, GameEventData::Music(track))
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.slot == other.slot
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then slot
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.slot.cmp(&other.slot))
    }
}
