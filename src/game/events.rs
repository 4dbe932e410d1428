//! Game Events
//!
//! One-shot outputs of the simulation: sound and visual cues tagged with a
//! visibility mask, kill feed entries, user-facing notices and spawn requests
//! for projectiles handled outside the core. The host drains the queue once
//! per tick in `(tick, priority, actor)` order.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::game::movement::ActorId;
use crate::game::weapon::Weapon;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths first
    Kill = 0,
    RaceFinished = 1,
    /// Projectile and beam spawns
    Spawn = 2,
    /// Sounds and visual cues
    Effect = 3,
    Notice = 4,
    /// Lowest priority
    Other = 255,
}

/// Sound cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundKind {
    PlayerJump,
    PlayerDie,
    PlayerPainLong,
    HookAttachPlayer,
    HookAttachGround,
    HookNoAttach,
    WeaponSwitch,
    WeaponSpawn,
    HammerFire,
    GunFire,
    ShotgunFire,
    GrenadeFire,
    LaserFire,
    NinjaFire,
    NinjaHit,
}

/// Event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    Sound {
        kind: SoundKind,
        pos: FixedVec2,
        mask: u64,
    },

    /// Countdown stars above an actor.
    DamageIndicator {
        pos: FixedVec2,
        amount: i32,
        mask: u64,
    },

    HammerHit {
        pos: FixedVec2,
        mask: u64,
    },

    DeathEffect {
        actor: ActorId,
        pos: FixedVec2,
        mask: u64,
    },

    /// `weapon = None` means the world killed the actor.
    Kill {
        victim: ActorId,
        killer: ActorId,
        weapon: Option<Weapon>,
    },

    /// Text for one actor's user.
    Notice {
        actor: ActorId,
        text: String,
    },

    /// The actor's client needs fresh tuning for its zone.
    TuningResync {
        actor: ActorId,
        zone: u8,
        faketuning: u8,
    },

    ZoneMessage {
        actor: ActorId,
        text: String,
    },

    RaceFinished {
        actor: ActorId,
        ticks: i64,
        checkpoints: Vec<i64>,
    },

    SpawnProjectile {
        owner: ActorId,
        weapon: Weapon,
        pos: FixedVec2,
        dir: FixedVec2,
        lifetime_ticks: i32,
        explosive: bool,
    },

    SpawnLaser {
        owner: ActorId,
        weapon: Weapon,
        pos: FixedVec2,
        dir: FixedVec2,
        reach: Fixed,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: i64,

    /// Processing priority
    pub priority: EventPriority,

    /// Actor involved (for tie-breaking)
    pub actor: Option<ActorId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event; priority and actor follow from the data.
    pub fn new(tick: i64, data: GameEventData) -> Self {
        let (priority, actor) = match &data {
            GameEventData::Kill { victim, .. } => (EventPriority::Kill, Some(*victim)),
            GameEventData::RaceFinished { actor, .. } => (EventPriority::RaceFinished, Some(*actor)),
            GameEventData::SpawnProjectile { owner, .. } | GameEventData::SpawnLaser { owner, .. } => {
                (EventPriority::Spawn, Some(*owner))
            }
            GameEventData::DeathEffect { actor, .. } => (EventPriority::Effect, Some(*actor)),
            GameEventData::Sound { .. } | GameEventData::DamageIndicator { .. } | GameEventData::HammerHit { .. } => {
                (EventPriority::Effect, None)
            }
            GameEventData::Notice { actor, .. } => (EventPriority::Notice, Some(*actor)),
            GameEventData::TuningResync { actor, .. } | GameEventData::ZoneMessage { actor, .. } => {
                (EventPriority::Other, Some(*actor))
            }
        };

        Self { tick, priority, actor, data }
    }

    /// Create a sound event.
    pub fn sound(tick: i64, kind: SoundKind, pos: FixedVec2, mask: u64) -> Self {
        Self::new(tick, GameEventData::Sound { kind, pos, mask })
    }

    /// Create a notice event.
    pub fn notice(tick: i64, actor: ActorId, text: impl Into<String>) -> Self {
        Self::new(tick, GameEventData::Notice { actor, text: text.into() })
    }

    /// Create a kill event.
    pub fn kill(tick: i64, victim: ActorId, killer: ActorId, weapon: Option<Weapon>) -> Self {
        Self::new(tick, GameEventData::Kill { victim, killer, weapon })
    }

    /// Whether an observer sees this event. Events without a mask are global.
    pub fn visible_to(&self, observer: ActorId) -> bool {
        match &self.data {
            GameEventData::Sound { mask, .. }
            | GameEventData::DamageIndicator { mask, .. }
            | GameEventData::HammerHit { mask, .. }
            | GameEventData::DeathEffect { mask, .. } => mask & observer.bit() != 0,
            GameEventData::Notice { actor, .. }
            | GameEventData::TuningResync { actor, .. }
            | GameEventData::ZoneMessage { actor, .. } => *actor == observer,
            _ => true,
        }
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
            && self.priority == other.priority
            && self.actor == other.actor
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
        // Sort by: tick, then priority, then actor
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then(self.actor.cmp(&other.actor))
    }
}

/// Events of the current tick in emission order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    #[inline]
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queued events, unsorted.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Take all events in processing order. Equal keys keep emission order.
    pub fn drain_sorted(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.sort();
        events
    }
}
