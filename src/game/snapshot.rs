//! Per-Observer Snapshots
//!
//! What one observer receives about every visible actor each tick. Between
//! resyncs the broadcast core and its reference tick are sent, so receivers
//! can extrapolate on their own; on a world pause the live core goes out
//! with tick 0.

use serde::{Serialize, Deserialize};

use crate::game::actor::{Actor, DISABLE_HIT_GRENADE, DISABLE_HIT_HAMMER, DISABLE_HIT_LASER, DISABLE_HIT_SHOTGUN};
use crate::game::movement::{ActorId, NetCore};
use crate::game::weapon::Weapon;
use crate::game::world::GameWorld;

pub const CHARACTER_FLAG_SOLO: u32 = 1 << 0;
pub const CHARACTER_FLAG_SUPER: u32 = 1 << 1;
pub const CHARACTER_FLAG_ENDLESS_HOOK: u32 = 1 << 2;
pub const CHARACTER_FLAG_NO_COLLISION: u32 = 1 << 3;
pub const CHARACTER_FLAG_NO_HOOK: u32 = 1 << 4;
pub const CHARACTER_FLAG_ENDLESS_JUMP: u32 = 1 << 5;
pub const CHARACTER_FLAG_JETPACK: u32 = 1 << 6;
pub const CHARACTER_FLAG_NO_GRENADE_HIT: u32 = 1 << 7;
pub const CHARACTER_FLAG_NO_HAMMER_HIT: u32 = 1 << 8;
pub const CHARACTER_FLAG_NO_LASER_HIT: u32 = 1 << 9;
pub const CHARACTER_FLAG_NO_SHOTGUN_HIT: u32 = 1 << 10;
pub const CHARACTER_FLAG_TELEGUN_GUN: u32 = 1 << 11;
pub const CHARACTER_FLAG_TELEGUN_GRENADE: u32 = 1 << 12;
pub const CHARACTER_FLAG_TELEGUN_LASER: u32 = 1 << 13;
/// Owned weapons start here, one bit per slot in weapon order.
pub const CHARACTER_FLAG_WEAPON_SHIFT: u32 = 14;

/// Which other actors an observer wants to see.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowOthers {
    /// Only actors the observer can interact with.
    #[default]
    Off,
    All,
    /// Interactable actors plus the observer's own team.
    OwnTeam,
}

/// One actor as seen by one observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub id: ActorId,
    /// Reference tick of `core`, 0 when `core` is the live state.
    pub tick: i64,
    pub core: NetCore,
    pub weapon: Weapon,
    pub ammo: i32,
    pub health: i32,
    pub armor: i32,
    pub attack_tick: i64,
    pub flags: u32,
    /// Tick the freeze ends, -1 for deep or open-ended freezes, 0 when thawed.
    pub freeze_end: i64,
    pub jumps: i32,
    pub tele_checkpoint: u8,
    /// Switch status of the actor's team, 32 switches per word.
    pub switches: [u32; 8],
    /// Decorative body position, only for the observer's own actor.
    pub body: Option<(f32, f32)>,
}

impl CharacterSnapshot {
    #[inline]
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Whether the snapshot lists a weapon as owned.
    pub fn owns(&self, weapon: Weapon) -> bool {
        self.has_flag(1 << (CHARACTER_FLAG_WEAPON_SHIFT + weapon.index() as u32))
    }
}

/// Everything one observer receives for a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverSnapshot {
    pub tick: i64,
    pub observer: Option<ActorId>,
    pub characters: Vec<CharacterSnapshot>,
}

impl ObserverSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Snapshot of one actor, if visible.
    pub fn character(&self, id: ActorId) -> Option<&CharacterSnapshot> {
        self.characters.iter().find(|c| c.id == id)
    }
}

fn character_flags(world: &GameWorld, actor: &Actor) -> u32 {
    let flags = &actor.core.flags;
    let tuning = world.tuning_for(actor.tune_zone);
    let mut bits = 0;
    let mut set = |on: bool, bit: u32| {
        if on {
            bits |= bit;
        }
    };
    set(flags.solo, CHARACTER_FLAG_SOLO);
    set(flags.is_super, CHARACTER_FLAG_SUPER);
    set(flags.endless_hook, CHARACTER_FLAG_ENDLESS_HOOK);
    set(!flags.collision || !tuning.player_collision, CHARACTER_FLAG_NO_COLLISION);
    set(!flags.hook_hit || !tuning.player_hooking, CHARACTER_FLAG_NO_HOOK);
    set(actor.super_jump, CHARACTER_FLAG_ENDLESS_JUMP);
    set(flags.jetpack, CHARACTER_FLAG_JETPACK);
    set(actor.hit_disabled & DISABLE_HIT_GRENADE != 0, CHARACTER_FLAG_NO_GRENADE_HIT);
    set(actor.hit_disabled & DISABLE_HIT_HAMMER != 0, CHARACTER_FLAG_NO_HAMMER_HIT);
    set(actor.hit_disabled & DISABLE_HIT_LASER != 0, CHARACTER_FLAG_NO_LASER_HIT);
    set(actor.hit_disabled & DISABLE_HIT_SHOTGUN != 0, CHARACTER_FLAG_NO_SHOTGUN_HIT);
    set(flags.telegun_gun, CHARACTER_FLAG_TELEGUN_GUN);
    set(flags.telegun_grenade, CHARACTER_FLAG_TELEGUN_GRENADE);
    set(flags.telegun_laser, CHARACTER_FLAG_TELEGUN_LASER);
    for weapon in Weapon::ALL {
        let owned = if weapon == Weapon::Ninja {
            actor.active_weapon() == Weapon::Ninja
        } else {
            actor.inventory.has(weapon)
        };
        set(owned, 1 << (CHARACTER_FLAG_WEAPON_SHIFT + weapon.index() as u32));
    }
    bits
}

/// Snapshot of `actor` for `observer` (`None` for recorders, which see everything).
pub fn snap_character(world: &GameWorld, actor: &Actor, observer: Option<ActorId>) -> CharacterSnapshot {
    let (tick, core) = if actor.reckoning.tick == 0 || world.paused {
        (0, actor.core.net())
    } else {
        (actor.reckoning.tick, actor.reckoning.send_core.net())
    };

    let frozen = actor.deep_freeze || actor.is_frozen();
    let mut weapon = if frozen { Weapon::Ninja } else { actor.active_weapon() };
    let mut ammo = 0;

    let ninja_jetpack = world.config.ninja_jetpack
        && actor.core.flags.jetpack
        && actor.active_weapon() == Weapon::Gun
        && !frozen
        && !actor.core.flags.telegun_gun;
    if ninja_jetpack {
        weapon = Weapon::Ninja;
        ammo = 10;
    }

    let own = observer.map_or(true, |o| o == actor.id());
    let (mut health, mut armor) = (0, 0);
    if own {
        health = actor.health;
        armor = actor.armor;
        let slot_ammo = actor.inventory.slot(actor.active_weapon()).ammo;
        if slot_ammo > 0 {
            ammo = if actor.freeze_time == 0 { slot_ammo } else { 0 };
        }
    }

    let freeze_end = if actor.deep_freeze || actor.freeze_time == -1 {
        -1
    } else if actor.freeze_time == 0 {
        0
    } else {
        world.tick + actor.freeze_time as i64
    };

    let body = if observer == Some(actor.id()) { world.overlay_position(actor.id()) } else { None };

    CharacterSnapshot {
        id: actor.id(),
        tick,
        core,
        weapon,
        ammo,
        health,
        armor,
        attack_tick: actor.attack_tick,
        flags: character_flags(world, actor),
        freeze_end,
        jumps: actor.core.jumps,
        tele_checkpoint: actor.tele_checkpoint,
        switches: world.switches.status_words(world.teams.team(actor.id())),
        body,
    }
}

/// Whether `observer` gets to see `actor` at all.
pub fn is_visible(world: &GameWorld, actor: &Actor, observer: Option<ActorId>, show: ShowOthers) -> bool {
    if actor.paused {
        return false;
    }
    let Some(observer) = observer else {
        return true;
    };
    let observer_super = world.actor(observer).is_some_and(Actor::is_super);
    if observer_super || world.teams.can_collide(actor.id(), observer) {
        return true;
    }
    match show {
        ShowOthers::Off => false,
        ShowOthers::All => true,
        ShowOthers::OwnTeam => world.teams.same_team(actor.id(), observer),
    }
}

/// Snapshot of every visible actor for one observer.
pub fn snapshot_for(world: &GameWorld, observer: Option<ActorId>, show: ShowOthers) -> ObserverSnapshot {
    let characters = world
        .actors()
        .filter(|actor| is_visible(world, actor, observer, show))
        .map(|actor| snap_character(world, actor, observer))
        .collect();
    ObserverSnapshot { tick: world.tick, observer, characters }
}
