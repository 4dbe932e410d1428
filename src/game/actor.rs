//! Actor State
//!
//! Everything the server keeps about a live actor on top of its movement
//! core: freeze state, inventory, race progress, tile latches, rescue
//! snapshot and the dead-reckoning record. Methods here touch only the actor
//! itself; anything that needs the rest of the world lives in the world-level
//! passes (`tiles`, `ability`, `lifecycle`, `tick`).

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;
use crate::game::config::GameConfig;
use crate::game::input::PlayerInput;
use crate::game::movement::{ActorCore, ActorId};
use crate::game::reckoning::ReckoningState;
use crate::game::save::SaveState;
use crate::game::weapon::{Inventory, Weapon};

/// Number of race checkpoints tracked per run.
pub const NUM_CHECKPOINTS: usize = 25;

/// Per-weapon hit switches. A set bit means hits with that weapon are off.
pub const DISABLE_HIT_HAMMER: u8 = 1 << 0;
pub const DISABLE_HIT_SHOTGUN: u8 = 1 << 1;
pub const DISABLE_HIT_GRENADE: u8 = 1 << 2;
pub const DISABLE_HIT_LASER: u8 = 1 << 3;
pub const DISABLE_HIT_ALL: u8 = DISABLE_HIT_HAMMER | DISABLE_HIT_SHOTGUN | DISABLE_HIT_GRENADE | DISABLE_HIT_LASER;

/// Client-side prediction overrides, sent alongside zone tuning.
pub const FAKETUNE_FREEZE: u8 = 1 << 0;
pub const FAKETUNE_SOLO: u8 = 1 << 1;
pub const FAKETUNE_NOJUMP: u8 = 1 << 2;
pub const FAKETUNE_NOCOLL: u8 = 1 << 3;
pub const FAKETUNE_NOHOOK: u8 = 1 << 4;
pub const FAKETUNE_JETPACK: u8 = 1 << 5;
pub const FAKETUNE_NOHAMMER: u8 = 1 << 6;

/// Progress of a timed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceState {
    #[default]
    None,
    Started,
    Finished,
}

/// Re-entry latches for tiles that fire once per continuous occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLatch {
    pub time_penalty: bool,
    pub time_bonus: bool,
    pub refill_jumps: bool,
}

/// Dash ability state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaState {
    pub activation_tick: i64,
    pub activation_dir: FixedVec2,
    /// Dash ticks left, 0 when not dashing.
    pub current_move_time: i32,
    /// Speed before the dash started; restored when it ends.
    pub old_vel_amount: Fixed,
    /// Actors already hit by the current dash.
    pub hit: Vec<ActorId>,
}

/// Teleport requested by a teleport projectile, applied after tile rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegunRequest {
    pub pos: FixedVec2,
    pub keep_velocity: bool,
}

/// Cosmetic hammer swing offset for the body overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HammerSwing {
    pub tick: i32,
    pub add: i32,
    pub dir: FixedVec2,
}

impl HammerSwing {
    /// Start a swing towards `dir`.
    pub fn start(&mut self, dir: FixedVec2) {
        *self = Self { tick: 0, add: 10, dir };
    }

    /// Out 10 units a tick up to 60, back 20 a tick, then rest.
    pub fn advance(&mut self) {
        if self.add == 0 {
            return;
        }
        self.tick += self.add;
        if self.tick >= 60 {
            self.add = -20;
        } else if self.tick <= 0 {
            self.tick = 0;
            self.add = 0;
        }
    }

    /// Offset of the swung hammer from the body.
    pub fn offset(&self) -> FixedVec2 {
        self.dir.scale_int(self.tick)
    }
}

/// A live actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Actor {
    pub core: ActorCore,
    /// Position before this tick's move.
    pub prev_pos: FixedVec2,
    pub paused: bool,
    pub spawn_tick: i64,

    pub health: i32,
    pub armor: i32,
    pub inventory: Inventory,
    pub last_weapon: Weapon,
    pub queued_weapon: Option<Weapon>,
    pub reload_timer: i32,
    pub attack_tick: i64,
    pub damage_tick: i64,
    pub pain_sound_timer: i32,
    pub hammer_swing: HammerSwing,
    pub ninja: NinjaState,

    /// Remaining freeze ticks, -1 for an open-ended freeze.
    pub freeze_time: i32,
    pub freeze_start: Option<i64>,
    pub deep_freeze: bool,
    /// Thawed during this tick.
    pub frozen_last_tick: bool,

    pub super_jump: bool,
    pub freeze_hammer: bool,
    pub hit_disabled: u8,
    pub faketuning: u8,

    pub race: RaceState,
    pub start_tick: i64,
    /// Highest checkpoint reached this run.
    pub cp_active: Option<u8>,
    pub cp_times: [i64; NUM_CHECKPOINTS],
    pub tele_checkpoint: u8,
    pub latch: TileLatch,
    pub last_start_warning: Option<i64>,
    pub telegun: Option<TelegunRequest>,

    pub tune_zone: u8,
    pub tune_zone_old: Option<u8>,

    pub rescue: Option<Box<SaveState>>,
    pub last_rescue: Option<i64>,
    pub team_before_super: u8,

    /// Input applied this tick after freeze masking.
    pub input: PlayerInput,
    /// Latest input received from the user.
    pub saved_input: PlayerInput,
    /// Input seen by the previous weapon pass, for edge detection.
    pub prev_input: PlayerInput,
    pub num_inputs: u32,
    pub last_action: i64,
    pub last_move: i64,

    pub reckoning: ReckoningState,
}

impl Actor {
    /// Fresh actor at a position.
    pub fn new(id: ActorId, pos: FixedVec2, config: &GameConfig, now: i64) -> Self {
        let mut core = ActorCore::new(id, pos);
        core.flags.endless_hook = config.endless_drag;
        let hit_disabled = if config.hit { 0 } else { DISABLE_HIT_ALL };

        let mut actor = Self {
            core,
            prev_pos: pos,
            paused: false,
            spawn_tick: now,
            health: 10,
            armor: 0,
            inventory: Inventory::spawn(),
            last_weapon: Weapon::Hammer,
            queued_weapon: None,
            reload_timer: 0,
            attack_tick: 0,
            damage_tick: 0,
            pain_sound_timer: 0,
            hammer_swing: HammerSwing::default(),
            ninja: NinjaState::default(),
            freeze_time: 0,
            freeze_start: None,
            deep_freeze: false,
            frozen_last_tick: false,
            super_jump: false,
            freeze_hammer: false,
            hit_disabled,
            faketuning: 0,
            race: RaceState::None,
            start_tick: 0,
            cp_active: None,
            cp_times: [0; NUM_CHECKPOINTS],
            tele_checkpoint: 0,
            latch: TileLatch::default(),
            last_start_warning: None,
            telegun: None,
            tune_zone: 0,
            tune_zone_old: None,
            rescue: None,
            last_rescue: None,
            team_before_super: 0,
            input: PlayerInput::idle(),
            saved_input: PlayerInput::idle(),
            prev_input: PlayerInput::idle(),
            num_inputs: 0,
            last_action: now,
            last_move: now,
            reckoning: ReckoningState::new(id),
        };
        actor.sync_hit_flags();
        actor
    }

    #[inline]
    pub fn id(&self) -> ActorId {
        self.core.id
    }

    #[inline]
    pub fn pos(&self) -> FixedVec2 {
        self.core.pos
    }

    #[inline]
    pub fn active_weapon(&self) -> Weapon {
        self.core.active_weapon
    }

    #[inline]
    pub fn is_super(&self) -> bool {
        self.core.flags.is_super
    }

    /// Frozen, either timed or open-ended.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.freeze_time != 0
    }

    /// Store input from the user. Applied on the next tick.
    pub fn on_input(&mut self, input: PlayerInput, now: i64) {
        let input = input.sanitized();
        if input != self.saved_input {
            self.last_action = now;
        }
        self.saved_input = input;
        self.num_inputs = self.num_inputs.saturating_add(1);
    }

    /// Freeze for `seconds`; `-1` freezes until explicitly thawed.
    ///
    /// Refused for super actors, for a shorter freeze than the one running
    /// and within a second of the previous freeze.
    pub fn freeze(&mut self, seconds: i32, now: i64) -> bool {
        let ticks = seconds.saturating_mul(crate::TICK_SPEED as i32);
        if (seconds <= 0 || self.is_super() || self.freeze_time == -1 || self.freeze_time > ticks) && seconds != -1 {
            return false;
        }
        let cooled_down = self
            .freeze_start
            .map_or(true, |start| start < now - crate::TICK_SPEED as i64);
        if !cooled_down && seconds != -1 {
            return false;
        }
        self.armor = 0;
        self.freeze_time = if seconds == -1 { -1 } else { ticks };
        self.freeze_start = Some(now);
        if self.active_weapon() != Weapon::Ninja {
            self.force_weapon(Weapon::Gun);
        }
        true
    }

    /// Thaw. Grants the one-tick fire grace.
    pub fn unfreeze(&mut self) -> bool {
        if self.freeze_time == 0 {
            return false;
        }
        self.armor = 10;
        if !self.inventory.has(self.active_weapon()) {
            self.core.active_weapon = Weapon::Gun;
        }
        self.freeze_time = 0;
        self.freeze_start = None;
        self.frozen_last_tick = true;
        true
    }

    /// Switch to an owned weapon. Returns false when already active.
    pub fn set_weapon(&mut self, weapon: Weapon) -> bool {
        if weapon == self.active_weapon() {
            return false;
        }
        self.force_weapon(weapon);
        true
    }

    fn force_weapon(&mut self, weapon: Weapon) {
        if weapon != self.active_weapon() {
            self.last_weapon = self.active_weapon();
        }
        self.queued_weapon = None;
        self.core.active_weapon = weapon;
    }

    /// Give a weapon. Returns true if it was not owned before.
    ///
    /// Ninja is timed and goes through `give_ninja`.
    pub fn give_weapon(&mut self, weapon: Weapon, ammo: i32) -> bool {
        if weapon == Weapon::Ninja {
            return false;
        }
        let fresh = !self.inventory.has(weapon);
        self.inventory.give(weapon, ammo);
        fresh
    }

    /// Activate the dash ability.
    pub fn give_ninja(&mut self, now: i64) {
        self.ninja.activation_tick = now;
        self.inventory.give(Weapon::Ninja, -1);
        if self.active_weapon() != Weapon::Ninja {
            self.last_weapon = self.active_weapon();
        }
        self.core.active_weapon = Weapon::Ninja;
    }

    /// End the dash ability and go back to the previous weapon.
    pub fn remove_ninja(&mut self) {
        self.ninja.current_move_time = 0;
        self.inventory.remove(Weapon::Ninja);
        let back = if self.inventory.has(self.last_weapon) { self.last_weapon } else { Weapon::Gun };
        self.core.active_weapon = back;
    }

    /// Drop shotgun, grenade and laser; fall back to the gun if needed.
    pub fn reset_pickups(&mut self) {
        self.inventory.strip_pickups();
        if !self.inventory.has(self.active_weapon()) {
            self.core.active_weapon = Weapon::Gun;
        }
        if !self.inventory.has(self.last_weapon) {
            self.last_weapon = Weapon::Hammer;
        }
        self.queued_weapon = None;
    }

    /// Mirror the hit switches into the movement core.
    pub fn sync_hit_flags(&mut self) {
        let flags = &mut self.core.flags;
        flags.no_hammer_hit = self.hit_disabled & DISABLE_HIT_HAMMER != 0;
        flags.no_shotgun_hit = self.hit_disabled & DISABLE_HIT_SHOTGUN != 0;
        flags.no_grenade_hit = self.hit_disabled & DISABLE_HIT_GRENADE != 0;
        flags.no_laser_hit = self.hit_disabled & DISABLE_HIT_LASER != 0;
    }

    /// Faketuning bits derived from the current state.
    pub fn derived_faketuning(&self) -> u8 {
        let flags = &self.core.flags;
        let mut bits = 0;
        if self.is_frozen() || self.deep_freeze {
            bits |= FAKETUNE_FREEZE;
        }
        if flags.solo {
            bits |= FAKETUNE_SOLO;
        }
        if self.core.jumps == 0 && !self.super_jump {
            bits |= FAKETUNE_NOJUMP;
        }
        if !flags.collision {
            bits |= FAKETUNE_NOCOLL;
        }
        if !flags.hook_hit {
            bits |= FAKETUNE_NOHOOK;
        }
        if flags.jetpack {
            bits |= FAKETUNE_JETPACK;
        }
        if self.hit_disabled & DISABLE_HIT_HAMMER != 0 {
            bits |= FAKETUNE_NOHAMMER;
        }
        bits
    }

    /// Shift tick-stamped timers while paused so they resume where they were.
    pub fn tick_paused(&mut self) {
        self.attack_tick += 1;
        self.damage_tick += 1;
        self.ninja.activation_tick += 1;
        self.last_action += 1;
        if self.reckoning.tick != 0 {
            self.reckoning.tick += 1;
        }
        for weapon in Weapon::ALL {
            let slot = self.inventory.slot_mut(weapon);
            if slot.regen_start > -1 {
                slot.regen_start += 1;
            }
        }
    }

    /// Feed the actor into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        self.core.hash_into(hasher);
        hasher.update_bool(self.paused);
        hasher.update_i32(self.armor);
        hasher.update_i32(self.freeze_time);
        hasher.update_bool(self.deep_freeze);
        hasher.update_i32(self.reload_timer);
        for weapon in Weapon::ALL {
            let slot = self.inventory.slot(weapon);
            hasher.update_bool(slot.got);
            hasher.update_i32(slot.ammo);
        }
        hasher.update_u8(self.race as u8);
        hasher.update_i64(self.start_tick);
        hasher.update_i32(self.cp_active.map_or(-1, i32::from));
        hasher.update_u8(self.tele_checkpoint);
        hasher.update_u8(self.hit_disabled);
        hasher.update_i32(self.ninja.current_move_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn actor() -> Actor {
        Actor::new(ActorId(0), FixedVec2::from_ints(100, 100), &GameConfig::default(), 1000)
    }

    #[test]
    fn test_freeze_forces_gun_and_zero_armor() {
        let mut actor = actor();
        actor.core.active_weapon = Weapon::Hammer;
        actor.armor = 10;

        assert!(actor.freeze(3, 1000));
        assert_eq!(actor.freeze_time, 150);
        assert_eq!(actor.armor, 0);
        assert_eq!(actor.active_weapon(), Weapon::Gun);
    }

    #[test]
    fn test_freeze_refusals() {
        let mut actor = actor();
        assert!(!actor.freeze(0, 1000));

        assert!(actor.freeze(3, 1000));
        // Shorter freeze than the one running
        assert!(!actor.freeze(1, 1100));
        // Within a second of the previous freeze
        assert!(!actor.freeze(5, 1020));
        assert!(actor.freeze(5, 1100));

        let mut hero = self::actor();
        hero.core.flags.is_super = true;
        assert!(!hero.freeze(3, 1000));
    }

    #[test]
    fn test_open_ended_freeze() {
        let mut actor = actor();
        assert!(actor.freeze(-1, 1000));
        assert_eq!(actor.freeze_time, -1);
        assert_eq!(actor.armor, 0);
        assert!(!actor.freeze(10, 2000));

        assert!(actor.unfreeze());
        assert_eq!(actor.freeze_time, 0);
        assert_eq!(actor.armor, 10);
        assert!(actor.frozen_last_tick);
    }

    #[test]
    fn test_unfreeze_when_not_frozen() {
        let mut actor = actor();
        assert!(!actor.unfreeze());
        assert!(!actor.frozen_last_tick);
    }

    #[test]
    fn test_ninja_round_trip() {
        let mut actor = actor();
        actor.core.active_weapon = Weapon::Hammer;
        actor.give_ninja(1000);
        assert_eq!(actor.active_weapon(), Weapon::Ninja);
        assert_eq!(actor.last_weapon, Weapon::Hammer);

        actor.remove_ninja();
        assert_eq!(actor.active_weapon(), Weapon::Hammer);
        assert!(!actor.inventory.has(Weapon::Ninja));
    }

    #[test]
    fn test_reset_pickups_falls_back_to_gun() {
        let mut actor = actor();
        actor.give_weapon(Weapon::Laser, 10);
        assert!(actor.set_weapon(Weapon::Laser));
        actor.reset_pickups();
        assert_eq!(actor.active_weapon(), Weapon::Gun);
        assert!(!actor.inventory.has(Weapon::Laser));
    }

    #[test]
    fn test_hit_flags_mirror_core() {
        let mut config = GameConfig::default();
        config.hit = false;
        let actor = Actor::new(ActorId(1), FixedVec2::ZERO, &config, 0);
        assert!(actor.core.flags.no_hammer_hit);
        assert!(actor.core.flags.no_laser_hit);
        assert_ne!(actor.derived_faketuning() & FAKETUNE_NOHAMMER, 0);
    }

    #[test]
    fn test_hammer_swing_cycle() {
        let mut swing = HammerSwing::default();
        swing.start(FixedVec2::RIGHT);
        let mut ticks = Vec::new();
        for _ in 0..12 {
            swing.advance();
            ticks.push(swing.tick);
        }
        assert_eq!(&ticks[..9], &[10, 20, 30, 40, 50, 60, 40, 20, 0]);
        assert_eq!(swing.add, 0);
        assert_eq!(swing.offset(), FixedVec2::ZERO);
    }

    #[test]
    fn test_tick_paused_shifts_timers() {
        let mut actor = actor();
        actor.attack_tick = 500;
        actor.inventory.slot_mut(Weapon::Gun).regen_start = 900;
        actor.tick_paused();
        assert_eq!(actor.attack_tick, 501);
        assert_eq!(actor.inventory.slot(Weapon::Gun).regen_start, 901);
        assert_eq!(actor.inventory.slot(Weapon::Hammer).regen_start, -1);
    }

    proptest! {
        #[test]
        fn prop_armor_zero_while_open_frozen(seconds in 1i32..20, later in 0i64..500) {
            let mut actor = actor();
            actor.freeze(-1, 1000);
            // Nothing shorter overrides an open-ended freeze
            prop_assert!(!actor.freeze(seconds, 1000 + later));
            prop_assert_eq!(actor.freeze_time, -1);
            prop_assert_eq!(actor.armor, 0);
        }

        #[test]
        fn prop_freeze_time_never_below_open_marker(seconds in -3i32..20, now in 0i64..10_000) {
            let mut actor = actor();
            actor.freeze(seconds, now);
            prop_assert!(actor.freeze_time >= -1);
        }
    }
}
