//! Rescue Snapshots
//!
//! A `SaveState` holds everything needed to put an actor back where it last
//! stood safely. Input, reckoning and the snapshot itself are not part of it.

use serde::{Serialize, Deserialize};

use crate::game::actor::{Actor, NinjaState, RaceState, NUM_CHECKPOINTS};
use crate::game::movement::{ActorCore, HookState};
use crate::game::weapon::{Inventory, Weapon};

/// Restorable part of an actor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub core: ActorCore,
    pub armor: i32,
    pub inventory: Inventory,
    pub last_weapon: Weapon,
    pub freeze_time: i32,
    pub deep_freeze: bool,
    pub super_jump: bool,
    pub freeze_hammer: bool,
    pub hit_disabled: u8,
    pub ninja: NinjaState,
    pub race: RaceState,
    pub start_tick: i64,
    pub cp_active: Option<u8>,
    pub cp_times: [i64; NUM_CHECKPOINTS],
    pub tele_checkpoint: u8,
    pub tune_zone: u8,
}

impl SaveState {
    /// Capture an actor.
    pub fn capture(actor: &Actor) -> Self {
        Self {
            core: actor.core.clone(),
            armor: actor.armor,
            inventory: actor.inventory,
            last_weapon: actor.last_weapon,
            freeze_time: actor.freeze_time,
            deep_freeze: actor.deep_freeze,
            super_jump: actor.super_jump,
            freeze_hammer: actor.freeze_hammer,
            hit_disabled: actor.hit_disabled,
            ninja: actor.ninja.clone(),
            race: actor.race,
            start_tick: actor.start_tick,
            cp_active: actor.cp_active,
            cp_times: actor.cp_times,
            tele_checkpoint: actor.tele_checkpoint,
            tune_zone: actor.tune_zone,
        }
    }

    /// Write the snapshot back.
    pub fn restore(&self, actor: &mut Actor) {
        actor.core = self.core.clone();
        actor.armor = self.armor;
        actor.inventory = self.inventory;
        actor.last_weapon = self.last_weapon;
        actor.queued_weapon = None;
        actor.freeze_time = self.freeze_time;
        actor.deep_freeze = self.deep_freeze;
        actor.super_jump = self.super_jump;
        actor.freeze_hammer = self.freeze_hammer;
        actor.hit_disabled = self.hit_disabled;
        actor.ninja = self.ninja.clone();
        actor.race = self.race;
        actor.start_tick = self.start_tick;
        actor.cp_active = self.cp_active;
        actor.cp_times = self.cp_times;
        actor.tele_checkpoint = self.tele_checkpoint;
        actor.tune_zone = self.tune_zone;
        actor.prev_pos = self.core.pos;
        actor.sync_hit_flags();
    }

    /// Restore for a rescue: the race clock and checkpoint progress are
    /// kept, motion and held buttons are dropped.
    pub fn restore_for_rescue(&self, actor: &mut Actor) {
        let start_tick = actor.start_tick;
        let race = actor.race;
        let cp_active = actor.cp_active;
        let cp_times = actor.cp_times;
        self.restore(actor);
        actor.start_tick = start_tick;
        actor.race = race;
        actor.cp_active = cp_active;
        actor.cp_times = cp_times;

        let core = &mut actor.core;
        core.vel = Default::default();
        core.hook = HookState::Idle;
        core.hook_pos = core.pos;
        core.hook_tick = 0;
        core.reset = true;
        core.input.direction = 0;
        core.input.jump = false;
        core.input.hook = false;
        core.input.fire = false;
        actor.input = core.input;
        actor.saved_input.direction = 0;
        actor.saved_input.jump = false;
        actor.saved_input.hook = false;
        actor.saved_input.fire = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::FixedVec2;
    use crate::game::config::GameConfig;
    use crate::game::input::PlayerInput;
    use crate::game::movement::ActorId;

    fn actor_at(x: i32, y: i32) -> Actor {
        Actor::new(ActorId(2), FixedVec2::from_ints(x, y), &GameConfig::default(), 100)
    }

    #[test]
    fn test_restore_brings_back_position_and_checkpoint() {
        let mut actor = actor_at(64, 64);
        actor.cp_active = Some(3);
        let save = SaveState::capture(&actor);

        actor.core.pos = FixedVec2::from_ints(500, 500);
        actor.cp_active = Some(7);
        save.restore(&mut actor);

        assert_eq!(actor.pos(), FixedVec2::from_ints(64, 64));
        assert_eq!(actor.cp_active, Some(3));
        assert_eq!(actor.prev_pos, actor.pos());
    }

    #[test]
    fn test_rescue_keeps_clock_and_drops_motion() {
        let mut actor = actor_at(64, 64);
        actor.race = RaceState::Started;
        actor.start_tick = 10;
        let save = SaveState::capture(&actor);

        actor.start_tick = 40;
        actor.core.vel = FixedVec2::from_ints(3, -7);
        actor.saved_input = PlayerInput { fire: true, jump: true, ..PlayerInput::walking(1) };
        actor.core.input = actor.saved_input;
        save.restore_for_rescue(&mut actor);

        assert_eq!(actor.start_tick, 40);
        assert_eq!(actor.core.vel, FixedVec2::ZERO);
        assert_eq!(actor.core.hook, HookState::Idle);
        assert_eq!(actor.saved_input.direction, 0);
        assert!(!actor.saved_input.fire);
        assert!(!actor.core.input.jump);
        assert!(actor.core.reset);
    }

    #[test]
    fn test_rescue_keeps_checkpoint_progress() {
        let mut actor = actor_at(64, 64);
        actor.race = RaceState::Started;
        actor.cp_active = Some(1);
        actor.cp_times[1] = 20;
        let save = SaveState::capture(&actor);

        // Checkpoint crossed in the air after the last save
        actor.cp_active = Some(4);
        actor.cp_times[4] = 75;
        save.restore_for_rescue(&mut actor);

        assert_eq!(actor.pos(), FixedVec2::from_ints(64, 64));
        assert_eq!(actor.cp_active, Some(4));
        assert_eq!(actor.cp_times[1], 20);
        assert_eq!(actor.cp_times[4], 75);
    }
}
