//! Weapons and the Dash Ability
//!
//! Fire-rate gating, weapon switching, the ninja dash and the jetpack. The
//! world-facing results (projectiles, lasers, sounds) are queued as events;
//! melee hits and dash hits are applied to the other actors directly.

use crate::core::fixed::{from_int, to_fixed, Fixed};
use crate::core::vec2::FixedVec2;
use crate::game::actor::{Actor, DISABLE_HIT_HAMMER};
use crate::game::collision::clamp_vel;
use crate::game::events::{GameEventData, SoundKind};
use crate::game::input::PlayerInput;
use crate::game::movement::{ActorId, PHYS_SIZE};
use crate::game::weapon::{
    Weapon, AMMO_REGEN_MS, MAX_AMMO, NINJA_DURATION_MS, NINJA_MAX_HITS, NINJA_MOVETIME_TICKS, NINJA_VELOCITY,
    NUM_WEAPONS,
};
use crate::game::world::GameWorld;

/// Projectiles leave the body this far along the aim.
const PROJ_START_OFFSET: i32 = 21;

/// Half the body size.
const PROXIMITY_HALF: i32 = 14;

/// Ninja activation length in ticks.
const NINJA_DURATION_TICKS: i64 = NINJA_DURATION_MS as i64 * crate::TICK_SPEED as i64 / 1000;

/// Normalized aim of an input, straight down when null.
pub fn fire_direction(input: &PlayerInput) -> FixedVec2 {
    let dir = FixedVec2::from_ints(input.target_x, input.target_y).normalize();
    if dir.is_zero() {
        FixedVec2::DOWN
    } else {
        dir
    }
}

/// Push an actor, respecting its movement restrictions.
pub(crate) fn apply_force(actor: &mut Actor, force: FixedVec2, now: i64) {
    actor.core.vel = clamp_vel(actor.core.restrictions, actor.core.vel + force);
    actor.damage_tick = now;
}

fn within(a: FixedVec2, b: FixedVec2, radius: Fixed) -> bool {
    a.distance_squared_wide(b) < (radius as i64 * radius as i64) as u64
}

fn seconds_to_ticks(seconds: Fixed) -> i32 {
    ((seconds as i64 * crate::TICK_SPEED as i64) >> 16) as i32
}

/// Fire the active weapon of an actor now.
///
/// Returns false for unknown actors and whenever nothing was fired.
pub fn try_fire(world: &mut GameWorld, id: ActorId) -> bool {
    let Some(mut actor) = world.take_actor(id) else {
        return false;
    };
    let fired = fire_weapon(world, &mut actor);
    world.put_actor(actor);
    fired
}

/// The per-tick weapon pass.
pub(crate) fn handle_weapons(world: &mut GameWorld, actor: &mut Actor) {
    handle_ninja(world, actor);
    handle_jetpack(world, actor);

    if actor.pain_sound_timer > 0 {
        actor.pain_sound_timer -= 1;
    }

    if actor.reload_timer > 0 {
        actor.reload_timer -= 1;
        return;
    }

    handle_weapon_switch(world, actor);
    fire_weapon(world, actor);
    regen_ammo(world.tick, actor);
}

fn will_fire(actor: &Actor, full_auto: bool) -> bool {
    let ammo = actor.inventory.slot(actor.active_weapon()).ammo;
    actor.input.fire_pressed(&actor.prev_input) || (full_auto && actor.input.fire && ammo != 0)
}

pub(crate) fn fire_weapon(world: &mut GameWorld, actor: &mut Actor) -> bool {
    if actor.reload_timer != 0 {
        return false;
    }

    do_weapon_switch(world, actor);
    let weapon = actor.active_weapon();
    let id = actor.id();
    let now = world.tick;
    let dir = fire_direction(&actor.input);

    let full_auto = weapon.is_full_auto()
        || (actor.core.flags.jetpack && weapon == Weapon::Gun)
        || (actor.frozen_last_tick && world.config.unfreeze_fire_grace);

    if !world.config.deepfly && weapon == Weapon::Hammer && actor.deep_freeze {
        return false;
    }

    if !will_fire(actor, full_auto) {
        return false;
    }

    let mask = world.team_mask_of(id, false);
    if actor.is_frozen() {
        if actor.pain_sound_timer <= 0 && !actor.prev_input.fire {
            actor.pain_sound_timer = crate::TICK_SPEED as i32;
            world.emit(GameEventData::Sound { kind: SoundKind::PlayerPainLong, pos: actor.pos(), mask });
        }
        return false;
    }

    if actor.inventory.slot(weapon).ammo == 0 {
        return false;
    }

    let pos = actor.pos();
    let proj_start = pos + dir.scale_int(PROJ_START_OFFSET);
    let tuning = world.tuning_for(actor.tune_zone);
    let laser_reach = tuning.laser_reach;
    let gun_lifetime = seconds_to_ticks(tuning.gun_lifetime);
    let grenade_lifetime = seconds_to_ticks(tuning.grenade_lifetime);
    let hammer_strength = tuning.hammer_strength;
    let hammer_hit_delay = tuning.hammer_hit_delay_ticks();
    let fire_delay = tuning.fire_delay_ticks(weapon);

    match weapon {
        Weapon::Hammer => {
            actor.ninja.hit.clear();
            world.emit(GameEventData::Sound { kind: SoundKind::HammerFire, pos, mask });
            if actor.hit_disabled & DISABLE_HIT_HAMMER == 0 {
                let hits = hammer_hits(world, actor, proj_start, hammer_strength);
                if hits > 0 {
                    actor.reload_timer = hammer_hit_delay;
                }
            }
            actor.hammer_swing.start(dir);
        }
        Weapon::Gun => {
            let ninja_jetpack = actor.core.flags.jetpack && world.config.ninja_jetpack;
            if !ninja_jetpack || actor.core.flags.telegun_gun {
                world.emit(GameEventData::SpawnProjectile {
                    owner: id,
                    weapon,
                    pos: proj_start,
                    dir,
                    lifetime_ticks: gun_lifetime,
                    explosive: false,
                });
                world.emit(GameEventData::Sound { kind: SoundKind::GunFire, pos, mask });
            }
        }
        Weapon::Shotgun | Weapon::Laser => {
            world.emit(GameEventData::SpawnLaser { owner: id, weapon, pos, dir, reach: laser_reach });
            let kind = if weapon == Weapon::Shotgun { SoundKind::ShotgunFire } else { SoundKind::LaserFire };
            world.emit(GameEventData::Sound { kind, pos, mask });
        }
        Weapon::Grenade => {
            world.emit(GameEventData::SpawnProjectile {
                owner: id,
                weapon,
                pos: proj_start,
                dir,
                lifetime_ticks: grenade_lifetime,
                explosive: true,
            });
            world.emit(GameEventData::Sound { kind: SoundKind::GrenadeFire, pos, mask });
        }
        Weapon::Ninja => {
            actor.ninja.hit.clear();
            actor.ninja.activation_dir = dir;
            actor.ninja.current_move_time = NINJA_MOVETIME_TICKS;
            actor.ninja.old_vel_amount = actor.core.vel.length();
            world.emit(GameEventData::Sound { kind: SoundKind::NinjaFire, pos, mask });
        }
    }

    actor.attack_tick = now;

    let slot = actor.inventory.slot_mut(weapon);
    if slot.ammo > 0 {
        slot.ammo -= 1;
    }

    if actor.reload_timer == 0 {
        actor.reload_timer = fire_delay;
    }
    true
}

/// Melee hits around `proj_start`. Returns the number of actors hit.
fn hammer_hits(world: &mut GameWorld, actor: &Actor, proj_start: FixedVec2, strength: Fixed) -> usize {
    let id = actor.id();
    let pos = actor.pos();
    let now = world.tick;
    let freeze_seconds = world.config.freeze_delay;
    let mask = world.team_mask_of(id, false);
    // Half-body query radius plus the target's own body
    let reach = from_int(PROXIMITY_HALF) + PHYS_SIZE;

    let targets: Vec<ActorId> = world
        .actors()
        .filter(|target| !target.paused && world.teams.can_collide(id, target.id()))
        .filter(|target| within(target.pos(), proj_start, reach))
        .map(Actor::id)
        .collect();

    for target_id in &targets {
        let Some(target) = world.actor_mut(*target_id) else {
            continue;
        };

        let away = target.pos() - proj_start;
        let hit_pos = if away.is_zero() {
            proj_start
        } else {
            target.pos() - away.normalize().scale_int(PROXIMITY_HALF)
        };

        let to_target = target.pos() - pos;
        let dir = if to_target.is_zero() { FixedVec2::UP } else { to_target.normalize() };
        let lift = (dir + FixedVec2::new(0, -to_fixed(1.1))).normalize().scale_int(10);
        let blended = clamp_vel(target.core.restrictions, target.core.vel + lift) - target.core.vel;
        let force = (FixedVec2::UP + blended).scale(strength);
        apply_force(target, force, now);
        target.unfreeze();
        if actor.freeze_hammer {
            target.freeze(freeze_seconds, now);
        }

        world.emit(GameEventData::HammerHit { pos: hit_pos, mask });
    }
    targets.len()
}

/// Dash ability upkeep: expiry, armor countdown and the dash itself.
pub(crate) fn handle_ninja(world: &mut GameWorld, actor: &mut Actor) {
    if actor.active_weapon() != Weapon::Ninja {
        return;
    }

    let now = world.tick;
    if now - actor.ninja.activation_tick > NINJA_DURATION_TICKS {
        actor.remove_ninja();
        return;
    }

    let id = actor.id();
    let tick_speed = crate::TICK_SPEED as i64;
    let ninja_time = actor.ninja.activation_tick + NINJA_DURATION_TICKS - now;
    if ninja_time % tick_speed == 0 && ninja_time / tick_speed <= 5 {
        let mask = world.team_mask_of(id, false);
        world.emit(GameEventData::DamageIndicator {
            pos: actor.pos(),
            amount: (ninja_time / tick_speed) as i32,
            mask,
        });
    }

    actor.armor = (10 - (ninja_time / 15) as i32).clamp(0, 10);

    actor.ninja.current_move_time -= 1;

    if actor.ninja.current_move_time == 0 {
        actor.core.vel = actor.ninja.activation_dir.scale(actor.ninja.old_vel_amount);
    }

    if actor.ninja.current_move_time > 0 {
        let old_pos = actor.pos();
        let vel = actor.ninja.activation_dir.scale_int(NINJA_VELOCITY);
        let (pos, _) = world.map.move_box(old_pos, vel, PHYS_SIZE);
        actor.core.pos = pos;
        actor.core.vel = FixedVec2::ZERO;

        if world.teams.is_solo(id) {
            return;
        }
        let center = old_pos + (pos - old_pos).div_int(2);
        let reach = PHYS_SIZE * 2;
        let coarse = reach + PHYS_SIZE / 2;
        let targets: Vec<ActorId> = world
            .actors()
            .filter(|target| !target.paused && world.teams.same_team(id, target.id()))
            .filter(|target| !world.teams.is_solo(target.id()))
            .filter(|target| within(target.pos(), center, coarse))
            .filter(|target| target.pos().distance_squared_wide(pos) <= (reach as i64 * reach as i64) as u64)
            .map(Actor::id)
            .collect();

        let mask = world.team_mask_of(id, false);
        for target_id in targets {
            if actor.ninja.hit.contains(&target_id) {
                continue;
            }
            if actor.ninja.hit.len() >= NINJA_MAX_HITS {
                break;
            }
            actor.ninja.hit.push(target_id);
            if let Some(target) = world.actor_mut(target_id) {
                let target_pos = target.pos();
                apply_force(target, FixedVec2::new(0, -from_int(10)), now);
                world.emit(GameEventData::Sound { kind: SoundKind::NinjaHit, pos: target_pos, mask });
            }
        }
    }
}

/// Jetpack thrust while firing the gun.
pub(crate) fn handle_jetpack(world: &mut GameWorld, actor: &mut Actor) {
    let weapon = actor.active_weapon();
    let full_auto = weapon.is_full_auto() || (actor.core.flags.jetpack && weapon == Weapon::Gun);
    if !will_fire(actor, full_auto) {
        return;
    }
    if actor.inventory.slot(weapon).ammo == 0 || actor.is_frozen() {
        return;
    }
    if weapon == Weapon::Gun && actor.core.flags.jetpack {
        let strength = world.tuning_for(actor.tune_zone).jetpack_strength / 611;
        let force = fire_direction(&actor.input).scale(strength).negate();
        apply_force(actor, force, world.tick);
    }
}

/// Queue a weapon from next/previous presses or a direct pick.
pub(crate) fn handle_weapon_switch(world: &mut GameWorld, actor: &mut Actor) {
    let owned = |actor: &Actor, index: usize| Weapon::from_index(index).is_some_and(|w| actor.inventory.has(w));
    if !(0..NUM_WEAPONS - 1).any(|index| owned(actor, index)) {
        return;
    }

    let mut wanted = actor.queued_weapon.unwrap_or(actor.active_weapon()).index();

    if actor.input.next_pressed(&actor.prev_input) {
        loop {
            wanted = (wanted + 1) % NUM_WEAPONS;
            if owned(actor, wanted) {
                break;
            }
        }
    }
    if actor.input.prev_pressed(&actor.prev_input) {
        loop {
            wanted = (wanted + NUM_WEAPONS - 1) % NUM_WEAPONS;
            if owned(actor, wanted) {
                break;
            }
        }
    }
    if actor.input.wanted_weapon > 0 {
        wanted = actor.input.wanted_weapon as usize - 1;
    }

    if let Some(weapon) = Weapon::from_index(wanted) {
        if weapon != actor.active_weapon() && actor.inventory.has(weapon) {
            actor.queued_weapon = Some(weapon);
        }
    }

    do_weapon_switch(world, actor);
}

/// Apply the queued weapon once reloaded, unless the dash ability holds the slot.
pub(crate) fn do_weapon_switch(world: &mut GameWorld, actor: &mut Actor) {
    let Some(queued) = actor.queued_weapon else {
        return;
    };
    if actor.reload_timer != 0 || actor.inventory.has(Weapon::Ninja) || !actor.inventory.has(queued) {
        return;
    }
    if actor.set_weapon(queued) {
        let mask = world.team_mask_of(actor.id(), false);
        world.emit(GameEventData::Sound { kind: SoundKind::WeaponSwitch, pos: actor.pos(), mask });
    }
}

/// Refill finite ammo of the active weapon while it is not firing.
fn regen_ammo(now: i64, actor: &mut Actor) {
    let weapon = actor.active_weapon();
    let regen_ms = AMMO_REGEN_MS[weapon.index()];
    if regen_ms == 0 {
        return;
    }
    let reloading = actor.reload_timer > 0;
    let slot = actor.inventory.slot_mut(weapon);
    if slot.ammo < 0 {
        return;
    }
    if reloading {
        slot.regen_start = -1;
        return;
    }
    if slot.regen_start < 0 {
        slot.regen_start = now;
    }
    if now - slot.regen_start >= regen_ms as i64 * crate::TICK_SPEED as i64 / 1000 {
        slot.ammo = (slot.ammo + 1).min(MAX_AMMO);
        slot.regen_start = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::GameConfig;
    use crate::game::events::GameEvent;
    use crate::game::map::TileMap;
    use crate::game::tuning::TuningTable;

    fn world() -> GameWorld {
        let map = TileMap::from_ascii(
            "arena",
            "##########\n\
             #........#\n\
             #........#\n\
             #........#\n\
             ##########\n",
        )
        .expect("valid map");
        let mut world = GameWorld::new(map, GameConfig::default(), TuningTable::default()).expect("valid world");
        world.tick = 1000;
        world
    }

    fn place(world: &mut GameWorld, id: u8, x: i32, y: i32) {
        let actor = Actor::new(ActorId(id), FixedVec2::from_ints(x, y), &world.config, world.tick);
        world.put_actor(actor);
        world.teams.set_present(ActorId(id), true);
    }

    fn press_fire(world: &mut GameWorld, id: u8, target_x: i32, target_y: i32) {
        let actor = world.actor_mut(ActorId(id)).expect("present");
        actor.input = PlayerInput { fire: true, target_x, target_y, ..PlayerInput::idle() };
        actor.prev_input = PlayerInput::idle();
    }

    fn events(world: &mut GameWorld) -> Vec<GameEvent> {
        world.events.drain_sorted()
    }

    #[test]
    fn test_empty_weapon_does_not_fire() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        {
            let actor = world.actor_mut(ActorId(0)).expect("present");
            actor.give_weapon(Weapon::Grenade, 0);
            actor.core.active_weapon = Weapon::Grenade;
        }
        press_fire(&mut world, 0, 1, 0);

        assert!(!try_fire(&mut world, ActorId(0)));
        let actor = world.actor(ActorId(0)).expect("present");
        assert_eq!(actor.reload_timer, 0);
        assert!(!events(&mut world)
            .iter()
            .any(|e| matches!(e.data, GameEventData::SpawnProjectile { .. })));
    }

    #[test]
    fn test_gun_fires_projectile_and_reloads() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        press_fire(&mut world, 0, 1, 0);

        assert!(try_fire(&mut world, ActorId(0)));
        let actor = world.actor(ActorId(0)).expect("present");
        assert_eq!(actor.reload_timer, 6);
        assert_eq!(actor.attack_tick, 1000);
        assert_eq!(actor.inventory.slot(Weapon::Gun).ammo, -1);

        let spawned = events(&mut world)
            .into_iter()
            .find_map(|e| match e.data {
                GameEventData::SpawnProjectile { pos, lifetime_ticks, explosive, .. } => {
                    Some((pos, lifetime_ticks, explosive))
                }
                _ => None,
            })
            .expect("projectile");
        assert_eq!(spawned, (FixedVec2::from_ints(121, 100), 100, false));

        // Still reloading
        assert!(!try_fire(&mut world, ActorId(0)));
    }

    #[test]
    fn test_finite_ammo_decrements() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        {
            let actor = world.actor_mut(ActorId(0)).expect("present");
            actor.give_weapon(Weapon::Laser, 2);
            actor.core.active_weapon = Weapon::Laser;
        }
        press_fire(&mut world, 0, 0, -1);
        assert!(try_fire(&mut world, ActorId(0)));
        let actor = world.actor(ActorId(0)).expect("present");
        assert_eq!(actor.inventory.slot(Weapon::Laser).ammo, 1);
        assert!(events(&mut world)
            .iter()
            .any(|e| matches!(e.data, GameEventData::SpawnLaser { weapon: Weapon::Laser, .. })));
    }

    #[test]
    fn test_frozen_actor_only_groans() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        world.actor_mut(ActorId(0)).expect("present").freeze(3, 1000);
        press_fire(&mut world, 0, 1, 0);

        assert!(!try_fire(&mut world, ActorId(0)));
        assert_eq!(world.actor(ActorId(0)).expect("present").pain_sound_timer, 50);
        let sounds: Vec<_> = events(&mut world)
            .into_iter()
            .filter_map(|e| match e.data {
                GameEventData::Sound { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(sounds, vec![SoundKind::PlayerPainLong]);
    }

    #[test]
    fn test_unfreeze_grace_fires_held_button() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        {
            let actor = world.actor_mut(ActorId(0)).expect("present");
            actor.input = PlayerInput { fire: true, ..PlayerInput::idle() };
            actor.prev_input = actor.input;
        }
        assert!(!try_fire(&mut world, ActorId(0)));

        world.actor_mut(ActorId(0)).expect("present").frozen_last_tick = true;
        assert!(try_fire(&mut world, ActorId(0)));
    }

    #[test]
    fn test_hammer_knocks_back_and_thaws_teammate() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        place(&mut world, 1, 125, 100);
        world.actor_mut(ActorId(1)).expect("present").freeze(3, 900);
        {
            let actor = world.actor_mut(ActorId(0)).expect("present");
            actor.core.active_weapon = Weapon::Hammer;
        }
        press_fire(&mut world, 0, 1, 0);

        assert!(try_fire(&mut world, ActorId(0)));
        let target = world.actor(ActorId(1)).expect("present");
        assert!(target.core.vel.y < 0);
        assert!(target.core.vel.x > 0);
        assert!(!target.is_frozen());

        let hammer = world.actor(ActorId(0)).expect("present");
        assert_eq!(hammer.reload_timer, 16);
        assert_eq!(hammer.hammer_swing.add, 10);
        assert!(events(&mut world)
            .iter()
            .any(|e| matches!(e.data, GameEventData::HammerHit { .. })));
    }

    #[test]
    fn test_hammer_reach_includes_target_body() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        // 38 units from the swing point at x = 121
        place(&mut world, 1, 159, 100);
        // Out of reach
        place(&mut world, 2, 170, 60);
        world.actor_mut(ActorId(0)).expect("present").core.active_weapon = Weapon::Hammer;
        press_fire(&mut world, 0, 1, 0);

        assert!(try_fire(&mut world, ActorId(0)));
        assert!(world.actor(ActorId(1)).expect("present").core.vel.x > 0);
        assert_eq!(world.actor(ActorId(2)).expect("present").core.vel, FixedVec2::ZERO);
    }

    #[test]
    fn test_hammer_skips_solo_target() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        place(&mut world, 1, 125, 100);
        world.teams.set_solo(ActorId(1), true);
        world.actor_mut(ActorId(0)).expect("present").core.active_weapon = Weapon::Hammer;
        press_fire(&mut world, 0, 1, 0);

        assert!(try_fire(&mut world, ActorId(0)));
        assert_eq!(world.actor(ActorId(1)).expect("present").core.vel, FixedVec2::ZERO);
        assert_eq!(world.actor(ActorId(0)).expect("present").reload_timer, 6);
    }

    #[test]
    fn test_ninja_dash_hits_once() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        place(&mut world, 1, 160, 100);
        {
            let actor = world.actor_mut(ActorId(0)).expect("present");
            actor.give_ninja(1000);
        }
        press_fire(&mut world, 0, 1, 0);
        assert!(try_fire(&mut world, ActorId(0)));

        let mut dasher = world.take_actor(ActorId(0)).expect("present");
        assert_eq!(dasher.ninja.current_move_time, NINJA_MOVETIME_TICKS);
        world.tick += 1;
        handle_ninja(&mut world, &mut dasher);
        assert!(dasher.pos().distance(FixedVec2::from_ints(150, 100)) < from_int(1));
        assert_eq!(dasher.core.vel, FixedVec2::ZERO);
        assert_eq!(dasher.ninja.hit, vec![ActorId(1)]);
        world.tick += 1;
        handle_ninja(&mut world, &mut dasher);
        assert_eq!(dasher.ninja.hit, vec![ActorId(1)]);
        world.put_actor(dasher);

        let target = world.actor(ActorId(1)).expect("present");
        assert_eq!(target.core.vel, FixedVec2::new(0, -from_int(10)));
    }

    #[test]
    fn test_ninja_expires() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        let mut actor = world.take_actor(ActorId(0)).expect("present");
        actor.core.active_weapon = Weapon::Hammer;
        actor.give_ninja(0);
        world.tick = NINJA_DURATION_TICKS + 1;
        handle_ninja(&mut world, &mut actor);
        assert_eq!(actor.active_weapon(), Weapon::Hammer);
        assert!(!actor.inventory.has(Weapon::Ninja));
    }

    #[test]
    fn test_jetpack_pushes_against_aim() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        let mut actor = world.take_actor(ActorId(0)).expect("present");
        actor.core.flags.jetpack = true;
        actor.input = PlayerInput { fire: true, target_x: 0, target_y: 1, ..PlayerInput::idle() };
        actor.prev_input = actor.input;
        handle_jetpack(&mut world, &mut actor);
        assert!(actor.core.vel.y < 0);
        assert_eq!(actor.core.vel.x, 0);
    }

    #[test]
    fn test_weapon_switch_waits_for_reload() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        let mut actor = world.take_actor(ActorId(0)).expect("present");
        actor.input = PlayerInput { wanted_weapon: 1, ..PlayerInput::idle() };
        actor.reload_timer = 3;
        handle_weapon_switch(&mut world, &mut actor);
        assert_eq!(actor.queued_weapon, Some(Weapon::Hammer));
        assert_eq!(actor.active_weapon(), Weapon::Gun);

        actor.reload_timer = 0;
        do_weapon_switch(&mut world, &mut actor);
        assert_eq!(actor.active_weapon(), Weapon::Hammer);
        assert_eq!(actor.queued_weapon, None);
    }

    #[test]
    fn test_next_weapon_skips_unowned() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        let mut actor = world.take_actor(ActorId(0)).expect("present");
        actor.give_weapon(Weapon::Laser, 5);
        actor.input = PlayerInput { next_weapon: true, ..PlayerInput::idle() };
        handle_weapon_switch(&mut world, &mut actor);
        assert_eq!(actor.active_weapon(), Weapon::Laser);
    }

    #[test]
    fn test_no_switch_while_ninja() {
        let mut world = world();
        place(&mut world, 0, 100, 100);
        let mut actor = world.take_actor(ActorId(0)).expect("present");
        actor.give_ninja(1000);
        actor.input = PlayerInput { wanted_weapon: 2, ..PlayerInput::idle() };
        handle_weapon_switch(&mut world, &mut actor);
        assert_eq!(actor.active_weapon(), Weapon::Ninja);
    }

    #[test]
    fn test_ammo_regen_refills() {
        let mut actor = Actor::new(ActorId(0), FixedVec2::ZERO, &GameConfig::default(), 0);
        actor.inventory.slot_mut(Weapon::Gun).ammo = 3;
        regen_ammo(100, &mut actor);
        assert_eq!(actor.inventory.slot(Weapon::Gun).regen_start, 100);
        regen_ammo(124, &mut actor);
        assert_eq!(actor.inventory.slot(Weapon::Gun).ammo, 3);
        regen_ammo(125, &mut actor);
        assert_eq!(actor.inventory.slot(Weapon::Gun).ammo, 4);
        assert_eq!(actor.inventory.slot(Weapon::Gun).regen_start, -1);
    }
}
