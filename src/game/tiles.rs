//! Tile Rule Engine
//!
//! Runs after the move for every cell the actor crossed this tick, in path
//! order. Death tiles and speedups are checked once at the final position
//! before the path walk. Rules for one cell form a priority chain; a
//! teleport ends the processing of that cell.

use tracing::{debug, info};

use crate::core::fixed::{from_int, to_fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;
use crate::game::actor::{
    Actor, RaceState, TileLatch, DISABLE_HIT_ALL, DISABLE_HIT_GRENADE, DISABLE_HIT_HAMMER, DISABLE_HIT_LASER,
    DISABLE_HIT_SHOTGUN, NUM_CHECKPOINTS,
};
use crate::game::collision::{clamp_vel, CANT_MOVE_DOWN};
use crate::game::config::TeamPolicy;
use crate::game::events::GameEventData;
use crate::game::map::{SpeedupTile, SwitchKind, SwitchTile, TeleKind, TeleTile, TileKind};
use crate::game::movement::JUMPED_HELD;
use crate::game::switch::SwitchAction;
use crate::game::teams::{TEAM_FLOCK, TEAM_SUPER};
use crate::game::weapon::Weapon;
use crate::game::world::GameWorld;

/// Result of processing one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileOutcome {
    Continue,
    /// The actor was moved by a teleporter; the rest of the cell is skipped.
    Teleported,
}

/// Run the rule engine for this tick's path.
///
/// Returns false if the actor must die.
pub(crate) fn process_path(world: &mut GameWorld, actor: &mut Actor) -> bool {
    if handle_skippable(world, actor) {
        return false;
    }

    let indices = world.map.map_indices(actor.prev_pos, actor.pos());
    if indices.is_empty() {
        let current = world.map.map_index(actor.pos());
        handle_tile(world, actor, current);
    } else {
        for index in indices {
            handle_tile(world, actor, Some(index));
        }
    }
    true
}

/// Death probes and speedups at the current position.
///
/// Returns true if the actor must die.
pub(crate) fn handle_skippable(world: &mut GameWorld, actor: &mut Actor) -> bool {
    let pos = actor.pos();
    let map = &world.map;
    let off = to_fixed(28.0 / 3.0);
    let probes = [
        FixedVec2::new(pos.x + off, pos.y - off),
        FixedVec2::new(pos.x + off, pos.y + off),
        FixedVec2::new(pos.x - off, pos.y - off),
        FixedVec2::new(pos.x - off, pos.y + off),
    ];
    let on_death = probes
        .iter()
        .any(|p| map.collision_at(*p) == TileKind::Death || map.front_collision_at(*p) == TileKind::Death);

    let team = world.teams.team(actor.id());
    let finished_in_team = team != TEAM_FLOCK && actor.race == RaceState::Finished;
    if on_death && !actor.is_super() && !finished_in_team {
        return true;
    }
    if map.is_clipped(pos) {
        return true;
    }

    if let Some(speedup) = map.map_index(pos).and_then(|index| map.speedup(index)) {
        apply_speedup(actor, speedup);
    }
    false
}

/// Accelerate along a speedup, bounded by its target speed.
pub(crate) fn apply_speedup(actor: &mut Actor, speedup: SpeedupTile) {
    let dir = FixedVec2::from_degrees(speedup.angle as i32);
    let vel = actor.core.vel;
    let force = speedup.force as i32;

    let new_vel = if speedup.force == 255 && speedup.max_speed > 0 {
        dir.scale_int(speedup.max_speed as i32 / 5)
    } else {
        let max_speed = match speedup.max_speed {
            1..=4 => 5,
            other => other as i32,
        };
        if max_speed > 0 {
            // Speed still missing along the tile direction
            let speed_left = from_int(max_speed) / 5 - vel.dot(dir);
            let whole = (speed_left / FIXED_ONE).abs();
            if whole > force && speed_left > 0 {
                vel + dir.scale_int(force)
            } else if whole > force {
                vel - dir.scale_int(force)
            } else {
                vel + dir.scale(speed_left)
            }
        } else {
            vel + dir.scale_int(force)
        }
    };
    actor.core.vel = clamp_vel(actor.core.restrictions, new_vel);
}

/// Apply every rule of one cell. `None` means the actor is over nothing
/// special; latches reset and restrictions are recomputed.
pub(crate) fn handle_tile(world: &mut GameWorld, actor: &mut Actor, index: Option<usize>) -> TileOutcome {
    let id = actor.id();
    let team = world.teams.team(id);
    let restrictions = world
        .map
        .move_restrictions(actor.pos(), from_int(18), world.doors(team), index);
    actor.core.restrictions = restrictions;

    let Some(index) = index else {
        actor.latch = TileLatch::default();
        return TileOutcome::Continue;
    };

    let kinds = [world.map.game_tile(index).kind, world.map.front_tile(index).kind];
    let has = |kind: TileKind| kinds.contains(&kind);
    let now = world.tick;

    for kind in kinds {
        if let TileKind::Checkpoint(cp) = kind {
            let advances = actor.cp_active.map_or(true, |active| cp > active);
            if actor.race == RaceState::Started && advances && (cp as usize) < NUM_CHECKPOINTS {
                actor.cp_active = Some(cp);
                actor.cp_times[cp as usize] = now - actor.start_tick;
            }
        }
    }

    if let Some(TeleTile { kind: TeleKind::Checkpoint, number }) = world.map.tele(index) {
        actor.tele_checkpoint = actor.tele_checkpoint.max(number);
    }

    handle_race_tiles(world, actor, &kinds);

    let is_super = actor.is_super();
    if has(TileKind::Freeze) && !is_super && !actor.deep_freeze {
        actor.freeze(world.config.freeze_delay, now);
    } else if has(TileKind::Unfreeze) && !actor.deep_freeze {
        actor.unfreeze();
    }

    if has(TileKind::DeepFreeze) && !is_super && !actor.deep_freeze {
        actor.deep_freeze = true;
    } else if has(TileKind::DeepUnfreeze) && !is_super && actor.deep_freeze {
        actor.deep_freeze = false;
    }

    let flags = &mut actor.core.flags;
    let mut notice = None;
    if has(TileKind::EndlessHookEnable) && !flags.endless_hook {
        flags.endless_hook = true;
        notice = Some("Endless hook has been activated");
    } else if has(TileKind::EndlessHookDisable) && flags.endless_hook {
        flags.endless_hook = false;
        notice = Some("Endless hook has been deactivated");
    }
    push_notice(world, id, notice.take());

    if has(TileKind::HitDisable) && actor.hit_disabled != DISABLE_HIT_ALL {
        actor.hit_disabled = DISABLE_HIT_ALL;
        notice = Some("You can't hit others");
    } else if has(TileKind::HitEnable) && actor.hit_disabled != 0 {
        actor.hit_disabled = 0;
        notice = Some("You can hit others");
    }
    actor.sync_hit_flags();
    push_notice(world, id, notice.take());

    let flags = &mut actor.core.flags;
    if has(TileKind::NpcDisable) && flags.collision {
        flags.collision = false;
        notice = Some("You can't collide with others");
    } else if has(TileKind::NpcEnable) && !flags.collision {
        flags.collision = true;
        notice = Some("You can collide with others");
    }
    push_notice(world, id, notice.take());

    let flags = &mut actor.core.flags;
    if has(TileKind::NphDisable) && flags.hook_hit {
        flags.hook_hit = false;
        notice = Some("You can't hook others");
    } else if has(TileKind::NphEnable) && !flags.hook_hit {
        flags.hook_hit = true;
        notice = Some("You can hook others");
    }
    push_notice(world, id, notice.take());

    if has(TileKind::UnlimitedJumpsEnable) && !actor.super_jump {
        actor.super_jump = true;
        actor.core.flags.endless_jump = true;
        notice = Some("You have unlimited air jumps");
    } else if has(TileKind::UnlimitedJumpsDisable) && actor.super_jump {
        actor.super_jump = false;
        actor.core.flags.endless_jump = false;
        notice = Some("You don't have unlimited air jumps");
    }
    push_notice(world, id, notice.take());

    let core = &mut actor.core;
    if has(TileKind::Walljump) && core.vel.y > 0 && core.colliding != 0 && core.left_wall {
        core.left_wall = false;
        core.jumped_total = (core.jumps - 1).max(0);
        core.jumped = JUMPED_HELD;
    }

    if has(TileKind::JetpackEnable) && !actor.core.flags.jetpack {
        actor.core.flags.jetpack = true;
        notice = Some("You have a jetpack gun");
    } else if has(TileKind::JetpackDisable) && actor.core.flags.jetpack {
        actor.core.flags.jetpack = false;
        notice = Some("You lost your jetpack gun");
    }
    push_notice(world, id, notice.take());

    if has(TileKind::RefillJumps) {
        if !actor.latch.refill_jumps {
            actor.core.jumped_total = 0;
            actor.core.jumped = 0;
            actor.latch.refill_jumps = true;
        }
    } else {
        actor.latch.refill_jumps = false;
    }

    let flags = &mut actor.core.flags;
    for (enable, disable, flag, name) in [
        (TileKind::TeleGunEnable, TileKind::TeleGunDisable, &mut flags.telegun_gun, "gun"),
        (TileKind::TeleGrenadeEnable, TileKind::TeleGrenadeDisable, &mut flags.telegun_grenade, "grenade"),
        (TileKind::TeleLaserEnable, TileKind::TeleLaserDisable, &mut flags.telegun_laser, "laser"),
    ] {
        if has(enable) && !*flag {
            *flag = true;
            world.notify(id, format!("Teleport {name} enabled"));
        } else if has(disable) && *flag {
            *flag = false;
            world.notify(id, format!("Teleport {name} disabled"));
        }
    }

    // Stoppers
    if actor.core.vel.y > 0 && restrictions & CANT_MOVE_DOWN != 0 {
        actor.core.jumped = 0;
        actor.core.jumped_total = 0;
    }
    actor.core.vel = clamp_vel(restrictions, actor.core.vel);

    let switch = world.map.switch_tile(index);
    if let Some(sw) = switch {
        handle_switch_tile(world, actor, sw, team);
    }
    let switch_kind = switch.map(|sw| sw.kind);
    if switch_kind != Some(SwitchKind::AddTime) {
        actor.latch.time_penalty = false;
    }
    if switch_kind != Some(SwitchKind::SubtractTime) {
        actor.latch.time_bonus = false;
    }

    send_tuning_if_changed(world, actor);

    match world.map.tele(index) {
        Some(tele) if handle_tele(world, actor, tele) => TileOutcome::Teleported,
        _ => TileOutcome::Continue,
    }
}

fn push_notice(world: &mut GameWorld, id: crate::game::movement::ActorId, notice: Option<&str>) {
    if let Some(text) = notice {
        world.notify(id, text);
    }
}

/// Zone messages and a tuning resync when the actor's tune zone changes.
pub(crate) fn handle_tune_layer(world: &mut GameWorld, actor: &mut Actor) {
    let zone = world.map.tune_zone(world.map.clamped_index(actor.pos()));
    actor.tune_zone = zone;
    if actor.tune_zone_old == Some(zone) {
        return;
    }

    let id = actor.id();
    let mut lines = Vec::new();
    if let Some(old) = actor.tune_zone_old {
        lines.extend(world.tuning.leave_lines(old));
    }
    lines.extend(world.tuning.enter_lines(zone));
    for text in lines {
        world.emit(GameEventData::ZoneMessage { actor: id, text });
    }
    actor.tune_zone_old = Some(zone);
    world.emit(GameEventData::TuningResync { actor: id, zone, faketuning: actor.faketuning });
}

/// Emit a tuning resync when the faketuning bits changed.
pub(crate) fn send_tuning_if_changed(world: &mut GameWorld, actor: &mut Actor) {
    let bits = actor.derived_faketuning();
    if bits != actor.faketuning {
        actor.faketuning = bits;
        world.emit(GameEventData::TuningResync { actor: actor.id(), zone: actor.tune_zone, faketuning: bits });
    }
}

/// Start, finish, solo parts and team unlocking.
fn handle_race_tiles(world: &mut GameWorld, actor: &mut Actor, kinds: &[TileKind; 2]) {
    let id = actor.id();
    let team = world.teams.team(id);
    let now = world.tick;
    let policy = world.teams.policy();

    if kinds.contains(&TileKind::Start) {
        let needs_team = policy == TeamPolicy::Mandatory && (team == TEAM_FLOCK || world.teams.count(team) <= 1);
        if needs_team && !actor.is_super() {
            let warned_recently = actor
                .last_start_warning
                .is_some_and(|tick| tick >= now - 3 * crate::TICK_SPEED as i64);
            if !warned_recently {
                world.notify(id, "You need to be in a team with other players to start");
                actor.last_start_warning = Some(now);
            }
        } else if actor.race != RaceState::Started || !policy.treats_as_unit(team) {
            actor.race = RaceState::Started;
            actor.start_tick = now;
            actor.cp_active = None;
            actor.cp_times = [0; NUM_CHECKPOINTS];
            if world.config.reset_pickups_on_start {
                actor.reset_pickups();
            }
        }
    }

    if kinds.contains(&TileKind::Finish) && actor.race == RaceState::Started {
        actor.race = RaceState::Finished;
        let ticks = now - actor.start_tick;
        let checkpoints = match actor.cp_active {
            Some(cp) => actor.cp_times[..=cp as usize].to_vec(),
            None => Vec::new(),
        };
        info!(actor = id.0, ticks, "race finished");
        world.emit(GameEventData::RaceFinished { actor: id, ticks, checkpoints });
    }

    if kinds.contains(&TileKind::SoloEnable) && !actor.core.flags.solo {
        set_solo(world, actor, true);
        world.notify(id, "You are now in a solo part");
    } else if kinds.contains(&TileKind::SoloDisable) && actor.core.flags.solo {
        set_solo(world, actor, false);
        world.notify(id, "You are now out of the solo part");
    }

    if kinds.contains(&TileKind::UnlockTeam) && world.teams.is_locked(team) {
        world.teams.set_locked(team, false);
        world.notify(id, "Your team was unlocked by an unlock team tile");
    }
}

/// Toggle solo mode in both the team table and the core.
pub(crate) fn set_solo(world: &mut GameWorld, actor: &mut Actor, solo: bool) {
    world.teams.set_solo(actor.id(), solo);
    actor.core.flags.solo = solo;
}

fn handle_switch_tile(world: &mut GameWorld, actor: &mut Actor, sw: SwitchTile, team: u8) {
    let id = actor.id();
    let now = world.tick;
    let tick_speed = crate::TICK_SPEED as i64;
    let active = sw.number == 0 || world.switches.is_active(sw.number, team);
    let shared = team != TEAM_SUPER;
    let timed_end = now + 1 + sw.delay as i64 * tick_speed;

    match sw.kind {
        SwitchKind::Open if shared && sw.number > 0 => {
            world.switches.apply(sw.number, team, SwitchAction::Open, 0, now);
        }
        SwitchKind::TimedOpen if shared && sw.number > 0 => {
            world.switches.apply(sw.number, team, SwitchAction::TimedOpen, timed_end, now);
        }
        SwitchKind::TimedClose if shared && sw.number > 0 => {
            world.switches.apply(sw.number, team, SwitchAction::TimedClose, timed_end, now);
        }
        SwitchKind::Close if shared && sw.number > 0 => {
            world.switches.apply(sw.number, team, SwitchAction::Close, 0, now);
        }
        SwitchKind::Freeze if shared && active => {
            actor.freeze(sw.delay as i32, now);
        }
        SwitchKind::DeepFreeze if shared && active => {
            actor.deep_freeze = true;
        }
        SwitchKind::DeepUnfreeze if shared && active => {
            actor.deep_freeze = false;
        }
        SwitchKind::HitEnable | SwitchKind::HitDisable => {
            let enable = sw.kind == SwitchKind::HitEnable;
            let Some((bit, name)) = hit_bit(sw.delay) else {
                return;
            };
            let disabled = actor.hit_disabled & bit != 0;
            if enable && disabled {
                actor.hit_disabled &= !bit;
                world.notify(id, format!("You can {name} hit others"));
            } else if !enable && !disabled {
                actor.hit_disabled |= bit;
                world.notify(id, format!("You can't {name} hit others"));
            }
            actor.sync_hit_flags();
        }
        SwitchKind::Jump => {
            let jumps = if sw.delay == 255 { -1 } else { sw.delay as i32 };
            if jumps != actor.core.jumps {
                let text = match jumps {
                    -1 => "You only have your ground jump now".to_string(),
                    1 => "You can jump 1 time".to_string(),
                    n => format!("You can jump {n} times"),
                };
                world.notify(id, text);
                actor.core.jumps = jumps;
            }
        }
        SwitchKind::AddTime if !actor.latch.time_penalty => {
            let ticks = (sw.delay as i64 * 60 + sw.number as i64) * tick_speed;
            shift_race_time(world, actor, -ticks);
            actor.latch.time_penalty = true;
        }
        SwitchKind::SubtractTime if !actor.latch.time_bonus => {
            let ticks = (sw.delay as i64 * 60 + sw.number as i64) * tick_speed;
            shift_race_time(world, actor, ticks);
            actor.latch.time_bonus = true;
        }
        _ => {}
    }
}

fn hit_bit(slot: u8) -> Option<(u8, &'static str)> {
    match Weapon::from_index(slot as usize)? {
        Weapon::Hammer => Some((DISABLE_HIT_HAMMER, "hammer")),
        Weapon::Shotgun => Some((DISABLE_HIT_SHOTGUN, "shotgun")),
        Weapon::Grenade => Some((DISABLE_HIT_GRENADE, "grenade")),
        Weapon::Laser => Some((DISABLE_HIT_LASER, "laser")),
        Weapon::Gun | Weapon::Ninja => None,
    }
}

/// Move the run's start tick by `delta` for the actor and its unit mates.
///
/// A positive delta is a bonus and never moves the start past the current tick.
fn shift_race_time(world: &mut GameWorld, actor: &mut Actor, delta: i64) {
    let now = world.tick;
    let shift = |start: i64| if delta > 0 { (start + delta).min(now) } else { start + delta };
    actor.start_tick = shift(actor.start_tick);

    for mate in world.teams.unit_mates(actor.id()) {
        if let Some(other) = world.actor_mut(mate) {
            other.start_tick = shift(other.start_tick);
        }
    }
    debug!(actor = actor.id().0, delta, "race time shifted");
}

/// Teleporter cell. Returns true if tile processing of this cell ends here.
fn handle_tele(world: &mut GameWorld, actor: &mut Actor, tele: TeleTile) -> bool {
    match tele.kind {
        TeleKind::In | TeleKind::EvilIn => {
            let count = world.map.tele_outs(tele.number).len();
            if count == 0 {
                return false;
            }
            if actor.is_super() {
                return true;
            }
            let pick = world.rng.next_int(count as u32) as usize;
            let dest = world.map.tele_outs(tele.number)[pick];
            let arrival = if tele.kind == TeleKind::EvilIn { Arrival::EvilTele } else { Arrival::Tele };
            teleport(world, actor, dest, arrival);
            true
        }
        TeleKind::CheckIn | TeleKind::CheckEvilIn => {
            if actor.is_super() {
                return true;
            }
            let arrival = if tele.kind == TeleKind::CheckEvilIn { Arrival::EvilCheck } else { Arrival::Check };
            for number in (1..=actor.tele_checkpoint).rev() {
                let count = world.map.tele_check_outs(number).len();
                if count > 0 {
                    let pick = world.rng.next_int(count as u32) as usize;
                    let dest = world.map.tele_check_outs(number)[pick];
                    teleport(world, actor, dest, arrival);
                    return true;
                }
            }
            let team = world.teams.team(actor.id());
            let occupied: Vec<FixedVec2> = world
                .actors()
                .filter(|other| world.teams.team(other.id()) == team)
                .map(Actor::pos)
                .collect();
            if let Some(dest) = world.spawner.resolve(&world.map, team, &occupied) {
                teleport(world, actor, dest, arrival);
            }
            true
        }
        TeleKind::Out | TeleKind::CheckOut | TeleKind::Checkpoint => false,
    }
}

/// How an actor reached a teleporter destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arrival {
    Tele,
    EvilTele,
    Check,
    EvilCheck,
}

impl Arrival {
    fn is_evil(self) -> bool {
        matches!(self, Arrival::EvilTele | Arrival::EvilCheck)
    }

    /// Checkpoint teleports never strip pickups.
    fn may_lose_weapons(self) -> bool {
        matches!(self, Arrival::Tele | Arrival::EvilTele)
    }
}

/// Place an actor at a teleporter destination.
///
/// Evil teleporters also stop the actor and free it from other hooks.
pub(crate) fn teleport(world: &mut GameWorld, actor: &mut Actor, dest: FixedVec2, arrival: Arrival) {
    let config = &world.config;
    let keep_hook = config.teleport_hold_hook || config.old_teleport_hook;
    let lose_weapons = arrival.may_lose_weapons() && config.teleport_lose_weapons && !config.old_teleport_weapons;
    let evil = arrival.is_evil();

    actor.core.pos = dest;
    actor.prev_pos = dest;
    if evil {
        actor.core.vel = FixedVec2::ZERO;
    }
    if !keep_hook {
        actor.core.retract_hook();
        if evil {
            world.release_hooks_on(actor.id());
        }
    }
    if lose_weapons {
        actor.reset_pickups();
    }
    actor.core.reset = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::GameConfig;
    use crate::game::map::{Tile, TileMap, TileMapBuilder};
    use crate::game::movement::{ActorId, HookState};
    use crate::game::tuning::TuningTable;

    fn world_with(build: impl FnOnce(&mut TileMapBuilder)) -> GameWorld {
        let mut builder = TileMapBuilder::new("tiles", WIDTH, 8).expect("valid size");
        builder.fill(0, 7, 11, 7, Tile::new(TileKind::Solid));
        build(&mut builder);
        let mut world =
            GameWorld::new(builder.build(), GameConfig::default(), TuningTable::default()).expect("valid world");
        world.tick = 1000;
        world
    }

    fn actor_at(world: &GameWorld, id: u8, x: usize, y: usize) -> Actor {
        Actor::new(ActorId(id), crate::game::map::tile_center(x, y), &world.config, world.tick)
    }

    const WIDTH: usize = 12;

    fn index(x: usize, y: usize) -> Option<usize> {
        Some(y * WIDTH + x)
    }

    #[test]
    fn test_freeze_tile_freezes_with_default_delay() {
        let mut world = world_with(|b| {
            b.game(3, 3, Tile::new(TileKind::Freeze));
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        actor.armor = 10;
        actor.core.active_weapon = Weapon::Hammer;

        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.freeze_time, 150);
        assert_eq!(actor.armor, 0);
        assert_eq!(actor.active_weapon(), Weapon::Gun);
    }

    #[test]
    fn test_deep_freeze_blocks_unfreeze() {
        let mut world = world_with(|b| {
            b.game(2, 3, Tile::new(TileKind::DeepFreeze));
            b.game(3, 3, Tile::new(TileKind::Unfreeze));
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        handle_tile(&mut world, &mut actor, index(2, 3));
        assert!(actor.deep_freeze);

        actor.freeze_time = 40;
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.freeze_time, 40);
    }

    #[test]
    fn test_checkpoints_only_advance() {
        let mut world = world_with(|b| {
            b.game(2, 3, Tile::new(TileKind::Checkpoint(3)));
            b.game(3, 3, Tile::new(TileKind::Checkpoint(2)));
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        actor.race = RaceState::Started;
        actor.start_tick = 900;

        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.cp_active, Some(3));
        assert_eq!(actor.cp_times[3], 100);

        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.cp_active, Some(3));
        assert_eq!(actor.cp_times[2], 0);
    }

    #[test]
    fn test_first_checkpoint_is_recorded() {
        let mut world = world_with(|b| {
            b.game(2, 3, Tile::new(TileKind::Checkpoint(0)));
            b.game(5, 3, Tile::new(TileKind::Finish));
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        actor.race = RaceState::Started;
        actor.start_tick = 950;

        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.cp_active, Some(0));
        assert_eq!(actor.cp_times[0], 50);

        world.tick = 1100;
        handle_tile(&mut world, &mut actor, index(5, 3));
        let checkpoints = world.events.iter().find_map(|e| match &e.data {
            GameEventData::RaceFinished { checkpoints, .. } => Some(checkpoints.clone()),
            _ => None,
        });
        assert_eq!(checkpoints, Some(vec![50]));
    }

    #[test]
    fn test_checkpoint_ignored_before_start() {
        let mut world = world_with(|b| {
            b.game(2, 3, Tile::new(TileKind::Checkpoint(4)));
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.cp_active, None);
    }

    #[test]
    fn test_start_and_finish() {
        let mut world = world_with(|b| {
            b.game(2, 3, Tile::new(TileKind::Start));
            b.game(5, 3, Tile::new(TileKind::Finish));
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.race, RaceState::Started);
        assert_eq!(actor.start_tick, 1000);

        world.tick = 1250;
        handle_tile(&mut world, &mut actor, index(5, 3));
        assert_eq!(actor.race, RaceState::Finished);
        let finished = world
            .events
            .iter()
            .find_map(|e| match &e.data {
                GameEventData::RaceFinished { ticks, .. } => Some(*ticks),
                _ => None,
            });
        assert_eq!(finished, Some(250));
    }

    #[test]
    fn test_switch_close_is_team_scoped() {
        let mut world = world_with(|b| {
            b.switch(3, 3, SwitchKind::Close, 1, 0);
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        world.teams.set_team(ActorId(0), 2).expect("team 2");

        handle_tile(&mut world, &mut actor, index(3, 3));
        assert!(!world.switches.is_active(1, 2));
        assert!(world.switches.is_active(1, 3));
        assert!(world.switches.is_active(1, TEAM_FLOCK));
    }

    #[test]
    fn test_timed_switch_end_tick() {
        let mut world = world_with(|b| {
            b.switch(3, 3, SwitchKind::TimedClose, 2, 4);
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(world.switches.slot(2, TEAM_FLOCK).end_tick, 1000 + 1 + 4 * 50);
    }

    #[test]
    fn test_time_penalty_shared_with_team() {
        let mut world = world_with(|b| {
            b.switch(3, 3, SwitchKind::AddTime, 30, 0);
        });
        for id in [0, 1] {
            world.teams.set_team(ActorId(id), 3).expect("team 3");
            world.teams.set_present(ActorId(id), true);
        }
        let mut mate = actor_at(&world, 1, 6, 3);
        mate.race = RaceState::Started;
        mate.start_tick = 500;
        world.put_actor(mate);

        let mut actor = actor_at(&world, 0, 3, 3);
        actor.race = RaceState::Started;
        actor.start_tick = 500;

        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.start_tick, 500 - 1500);
        assert_eq!(world.actor(ActorId(1)).map(|a| a.start_tick), Some(500 - 1500));

        // Latched while standing on it
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.start_tick, 500 - 1500);

        handle_tile(&mut world, &mut actor, None);
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.start_tick, 500 - 3000);
    }

    #[test]
    fn test_time_bonus_capped_at_now() {
        let mut world = world_with(|b| {
            b.switch(3, 3, SwitchKind::SubtractTime, 10, 0);
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        actor.race = RaceState::Started;
        actor.start_tick = 990;
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.start_tick, 1000);
    }

    #[test]
    fn test_jump_switch_sets_budget() {
        let mut world = world_with(|b| {
            b.switch(3, 3, SwitchKind::Jump, 0, 255);
            b.switch(4, 3, SwitchKind::Jump, 0, 5);
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.core.jumps, -1);
        handle_tile(&mut world, &mut actor, index(4, 3));
        assert_eq!(actor.core.jumps, 5);
    }

    #[test]
    fn test_refill_jumps_latched() {
        let mut world = world_with(|b| {
            b.game(3, 3, Tile::new(TileKind::RefillJumps));
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        actor.core.jumped_total = 2;
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.core.jumped_total, 0);
        assert!(actor.latch.refill_jumps);

        actor.core.jumped_total = 2;
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert_eq!(actor.core.jumped_total, 2);
    }

    #[test]
    fn test_teleport_moves_and_retracts_hook() {
        let mut world = world_with(|b| {
            b.tele(2, 3, TeleKind::In, 1);
            b.tele(9, 2, TeleKind::Out, 1);
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        actor.core.hook = HookState::Flying;
        actor.core.vel = FixedVec2::from_ints(4, 0);

        let outcome = handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(outcome, TileOutcome::Teleported);
        assert_eq!(actor.pos(), crate::game::map::tile_center(9, 2));
        assert_eq!(actor.core.hook, HookState::Retracted);
        assert_eq!(actor.core.vel, FixedVec2::from_ints(4, 0));
        assert!(actor.core.reset);
    }

    #[test]
    fn test_evil_teleport_stops_and_frees() {
        let mut world = world_with(|b| {
            b.tele(2, 3, TeleKind::EvilIn, 1);
            b.tele(9, 2, TeleKind::Out, 1);
        });
        let mut hooker = actor_at(&world, 1, 6, 3);
        hooker.core.hook = HookState::GrabbedActor(ActorId(0));
        world.put_actor(hooker);

        let mut actor = actor_at(&world, 0, 2, 3);
        actor.core.vel = FixedVec2::from_ints(4, 0);
        handle_tile(&mut world, &mut actor, index(2, 3));

        assert_eq!(actor.core.vel, FixedVec2::ZERO);
        assert_eq!(world.actor(ActorId(1)).map(|a| a.core.hook), Some(HookState::Retracted));
    }

    #[test]
    fn test_only_plain_teleports_strip_pickups() {
        let mut world = world_with(|b| {
            b.tele(1, 3, TeleKind::Checkpoint, 1);
            b.tele(2, 3, TeleKind::In, 1);
            b.tele(4, 3, TeleKind::CheckIn, 0);
            b.tele(6, 2, TeleKind::CheckOut, 1);
            b.tele(9, 2, TeleKind::Out, 1);
        });
        world.config.teleport_lose_weapons = true;
        let mut actor = actor_at(&world, 0, 1, 3);
        actor.give_weapon(Weapon::Shotgun, 10);
        handle_tile(&mut world, &mut actor, index(1, 3));

        handle_tile(&mut world, &mut actor, index(4, 3));
        assert_eq!(actor.pos(), crate::game::map::tile_center(6, 2));
        assert!(actor.inventory.has(Weapon::Shotgun));

        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.pos(), crate::game::map::tile_center(9, 2));
        assert!(!actor.inventory.has(Weapon::Shotgun));
    }

    #[test]
    fn test_super_actor_ignores_teleport() {
        let mut world = world_with(|b| {
            b.tele(2, 3, TeleKind::In, 1);
            b.tele(9, 2, TeleKind::Out, 1);
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        actor.core.flags.is_super = true;
        let start = actor.pos();
        assert_eq!(handle_tile(&mut world, &mut actor, index(2, 3)), TileOutcome::Teleported);
        assert_eq!(actor.pos(), start);
    }

    #[test]
    fn test_check_teleport_uses_highest_checkpoint() {
        let mut world = world_with(|b| {
            b.tele(1, 3, TeleKind::Checkpoint, 2);
            b.tele(2, 3, TeleKind::CheckIn, 0);
            b.tele(5, 2, TeleKind::CheckOut, 1);
            b.tele(8, 2, TeleKind::CheckOut, 2);
        });
        let mut actor = actor_at(&world, 0, 1, 3);
        handle_tile(&mut world, &mut actor, index(1, 3));
        assert_eq!(actor.tele_checkpoint, 2);

        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.pos(), crate::game::map::tile_center(8, 2));
    }

    #[test]
    fn test_check_teleport_without_checkpoint_uses_spawn() {
        let mut world = world_with(|b| {
            b.tele(2, 3, TeleKind::CheckIn, 0);
            b.spawn(10, 5);
        });
        let mut actor = actor_at(&world, 0, 2, 3);
        handle_tile(&mut world, &mut actor, index(2, 3));
        assert_eq!(actor.pos(), crate::game::map::tile_center(10, 5));
    }

    #[test]
    fn test_death_tile_kills_unless_super() {
        let mut world = world_with(|b| {
            b.game(3, 3, Tile::new(TileKind::Death));
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        assert!(handle_skippable(&mut world, &mut actor));

        actor.core.flags.is_super = true;
        assert!(!handle_skippable(&mut world, &mut actor));
    }

    #[test]
    fn test_speedup_direct_set() {
        let mut actor = Actor::new(ActorId(0), FixedVec2::ZERO, &GameConfig::default(), 0);
        actor.core.vel = FixedVec2::from_ints(0, 7);
        apply_speedup(&mut actor, SpeedupTile { force: 255, max_speed: 50, angle: 0 });
        assert_eq!(actor.core.vel, FixedVec2::from_ints(10, 0));
    }

    #[test]
    fn test_speedup_bounded_by_max_speed() {
        let mut actor = Actor::new(ActorId(0), FixedVec2::ZERO, &GameConfig::default(), 0);
        actor.core.vel = FixedVec2::from_ints(8, 0);
        // 2 units missing to 10, force 5: only the missing part is added
        apply_speedup(&mut actor, SpeedupTile { force: 5, max_speed: 50, angle: 0 });
        assert_eq!(actor.core.vel, FixedVec2::from_ints(10, 0));

        // Already faster than the target: pushed back by the force
        actor.core.vel = FixedVec2::from_ints(30, 0);
        apply_speedup(&mut actor, SpeedupTile { force: 5, max_speed: 50, angle: 0 });
        assert_eq!(actor.core.vel, FixedVec2::from_ints(25, 0));
    }

    #[test]
    fn test_speedup_unbounded_adds_force() {
        let mut actor = Actor::new(ActorId(0), FixedVec2::ZERO, &GameConfig::default(), 0);
        apply_speedup(&mut actor, SpeedupTile { force: 3, max_speed: 0, angle: 0 });
        assert_eq!(actor.core.vel, FixedVec2::from_ints(3, 0));
    }

    #[test]
    fn test_no_cell_clears_latches() {
        let mut world = world_with(|_| {});
        let mut actor = actor_at(&world, 0, 3, 3);
        actor.latch.time_penalty = true;
        actor.latch.refill_jumps = true;
        handle_tile(&mut world, &mut actor, None);
        assert_eq!(actor.latch, TileLatch::default());
    }

    #[test]
    fn test_notices_on_flag_changes() {
        let mut world = world_with(|b| {
            b.game(3, 3, Tile::new(TileKind::NphDisable));
        });
        let mut actor = actor_at(&world, 0, 3, 3);
        handle_tile(&mut world, &mut actor, index(3, 3));
        assert!(!actor.core.flags.hook_hit);
        assert!(world.events.iter().any(|e| matches!(
            &e.data,
            GameEventData::Notice { text, .. } if text == "You can't hook others"
        )));
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::TuningResync { .. })));
    }

    #[test]
    fn test_tune_zone_messages() {
        let mut world = world_with(|b| {
            b.tune(4, 3, 2);
        });
        world.tuning.enter_messages.insert(2, "Low gravity\\nHave fun".to_string());
        world.tuning.leave_messages.insert(2, "Back to normal".to_string());

        let mut actor = actor_at(&world, 0, 4, 3);
        handle_tune_layer(&mut world, &mut actor);
        assert_eq!(actor.tune_zone, 2);

        actor.core.pos = crate::game::map::tile_center(6, 3);
        handle_tune_layer(&mut world, &mut actor);
        assert_eq!(actor.tune_zone, 0);

        let texts: Vec<&str> = world
            .events
            .iter()
            .filter_map(|e| match &e.data {
                GameEventData::ZoneMessage { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Low gravity", "Have fun", "Back to normal"]);

        // Same zone again: nothing new
        let before = world.events.len();
        handle_tune_layer(&mut world, &mut actor);
        assert_eq!(world.events.len(), before);
    }

    #[test]
    fn test_ascii_map_rules() {
        let map = TileMap::from_ascii("ascii", "#####\n#.F.#\n#####\n").expect("valid map");
        let mut world = GameWorld::new(map, GameConfig::default(), TuningTable::default()).expect("valid world");
        world.tick = 500;
        let mut actor = Actor::new(ActorId(0), crate::game::map::tile_center(2, 1), &world.config, 500);
        actor.prev_pos = crate::game::map::tile_center(1, 1);
        assert!(process_path(&mut world, &mut actor));
        assert_eq!(actor.freeze_time, 150);
    }
}
