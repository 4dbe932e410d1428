//! Actor Lifecycle
//!
//! Spawning, death, pausing, rescue and team changes. These are the
//! operations a host calls between ticks.

use tracing::{info, warn};

use crate::core::vec2::FixedVec2;
use crate::game::actor::{Actor, TelegunRequest};
use crate::game::config::TeamPolicy;
use crate::game::events::{GameEventData, SoundKind};
use crate::game::input::PlayerInput;
use crate::game::map::TileMap;
use crate::game::movement::{ActorId, MAX_ACTORS, PHYS_SIZE};
use crate::game::teams::{TEAM_FLOCK, TEAM_SUPER};
use crate::game::tiles::{handle_tune_layer, send_tuning_if_changed};
use crate::game::weapon::Weapon;
use crate::game::world::{GameWorld, WorldError};

/// Chooses where actors appear.
pub trait SpawnResolver {
    /// Position for an actor of `team`. `occupied` holds the positions of
    /// live actors the newcomer could collide with.
    fn resolve(&self, map: &TileMap, team: u8, occupied: &[FixedVec2]) -> Option<FixedVec2>;
}

/// First free spawn point of the map, or the first one if all are taken.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapSpawns;

impl SpawnResolver for MapSpawns {
    fn resolve(&self, map: &TileMap, _team: u8, occupied: &[FixedVec2]) -> Option<FixedVec2> {
        let spawns = map.spawns();
        let free = spawns.iter().find(|spawn| {
            occupied
                .iter()
                .all(|pos| pos.distance_squared_wide(**spawn) >= (PHYS_SIZE as i64 * PHYS_SIZE as i64) as u64)
        });
        free.or_else(|| spawns.first()).copied()
    }
}

fn check_slot(id: ActorId) -> Result<(), WorldError> {
    if id.index() >= MAX_ACTORS {
        return Err(WorldError::InvalidSlot(id.0));
    }
    Ok(())
}

fn occupied_by_team(world: &GameWorld, team: u8) -> Vec<FixedVec2> {
    world
        .actors()
        .filter(|other| {
            let other_team = world.teams.team(other.id());
            other_team == team || other_team == TEAM_SUPER || team == TEAM_SUPER
        })
        .map(Actor::pos)
        .collect()
}

/// Spawn an actor. Without a position the spawn resolver picks one.
pub fn spawn(world: &mut GameWorld, id: ActorId, pos: Option<FixedVec2>) -> Result<(), WorldError> {
    check_slot(id)?;
    if !world.slot_free(id)? {
        return Err(WorldError::SlotOccupied(id.0));
    }

    let team = world.teams.team(id);
    let pos = match pos {
        Some(pos) => pos,
        None => {
            let occupied = occupied_by_team(world, team);
            world
                .spawner
                .resolve(&world.map, team, &occupied)
                .ok_or(WorldError::NoSpawn)?
        }
    };

    let now = world.tick;
    let mut actor = Actor::new(id, pos, &world.config, now);
    actor.core.flags.solo = world.teams.is_solo(id);
    actor.core.flags.is_super = team == TEAM_SUPER;

    // Joining a running team run inherits its clock
    if team != TEAM_FLOCK && world.teams.is_locked(team) {
        let running = world
            .teams
            .members(team)
            .filter_map(|mate| world.actor(mate))
            .map(|mate| (mate.race, mate.start_tick))
            .last();
        if let Some((race, start_tick)) = running {
            actor.race = race;
            actor.start_tick = start_tick;
        }
    }

    world.teams.set_present(id, true);
    if world.config.team_policy == TeamPolicy::Mandatory && team == TEAM_FLOCK {
        world.notify(id, "Please join a team before you start");
    }

    handle_tune_layer(world, &mut actor);
    send_tuning_if_changed(world, &mut actor);
    if let Some(overlay) = world.overlay.as_mut() {
        overlay.attach(id, pos.to_floats());
    }

    info!(actor = id.0, team, x = pos.x >> 16, y = pos.y >> 16, "actor spawned");
    world.put_actor(actor);
    Ok(())
}

/// Kill an actor: kill feed, sound, death effect, then the slot is freed.
pub(crate) fn die(world: &mut GameWorld, actor: Actor, killer: ActorId, weapon: Option<Weapon>) {
    let id = actor.id();
    let pos = actor.pos();
    let mask = world.team_mask_of(id, false);

    world.emit(GameEventData::Kill { victim: id, killer, weapon });
    world.emit(GameEventData::Sound { kind: SoundKind::PlayerDie, pos, mask });
    world.emit(GameEventData::DeathEffect { actor: id, pos, mask });

    world.release_hooks_on(id);
    world.teams.set_present(id, false);
    if let Some(overlay) = world.overlay.as_mut() {
        overlay.detach(id);
    }
    info!(actor = id.0, killer = killer.0, "actor died");
}

/// Self-kill requested by the user.
pub fn kill(world: &mut GameWorld, id: ActorId) -> Result<(), WorldError> {
    check_slot(id)?;
    let actor = world.take_actor(id).ok_or(WorldError::UnknownActor(id.0))?;
    die(world, actor, id, None);
    Ok(())
}

/// Remove an actor without a kill event, e.g. when its user leaves.
pub fn remove(world: &mut GameWorld, id: ActorId) -> Result<(), WorldError> {
    check_slot(id)?;
    world.clear_slot(id).ok_or(WorldError::UnknownActor(id.0))?;
    world.release_hooks_on(id);
    world.teams.set_present(id, false);
    if let Some(overlay) = world.overlay.as_mut() {
        overlay.detach(id);
    }
    info!(actor = id.0, "actor removed");
    Ok(())
}

/// Take an actor out of the simulation or put it back.
///
/// A paused actor neither moves nor interacts. Its hook on another actor is
/// dropped and hooks on it are released. Resuming leaves its state as it was.
pub fn set_paused(world: &mut GameWorld, id: ActorId, paused: bool) -> Result<(), WorldError> {
    check_slot(id)?;
    let actor = world.actor_mut(id).ok_or(WorldError::UnknownActor(id.0))?;
    if actor.paused == paused {
        return Ok(());
    }
    actor.paused = paused;
    if paused {
        if actor.core.hook.hooked_actor().is_some() {
            actor.core.retract_hook();
        }
        world.release_hooks_on(id);
    }
    info!(actor = id.0, paused, "pause state changed");
    Ok(())
}

/// Whether an actor may rescue itself under the current rules.
pub fn rescue_allowed(world: &GameWorld, id: ActorId) -> bool {
    let team = world.teams.team(id);
    world.config.rescue || (team != TEAM_SUPER && world.teams.policy().treats_as_unit(team))
}

/// Return an actor to its last safe position. A rescue also unpauses.
///
/// Returns false when no position is saved, the actor is super or the
/// rate limit has not passed; the latter sends a notice.
pub fn rescue(world: &mut GameWorld, id: ActorId) -> Result<bool, WorldError> {
    check_slot(id)?;
    let now = world.tick;
    let delay = world.config.rescue_delay as i64 * crate::TICK_SPEED as i64;
    let actor = world.actor_mut(id).ok_or(WorldError::UnknownActor(id.0))?;

    let Some(save) = actor.rescue.clone() else {
        return Ok(false);
    };
    if actor.is_super() {
        return Ok(false);
    }
    if let Some(last) = actor.last_rescue {
        let ready = last + delay;
        if ready > now {
            let seconds = (ready - now + crate::TICK_SPEED as i64 - 1) / crate::TICK_SPEED as i64;
            world.notify(id, format!("You have to wait {seconds} seconds until you can rescue yourself"));
            return Ok(false);
        }
    }

    save.restore_for_rescue(actor);
    actor.last_rescue = Some(now);
    info!(actor = id.0, "actor rescued");
    set_paused(world, id, false)?;
    Ok(true)
}

/// Move an actor to a team.
pub fn set_team(world: &mut GameWorld, id: ActorId, team: u8) -> Result<(), WorldError> {
    check_slot(id)?;
    let current = world.teams.team(id);
    if current == team {
        return Ok(());
    }
    if current != TEAM_FLOCK && world.teams.is_locked(current) && world.actor(id).is_some() {
        warn!(actor = id.0, team = current, "team change refused, team is locked");
        return Err(WorldError::TeamLocked(current));
    }
    world.teams.set_team(id, team)?;
    if let Some(actor) = world.actor_mut(id) {
        actor.core.reset = true;
    }
    info!(actor = id.0, from = current, to = team, "team changed");
    Ok(())
}

/// Toggle super mode: the actor joins the super team and leaves it for
/// the team it was in before.
pub fn set_super(world: &mut GameWorld, id: ActorId, enabled: bool) -> Result<(), WorldError> {
    check_slot(id)?;
    let mut actor = world.take_actor(id).ok_or(WorldError::UnknownActor(id.0))?;
    let result = apply_super(world, &mut actor, enabled);
    world.put_actor(actor);
    result
}

fn apply_super(world: &mut GameWorld, actor: &mut Actor, enabled: bool) -> Result<(), WorldError> {
    let id = actor.id();
    if actor.is_super() == enabled {
        return Ok(());
    }
    if enabled {
        actor.team_before_super = world.teams.team(id);
        world.teams.set_team(id, TEAM_SUPER)?;
        actor.unfreeze();
        actor.deep_freeze = false;
    } else {
        world.teams.set_team(id, actor.team_before_super)?;
    }
    actor.core.flags.is_super = enabled;
    actor.core.reset = true;
    send_tuning_if_changed(world, actor);
    info!(actor = id.0, enabled, "super mode changed");
    Ok(())
}

/// Store fresh input for the next tick.
pub fn set_input(world: &mut GameWorld, id: ActorId, input: PlayerInput) -> Result<(), WorldError> {
    check_slot(id)?;
    let now = world.tick;
    let actor = world.actor_mut(id).ok_or(WorldError::UnknownActor(id.0))?;
    actor.on_input(input, now);
    Ok(())
}

/// Give a weapon or, for ninja, activate the dash ability.
pub fn give_weapon(world: &mut GameWorld, id: ActorId, weapon: Weapon, ammo: i32) -> Result<bool, WorldError> {
    check_slot(id)?;
    let now = world.tick;
    let actor = world.actor_mut(id).ok_or(WorldError::UnknownActor(id.0))?;
    let fresh = if weapon == Weapon::Ninja {
        let fresh = !actor.inventory.has(Weapon::Ninja);
        actor.give_ninja(now);
        fresh
    } else {
        actor.give_weapon(weapon, ammo)
    };
    if fresh {
        let pos = actor.pos();
        let mask = world.team_mask_of(id, false);
        world.emit(GameEventData::Sound { kind: SoundKind::WeaponSpawn, pos, mask });
    }
    Ok(fresh)
}

/// Teleport requested by a teleport projectile. Applied on the next tick.
pub fn request_telegun(world: &mut GameWorld, id: ActorId, pos: FixedVec2, keep_velocity: bool) -> Result<(), WorldError> {
    check_slot(id)?;
    let actor = world.actor_mut(id).ok_or(WorldError::UnknownActor(id.0))?;
    actor.telegun = Some(TelegunRequest { pos, keep_velocity });
    Ok(())
}
