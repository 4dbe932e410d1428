//! World Tick
//!
//! The authoritative simulation loop. Each tick runs every phase over all
//! actors in ascending slot order before the next phase starts, so effects an
//! actor has on shared tables are seen by every actor processed after it.

use tracing::debug;

use crate::core::vec2::FixedVec2;
use crate::game::ability::handle_weapons;
use crate::game::actor::Actor;
use crate::game::config::GameConfig;
use crate::game::events::{GameEvent, GameEventData, SoundKind};
use crate::game::input::InputRecording;
use crate::game::lifecycle::{die, rescue_allowed, set_input, spawn};
use crate::game::map::{TileKind, TileMap};
use crate::game::movement::{ActorId, CoreEvents, CoreWorld, PHYS_SIZE};
use crate::game::reckoning::ResyncReason;
use crate::game::save::SaveState;
use crate::game::tiles::{handle_tune_layer, process_path};
use crate::game::tuning::TuningTable;
use crate::game::world::{GameWorld, WorldError};

/// What happened during one tick.
#[derive(Clone, Debug, Default)]
pub struct TickResult {
    /// Events in delivery order.
    pub events: Vec<GameEvent>,
    /// Actors whose broadcast core was replaced this tick.
    pub resyncs: Vec<(ActorId, ResyncReason)>,
    /// Actors that died this tick.
    pub deaths: Vec<ActorId>,
}

impl TickResult {
    /// Whether `id` was resynced this tick.
    pub fn resynced(&self, id: ActorId) -> bool {
        self.resyncs.iter().any(|(actor, _)| *actor == id)
    }
}

/// Execute one simulation tick.
///
/// # Determinism
///
/// This function is deterministic given:
/// - Same world state
/// - Same stored inputs
/// - Same configuration and tuning
///
/// Actors are processed in ascending slot order in every phase.
pub fn tick(world: &mut GameWorld) -> TickResult {
    let mut result = TickResult::default();

    // 0. Advance tick counter
    world.tick += 1;
    let now = world.tick;

    // 1. Expire timed switches
    let expired = world.switches.expire(now);
    if !expired.is_empty() {
        debug!(tick = now, count = expired.len(), "switches expired");
    }

    if world.paused {
        for actor in world.actors_mut() {
            actor.tick_paused();
        }
        result.events = world.events.drain_sorted();
        return result;
    }

    let ids = world.actor_ids();

    // 2. Input, freeze countdown and core physics
    for &id in &ids {
        let Some(mut actor) = world.take_actor(id) else {
            continue;
        };
        if !actor.paused {
            pre_tick(world, &mut actor);
        }
        world.put_actor(actor);
    }

    // 3. Move against the map and the actors already moved
    for &id in &ids {
        let Some(mut actor) = world.take_actor(id) else {
            continue;
        };
        if !actor.paused {
            move_actor(world, &mut actor);
        }
        world.put_actor(actor);
    }

    // 4. Tile rules and weapons
    for &id in &ids {
        let Some(mut actor) = world.take_actor(id) else {
            continue;
        };
        if actor.paused {
            world.put_actor(actor);
            continue;
        }
        if post_core(world, &mut actor) {
            world.put_actor(actor);
        } else {
            die(world, actor, id, None);
            result.deaths.push(id);
        }
    }

    // 5. Quantize, cues, reconciliation and overlay targets
    for &id in &ids {
        let Some(mut actor) = world.take_actor(id) else {
            continue;
        };
        if actor.paused {
            actor.tick_paused();
        } else if let Some(reason) = deferred(world, &mut actor) {
            result.resyncs.push((id, reason));
        }
        world.put_actor(actor);
    }

    // 6. Step the overlay
    if let Some(overlay) = world.overlay.as_mut() {
        overlay.step();
    }

    result.events = world.events.drain_sorted();
    result
}

fn pre_tick(world: &mut GameWorld, actor: &mut Actor) {
    let id = actor.id();
    let now = world.tick;

    let mut input = actor.saved_input;
    actor.armor = if actor.freeze_time >= 0 { (10 - actor.freeze_time / 15).max(0) } else { 0 };
    if input.direction != 0 || input.jump {
        actor.last_move = now;
    }

    if actor.freeze_time > 0 || actor.freeze_time == -1 {
        let per_second = crate::TICK_SPEED as i32;
        if actor.freeze_time % per_second == per_second - 1 || actor.freeze_time == -1 {
            let mask = world.team_mask_of(id, false);
            world.emit(GameEventData::DamageIndicator {
                pos: actor.pos(),
                amount: (actor.freeze_time + 1) / per_second,
                mask,
            });
        }
        if actor.freeze_time > 0 {
            actor.freeze_time -= 1;
        } else {
            actor.ninja.activation_tick = now;
        }
        input.direction = 0;
        input.jump = false;
        input.hook = false;
        if actor.freeze_time == 1 {
            actor.unfreeze();
        }
    }
    actor.input = input;

    handle_tune_layer(world, actor);

    let index = world.map.clamped_index(actor.pos());
    let in_freeze = [world.map.game_tile(index).kind, world.map.front_tile(index).kind]
        .iter()
        .any(|kind| matches!(kind, TileKind::Freeze | TileKind::DeepFreeze));
    if rescue_allowed(world, id) && !in_freeze && !actor.deep_freeze && actor.core.is_grounded(&world.map) {
        actor.rescue = Some(Box::new(SaveState::capture(actor)));
    }

    let others = world.other_cores(id);
    let drag = {
        let team = world.teams.team(id);
        let core_world = CoreWorld { map: &world.map, doors: world.doors(team), others: &others };
        let tuning = world.tuning_for(actor.tune_zone);
        actor.core.tick(Some(&input), tuning, &core_world)
    };
    if let Some(drag) = drag {
        if let Some(target) = world.actor_mut(drag.target) {
            target.core.apply_drag(&drag);
        }
    }
}

fn move_actor(world: &mut GameWorld, actor: &mut Actor) {
    let id = actor.id();
    actor.prev_pos = actor.pos();
    let was_stuck = world.map.test_box(actor.pos(), PHYS_SIZE);

    let others = world.other_cores(id);
    let team = world.teams.team(id);
    let core_world = CoreWorld { map: &world.map, doors: world.doors(team), others: &others };
    actor.core.move_step(world.tuning_for(actor.tune_zone), &core_world);
    actor.core.quantize();

    if !was_stuck && world.map.test_box(actor.pos(), PHYS_SIZE) {
        debug!(actor = id.0, x = actor.pos().x >> 16, y = actor.pos().y >> 16, "actor stuck in solid");
    }
}

/// Returns false when the actor must die.
fn post_core(world: &mut GameWorld, actor: &mut Actor) -> bool {
    let now = world.tick;
    let is_super = actor.is_super();

    if actor.core.flags.endless_hook || (is_super && world.config.endless_super_hook) {
        actor.core.hook_tick = 0;
    }
    if actor.deep_freeze && !is_super {
        actor.freeze(world.config.freeze_delay, now);
    }

    let core = &mut actor.core;
    if core.jumps == 0 && !is_super {
        core.jumped = 3;
    } else if core.jumps == 1 && core.jumped > 0 {
        core.jumped = 3;
    } else if core.jumped_total < core.jumps - 1 && core.jumped > 1 {
        core.jumped = 1;
    }
    if (is_super || actor.super_jump) && actor.core.jumped > 1 {
        actor.core.jumped = 1;
    }

    if !process_path(world, actor) {
        return false;
    }

    if let Some(request) = actor.telegun.take() {
        apply_telegun(world, actor, request.pos, request.keep_velocity);
    }

    handle_weapons(world, actor);
    actor.frozen_last_tick = false;
    actor.prev_input = actor.input;
    true
}

fn apply_telegun(world: &mut GameWorld, actor: &mut Actor, dest: FixedVec2, keep_velocity: bool) {
    let id = actor.id();
    let mask = world.team_mask_of(id, false);
    world.emit(GameEventData::DeathEffect { actor: id, pos: actor.pos(), mask });

    actor.core.pos = dest;
    actor.prev_pos = dest;
    if !keep_velocity {
        actor.core.vel = FixedVec2::ZERO;
    }
    actor.core.reset = true;

    world.emit(GameEventData::DeathEffect { actor: id, pos: dest, mask });
    world.emit(GameEventData::Sound { kind: SoundKind::WeaponSpawn, pos: dest, mask });
}

fn deferred(world: &mut GameWorld, actor: &mut Actor) -> Option<ResyncReason> {
    let id = actor.id();
    let now = world.tick;
    actor.core.quantize();

    let pos = actor.pos();
    let mask = world.team_mask_of(id, true);
    let cues = [
        (CoreEvents::GROUND_JUMP, SoundKind::PlayerJump),
        (CoreEvents::HOOK_ATTACH_ACTOR, SoundKind::HookAttachPlayer),
        (CoreEvents::HOOK_ATTACH_WORLD, SoundKind::HookAttachGround),
        (CoreEvents::HOOK_HIT_NOTHING, SoundKind::HookNoAttach),
    ];
    for (bit, kind) in cues {
        if actor.core.events.has(bit) {
            world.emit(GameEventData::Sound { kind, pos, mask });
        }
    }

    let reason = {
        let team = world.teams.team(id);
        let alone = CoreWorld::alone(&world.map, world.doors(team));
        let tuning = world.tuning_for(actor.tune_zone);
        let ceiling = world.config.reckoning_ceiling_ticks();
        actor.reckoning.update(&mut actor.core, now, ceiling, tuning, &alone)
    };

    if let Some(overlay) = world.overlay.as_mut() {
        overlay.set_target(id, (pos + actor.hammer_swing.offset()).to_floats());
    }
    actor.hammer_swing.advance();
    reason
}

/// Replay recorded inputs on a fresh world.
///
/// Every recorded actor spawns at a map spawn point before the first tick.
/// Returns the world after `ticks` ticks and all events in order.
pub fn replay(
    map: TileMap,
    config: GameConfig,
    tuning: TuningTable,
    recordings: &[InputRecording],
    ticks: i64,
) -> Result<(GameWorld, Vec<GameEvent>), WorldError> {
    let mut world = GameWorld::new(map, config, tuning)?;
    for recording in recordings {
        spawn(&mut world, recording.actor, None)?;
    }

    let mut all_events = Vec::new();
    for _ in 0..ticks {
        let next = world.tick + 1;
        for recording in recordings {
            if next < recording.start_tick || world.actor(recording.actor).is_none() {
                continue;
            }
            set_input(&mut world, recording.actor, recording.input_at(next))?;
        }
        all_events.extend(tick(&mut world).events);
    }
    Ok((world, all_events))
}
