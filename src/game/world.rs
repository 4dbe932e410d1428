//! Game World
//!
//! Owns the map, the shared switch and team tables, the actor slots and the
//! event queue of the current tick. All mutation goes through the world-level
//! passes; an actor being processed is taken out of its slot for the duration
//! so the pass can borrow the rest of the world mutably.

use serde::{Serialize, Deserialize};

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::game::actor::Actor;
use crate::game::collision::DoorView;
use crate::game::config::{ConfigError, GameConfig};
use crate::game::events::{EventQueue, GameEvent, GameEventData};
use crate::game::lifecycle::{MapSpawns, SpawnResolver};
use crate::game::map::TileMap;
use crate::game::movement::{ActorId, OtherCore, MAX_ACTORS};
use crate::game::overlay::BodyOverlay;
use crate::game::switch::SwitchState;
use crate::game::teams::Teams;
use crate::game::tuning::{TuningParams, TuningTable};

/// World-level failures.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Slot number outside `0..64`.
    #[error("actor slot {0} out of range")]
    InvalidSlot(u8),

    /// Team id outside `0..=64` or not allowed by the policy.
    #[error("team {0} is not available")]
    InvalidTeam(u8),

    #[error("actor slot {0} is already in use")]
    SlotOccupied(u8),

    #[error("no actor in slot {0}")]
    UnknownActor(u8),

    /// Team changes are refused while the team is locked.
    #[error("team {0} is locked")]
    TeamLocked(u8),

    /// No spawn position could be found.
    #[error("no spawn position available")]
    NoSpawn,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Summary of one actor for hosts and logs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub id: ActorId,
    pub team: u8,
    pub x: i32,
    pub y: i32,
    pub frozen: bool,
    pub paused: bool,
}

/// The simulation.
pub struct GameWorld {
    /// Current tick; the first simulated tick is 1.
    pub tick: i64,
    /// Whole world paused.
    pub paused: bool,
    pub map: TileMap,
    pub config: GameConfig,
    pub tuning: TuningTable,
    pub switches: SwitchState,
    pub teams: Teams,
    pub rng: DeterministicRng,
    pub events: EventQueue,
    actors: Vec<Option<Actor>>,
    pub(crate) spawner: Box<dyn SpawnResolver + Send + Sync>,
    pub(crate) overlay: Option<Box<dyn BodyOverlay + Send + Sync>>,
}

impl std::fmt::Debug for GameWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameWorld")
            .field("map", &self.map.name)
            .field("tick", &self.tick)
            .field("actors", &self.actor_ids().len())
            .finish()
    }
}

impl GameWorld {
    /// World on a map. Spawns come from the map's spawn points.
    pub fn new(map: TileMap, config: GameConfig, tuning: TuningTable) -> Result<Self, WorldError> {
        config.validate()?;
        let switches = SwitchState::new(map.switch_count());
        let teams = Teams::new(config.team_policy);
        let rng = DeterministicRng::for_world(&map.name, config.rng_seed);
        Ok(Self {
            tick: 0,
            paused: false,
            map,
            config,
            tuning,
            switches,
            teams,
            rng,
            events: EventQueue::default(),
            actors: (0..MAX_ACTORS).map(|_| None).collect(),
            spawner: Box::new(MapSpawns),
            overlay: None,
        })
    }

    /// Replace the spawn resolver.
    pub fn with_spawner(mut self, spawner: impl SpawnResolver + Send + Sync + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    /// Attach a cosmetic body overlay.
    pub fn with_overlay(mut self, overlay: impl BodyOverlay + Send + Sync + 'static) -> Self {
        self.overlay = Some(Box::new(overlay));
        self
    }

    /// Overlay position of an actor's body, if an overlay is attached.
    pub fn overlay_position(&self, id: ActorId) -> Option<(f32, f32)> {
        self.overlay.as_ref().and_then(|o| o.position(id))
    }

    #[inline]
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live actors in slot order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter().flatten()
    }

    pub(crate) fn actors_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.iter_mut().flatten()
    }

    /// Ids of live actors in slot order.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors().map(Actor::id).collect()
    }

    /// Take an actor out of its slot. Must be followed by `put_actor`.
    pub(crate) fn take_actor(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.get_mut(id.index()).and_then(Option::take)
    }

    /// Put an actor back into its slot.
    pub(crate) fn put_actor(&mut self, actor: Actor) {
        let index = actor.id().index();
        if let Some(slot) = self.actors.get_mut(index) {
            *slot = Some(actor);
        }
    }

    /// Clear a slot. Returns the actor that was there.
    pub(crate) fn clear_slot(&mut self, id: ActorId) -> Option<Actor> {
        self.take_actor(id)
    }

    pub(crate) fn slot_free(&self, id: ActorId) -> Result<bool, WorldError> {
        self.actors
            .get(id.index())
            .map(Option::is_none)
            .ok_or(WorldError::InvalidSlot(id.0))
    }

    /// Tuning of a zone.
    #[inline]
    pub fn tuning_for(&self, zone: u8) -> &TuningParams {
        self.tuning.params(zone)
    }

    /// Door view for a team.
    #[inline]
    pub fn doors(&self, team: u8) -> DoorView<'_> {
        Some((&self.switches, team))
    }

    /// Visibility mask of `id`'s team, optionally without `id` itself.
    pub fn team_mask_of(&self, id: ActorId, except_self: bool) -> u64 {
        let team = self.teams.team(id);
        self.teams.team_mask(team, except_self.then_some(id))
    }

    /// Queue an event for the current tick.
    #[inline]
    pub fn emit(&mut self, data: GameEventData) {
        self.events.push(GameEvent::new(self.tick, data));
    }

    /// Queue a notice for one actor.
    pub fn notify(&mut self, id: ActorId, text: impl Into<String>) {
        self.events.push(GameEvent::notice(self.tick, id, text));
    }

    /// Other live, unpaused actors as seen by `id`.
    pub fn other_cores(&self, id: ActorId) -> Vec<OtherCore> {
        self.actors()
            .filter(|other| other.id() != id && !other.paused)
            .map(|other| OtherCore {
                id: other.id(),
                pos: other.core.pos,
                can_collide: self.teams.can_collide(id, other.id()),
                collision: other.core.flags.collision,
                is_super: other.core.flags.is_super,
                keep_hook: self.teams.can_keep_hook(id, other.id()),
            })
            .collect()
    }

    /// Every hook holding `id` snaps back.
    pub fn release_hooks_on(&mut self, id: ActorId) {
        for other in self.actors_mut() {
            if other.core.hook.hooked_actor() == Some(id) {
                other.core.retract_hook();
            }
        }
    }

    /// Per-actor summary in slot order.
    pub fn summaries(&self) -> Vec<ActorSummary> {
        self.actors()
            .map(|actor| ActorSummary {
                id: actor.id(),
                team: self.teams.team(actor.id()),
                x: actor.core.pos.x >> 16,
                y: actor.core.pos.y >> 16,
                frozen: actor.is_frozen() || actor.deep_freeze,
                paused: actor.paused,
            })
            .collect()
    }

    /// Hash of the authoritative state.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.config.rng_seed, |hasher| {
            let [a, b] = self.rng.state();
            hasher.update_u64(a);
            hasher.update_u64(b);
            for actor in self.actors() {
                hasher.update_u8(self.teams.team(actor.id()));
                actor.hash_into(hasher);
            }
            for team in 0..=crate::game::teams::TEAM_SUPER {
                for word in self.switches.status_words(team) {
                    hasher.update_u32(word);
                }
            }
        })
    }
}
