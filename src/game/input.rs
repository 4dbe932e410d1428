//! Input Capture and Normalization
//!
//! Client input is sanitized once at the point of entry so that the
//! movement core never sees out-of-range values or a null aim vector.

use serde::{Serialize, Deserialize};
use crate::game::movement::ActorId;
use crate::game::weapon::NUM_WEAPONS;

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Per-tick input of one actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Horizontal direction: -1 left, 0 none, +1 right.
    pub direction: i32,
    /// Aim, relative to the actor, in whole world units.
    pub target_x: i32,
    /// Aim, relative to the actor, in whole world units (+y is down).
    pub target_y: i32,
    /// Jump button held.
    pub jump: bool,
    /// Hook button held.
    pub hook: bool,
    /// Fire button held.
    pub fire: bool,
    /// Weapon requested by number: 0 = none, 1..=6 = weapon slot + 1.
    pub wanted_weapon: i32,
    /// Next-weapon button held.
    pub next_weapon: bool,
    /// Previous-weapon button held.
    pub prev_weapon: bool,
}

impl Default for PlayerInput {
    fn default() -> Self {
        Self {
            direction: 0,
            target_x: 0,
            target_y: 1,
            jump: false,
            hook: false,
            fire: false,
            wanted_weapon: 0,
            next_weapon: false,
            prev_weapon: false,
        }
    }
}

impl PlayerInput {
    /// Idle input with a straight-down aim.
    pub const fn idle() -> Self {
        Self {
            direction: 0,
            target_x: 0,
            target_y: 1,
            jump: false,
            hook: false,
            fire: false,
            wanted_weapon: 0,
            next_weapon: false,
            prev_weapon: false,
        }
    }

    /// Input walking in a direction.
    pub fn walking(direction: i32) -> Self {
        Self { direction, ..Self::idle() }.sanitized()
    }

    /// Clamp every field to its accepted range.
    ///
    /// A null aim vector is replaced by straight down.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.direction = self.direction.clamp(-1, 1);
        // Aim beyond the map size carries no extra information
        self.target_x = self.target_x.clamp(-32768, 32767);
        self.target_y = self.target_y.clamp(-32768, 32767);
        if self.target_x == 0 && self.target_y == 0 {
            self.target_y = 1;
        }
        if self.wanted_weapon < 0 || self.wanted_weapon > NUM_WEAPONS as i32 {
            self.wanted_weapon = 0;
        }
        self
    }

    /// Fresh press of fire relative to the previous input.
    #[inline]
    pub fn fire_pressed(&self, prev: &PlayerInput) -> bool {
        self.fire && !prev.fire
    }

    /// Fresh press of next-weapon.
    #[inline]
    pub fn next_pressed(&self, prev: &PlayerInput) -> bool {
        self.next_weapon && !prev.next_weapon
    }

    /// Fresh press of previous-weapon.
    #[inline]
    pub fn prev_pressed(&self, prev: &PlayerInput) -> bool {
        self.prev_weapon && !prev.prev_weapon
    }
}

/// Delta-compressed input entry.
///
/// Only stored when input CHANGES (not every tick).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDelta {
    /// Tick when this input state began
    pub tick: i64,
    /// The new input state
    pub input: PlayerInput,
}

// =============================================================================
// INPUT RECORDING
// =============================================================================

/// Complete input history of one actor.
///
/// Used for replay and for determinism checks of the world hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputRecording {
    /// Actor slot
    pub actor: ActorId,

    /// First recorded tick
    pub start_tick: i64,

    /// Last recorded tick
    pub end_tick: i64,

    /// Only ticks where input changed.
    deltas: Vec<InputDelta>,

    #[serde(skip)]
    last_input: Option<PlayerInput>,
}

impl InputRecording {
    /// Create an empty recording.
    pub fn new(actor: ActorId, start_tick: i64) -> Self {
        Self {
            actor,
            start_tick,
            end_tick: start_tick,
            deltas: Vec::with_capacity(256),
            last_input: None,
        }
    }

    /// Record input for a tick. Stored only if it changed.
    pub fn record(&mut self, tick: i64, input: PlayerInput) {
        self.end_tick = tick;
        if self.last_input != Some(input) {
            self.deltas.push(InputDelta { tick, input });
            self.last_input = Some(input);
        }
    }

    /// Input in effect at a tick (idle before the first entry).
    pub fn input_at(&self, tick: i64) -> PlayerInput {
        let idx = self.deltas.partition_point(|d| d.tick <= tick);
        match idx.checked_sub(1).and_then(|i| self.deltas.get(i)) {
            Some(delta) => delta.input,
            None => PlayerInput::idle(),
        }
    }

    /// All stored entries.
    pub fn deltas(&self) -> &[InputDelta] {
        &self.deltas
    }

    /// Number of stored entries.
    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Iterate `(tick, input)` for every tick of the recording.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_tick: self.start_tick,
            delta_idx: 0,
            current: PlayerInput::idle(),
        }
    }

    /// Hash of the whole recording.
    pub fn hash(&self) -> crate::core::StateHash {
        let mut hasher = crate::core::StateHasher::for_input_recording();
        hasher.update_u8(self.actor.0);
        hasher.update_i64(self.start_tick);
        hasher.update_i64(self.end_tick);
        for delta in &self.deltas {
            let i = &delta.input;
            hasher.update_i64(delta.tick);
            hasher.update_i32(i.direction);
            hasher.update_i32(i.target_x);
            hasher.update_i32(i.target_y);
            hasher.update_bool(i.jump);
            hasher.update_bool(i.hook);
            hasher.update_bool(i.fire);
            hasher.update_i32(i.wanted_weapon);
            hasher.update_bool(i.next_weapon);
            hasher.update_bool(i.prev_weapon);
        }
        hasher.finalize()
    }
}

/// Iterator for replaying inputs tick-by-tick.
pub struct ReplayIterator<'a> {
    recording: &'a InputRecording,
    current_tick: i64,
    delta_idx: usize,
    current: PlayerInput,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (i64, PlayerInput);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_tick > self.recording.end_tick {
            return None;
        }

        while let Some(delta) = self.recording.deltas.get(self.delta_idx) {
            if delta.tick > self.current_tick {
                break;
            }
            self.current = delta.input;
            self.delta_idx += 1;
        }

        let result = (self.current_tick, self.current);
        self.current_tick += 1;
        Some(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
