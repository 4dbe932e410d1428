//! Team-Scoped Switches
//!
//! Every switch number has an independent status per team. Untouched
//! switches are active. Timed entries flip back when their end tick passes.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

/// Last action written to a switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchAction {
    #[default]
    Open,
    TimedOpen,
    TimedClose,
    Close,
}

/// State of one switch for one team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSlot {
    pub status: bool,
    /// Expiry tick for timed actions, 0 otherwise.
    pub end_tick: i64,
    pub action: SwitchAction,
    pub last_update: i64,
}

impl Default for SwitchSlot {
    fn default() -> Self {
        Self { status: true, end_tick: 0, action: SwitchAction::Open, last_update: 0 }
    }
}

/// Shared switch table keyed by (switch number, team).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SwitchState {
    /// Highest switch number on the map plus one.
    count: u16,
    slots: BTreeMap<(u8, u8), SwitchSlot>,
}

impl SwitchState {
    /// Table for a map with switch numbers `0..count`.
    pub fn new(count: u16) -> Self {
        Self { count: count.min(256), slots: BTreeMap::new() }
    }

    /// Number of switches.
    #[inline]
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Slot of a switch for a team.
    pub fn slot(&self, number: u8, team: u8) -> SwitchSlot {
        self.slots.get(&(number, team)).copied().unwrap_or_default()
    }

    /// Whether the switch is active for a team.
    #[inline]
    pub fn is_active(&self, number: u8, team: u8) -> bool {
        self.slot(number, team).status
    }

    /// Write an action. Timed actions end at `end_tick`.
    pub fn apply(&mut self, number: u8, team: u8, action: SwitchAction, end_tick: i64, now: i64) {
        let status = matches!(action, SwitchAction::Open | SwitchAction::TimedOpen);
        let end_tick = match action {
            SwitchAction::TimedOpen | SwitchAction::TimedClose => end_tick,
            SwitchAction::Open | SwitchAction::Close => 0,
        };
        self.slots.insert(
            (number, team),
            SwitchSlot { status, end_tick, action, last_update: now },
        );
    }

    /// Flip back every timed switch whose end tick has passed.
    ///
    /// Returns the `(number, team)` pairs that changed.
    pub fn expire(&mut self, now: i64) -> Vec<(u8, u8)> {
        let mut changed = Vec::new();
        for (key, slot) in self.slots.iter_mut() {
            if slot.end_tick == 0 || slot.end_tick > now {
                continue;
            }
            match slot.action {
                SwitchAction::TimedOpen => {
                    slot.status = false;
                    slot.action = SwitchAction::Close;
                }
                SwitchAction::TimedClose => {
                    slot.status = true;
                    slot.action = SwitchAction::Open;
                }
                SwitchAction::Open | SwitchAction::Close => continue,
            }
            slot.end_tick = 0;
            slot.last_update = now;
            changed.push(*key);
        }
        changed
    }

    /// Status bits of every switch for a team, 32 switches per word.
    pub fn status_words(&self, team: u8) -> [u32; 8] {
        let mut words = [0u32; 8];
        for number in 0..self.count {
            if self.is_active(number as u8, team) {
                words[number as usize / 32] |= 1 << (number % 32);
            }
        }
        words
    }

    /// Up to four running timers of a team as `(number, end_tick)`.
    pub fn running_timers(&self, team: u8, now: i64) -> Vec<(u8, i64)> {
        self.slots
            .iter()
            .filter(|((_, t), slot)| *t == team && slot.end_tick > now)
            .map(|((number, _), slot)| (*number, slot.end_tick))
            .take(4)
            .collect()
    }
}
