//! Physics and Weapon Tuning
//!
//! Per-tick tunables read by the movement core and the ability subsystem.
//! A map may override the global table per tune zone; zone 0 always
//! means "use the global table".

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::core::fixed::{serde_decimal, to_fixed, Fixed, FIXED_ONE};
use crate::game::config::ConfigError;
use crate::game::weapon::Weapon;

/// Tunable parameters. Speeds are units per tick, delays are milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParams {
    #[serde(with = "serde_decimal")]
    pub ground_control_speed: Fixed,
    #[serde(with = "serde_decimal")]
    pub ground_control_accel: Fixed,
    #[serde(with = "serde_decimal")]
    pub ground_friction: Fixed,
    #[serde(with = "serde_decimal")]
    pub ground_jump_impulse: Fixed,
    #[serde(with = "serde_decimal")]
    pub air_jump_impulse: Fixed,
    #[serde(with = "serde_decimal")]
    pub air_control_speed: Fixed,
    #[serde(with = "serde_decimal")]
    pub air_control_accel: Fixed,
    #[serde(with = "serde_decimal")]
    pub air_friction: Fixed,
    #[serde(with = "serde_decimal")]
    pub hook_length: Fixed,
    #[serde(with = "serde_decimal")]
    pub hook_fire_speed: Fixed,
    #[serde(with = "serde_decimal")]
    pub hook_drag_accel: Fixed,
    #[serde(with = "serde_decimal")]
    pub hook_drag_speed: Fixed,
    /// Seconds an actor hook lasts (1.25 = stock).
    #[serde(with = "serde_decimal")]
    pub hook_duration: Fixed,
    #[serde(with = "serde_decimal")]
    pub gravity: Fixed,
    /// Speed (units per second) above which horizontal movement is damped.
    #[serde(with = "serde_decimal")]
    pub velramp_start: Fixed,
    #[serde(with = "serde_decimal")]
    pub velramp_range: Fixed,
    #[serde(with = "serde_decimal")]
    pub velramp_curvature: Fixed,
    /// Seconds.
    #[serde(with = "serde_decimal")]
    pub gun_lifetime: Fixed,
    /// Seconds.
    #[serde(with = "serde_decimal")]
    pub grenade_lifetime: Fixed,
    #[serde(with = "serde_decimal")]
    pub laser_reach: Fixed,
    #[serde(with = "serde_decimal")]
    pub jetpack_strength: Fixed,
    #[serde(with = "serde_decimal")]
    pub hammer_strength: Fixed,
    #[serde(with = "serde_decimal")]
    pub hammer_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub gun_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub shotgun_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub grenade_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub laser_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub ninja_fire_delay: Fixed,
    #[serde(with = "serde_decimal")]
    pub hammer_hit_fire_delay: Fixed,
    pub player_collision: bool,
    pub player_hooking: bool,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            ground_control_speed: to_fixed(10.0),
            ground_control_accel: to_fixed(2.0),
            ground_friction: to_fixed(0.5),
            ground_jump_impulse: to_fixed(13.2),
            air_jump_impulse: to_fixed(12.0),
            air_control_speed: to_fixed(5.0),
            air_control_accel: to_fixed(1.5),
            air_friction: to_fixed(0.95),
            hook_length: to_fixed(380.0),
            hook_fire_speed: to_fixed(80.0),
            hook_drag_accel: to_fixed(3.0),
            hook_drag_speed: to_fixed(15.0),
            hook_duration: to_fixed(1.25),
            gravity: to_fixed(0.5),
            velramp_start: to_fixed(550.0),
            velramp_range: to_fixed(2000.0),
            velramp_curvature: to_fixed(1.4),
            gun_lifetime: to_fixed(2.0),
            grenade_lifetime: to_fixed(2.0),
            laser_reach: to_fixed(800.0),
            jetpack_strength: to_fixed(400.0),
            hammer_strength: FIXED_ONE,
            hammer_fire_delay: to_fixed(125.0),
            gun_fire_delay: to_fixed(125.0),
            shotgun_fire_delay: to_fixed(500.0),
            grenade_fire_delay: to_fixed(500.0),
            laser_fire_delay: to_fixed(800.0),
            ninja_fire_delay: to_fixed(800.0),
            hammer_hit_fire_delay: to_fixed(320.0),
            player_collision: true,
            player_hooking: true,
        }
    }
}

/// Milliseconds to whole ticks, truncating.
#[inline]
pub fn ms_to_ticks(ms: Fixed) -> i32 {
    ((ms as i64 * crate::TICK_SPEED as i64 / 1000) >> 16) as i32
}

impl TuningParams {
    /// Fire delay for a weapon, in milliseconds.
    pub fn fire_delay_ms(&self, weapon: Weapon) -> Fixed {
        match weapon {
            Weapon::Hammer => self.hammer_fire_delay,
            Weapon::Gun => self.gun_fire_delay,
            Weapon::Shotgun => self.shotgun_fire_delay,
            Weapon::Grenade => self.grenade_fire_delay,
            Weapon::Laser => self.laser_fire_delay,
            Weapon::Ninja => self.ninja_fire_delay,
        }
    }

    /// Reload ticks after firing a weapon.
    pub fn fire_delay_ticks(&self, weapon: Weapon) -> i32 {
        ms_to_ticks(self.fire_delay_ms(weapon))
    }

    /// Reload ticks after a hammer connected.
    pub fn hammer_hit_delay_ticks(&self) -> i32 {
        ms_to_ticks(self.hammer_hit_fire_delay)
    }
}

/// Global tuning plus per-zone overrides and zone messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningTable {
    /// Zone 0.
    pub global: TuningParams,
    /// Overrides for zones 1..=255.
    pub zones: BTreeMap<u8, TuningParams>,
    /// Text sent when an actor enters a zone. Lines separated by a literal `\n`.
    pub enter_messages: BTreeMap<u8, String>,
    /// Text sent when an actor leaves a zone.
    pub leave_messages: BTreeMap<u8, String>,
}

impl TuningTable {
    /// Parse from JSON.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let table: TuningTable = serde_json::from_str(text)?;
        if table.zones.contains_key(&0) {
            return Err(ConfigError::Invalid("zone 0 is the global table".into()));
        }
        Ok(table)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parameters for a zone. Zone 0 and unknown zones use the global table.
    pub fn params(&self, zone: u8) -> &TuningParams {
        if zone == 0 {
            return &self.global;
        }
        self.zones.get(&zone).unwrap_or(&self.global)
    }

    /// Mutable access to a zone's parameters, creating it from the global table.
    pub fn zone_mut(&mut self, zone: u8) -> &mut TuningParams {
        if zone == 0 {
            return &mut self.global;
        }
        let global = &self.global;
        self.zones.entry(zone).or_insert_with(|| global.clone())
    }

    /// Lines of the enter message for a zone.
    pub fn enter_lines(&self, zone: u8) -> Vec<String> {
        split_message(self.enter_messages.get(&zone))
    }

    /// Lines of the leave message for a zone.
    pub fn leave_lines(&self, zone: u8) -> Vec<String> {
        split_message(self.leave_messages.get(&zone))
    }
}

fn split_message(text: Option<&String>) -> Vec<String> {
    match text {
        Some(text) if !text.is_empty() => text.split("\\n").map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_ticks() {
        let tuning = TuningParams::default();
        assert_eq!(tuning.fire_delay_ticks(Weapon::Gun), 6);
        assert_eq!(tuning.fire_delay_ticks(Weapon::Shotgun), 25);
        assert_eq!(tuning.fire_delay_ticks(Weapon::Laser), 40);
        assert_eq!(tuning.hammer_hit_delay_ticks(), 16);
    }

    #[test]
    fn test_zone_lookup() {
        let mut table = TuningTable::default();
        table.zone_mut(3).gravity = to_fixed(0.25);

        assert_eq!(table.params(0).gravity, to_fixed(0.5));
        assert_eq!(table.params(3).gravity, to_fixed(0.25));
        // Unknown zones fall back to global
        assert_eq!(table.params(9).gravity, to_fixed(0.5));
    }

    #[test]
    fn test_zone_messages_split_on_literal_newline() {
        let mut table = TuningTable::default();
        table.enter_messages.insert(2, "Low gravity\\nHold on".to_string());
        assert_eq!(table.enter_lines(2), vec!["Low gravity", "Hold on"]);
        assert!(table.leave_lines(2).is_empty());
    }

    #[test]
    fn test_json_tuning_zone() {
        let table = TuningTable::from_json(
            r#"{ "zones": { "1": { "gravity": 0.25, "player_collision": false } } }"#,
        )
        .expect("valid table");
        assert_eq!(table.params(1).gravity, to_fixed(0.25));
        assert!(!table.params(1).player_collision);
        assert_eq!(table.params(1).hook_length, to_fixed(380.0));

        assert!(TuningTable::from_json(r#"{ "zones": { "0": {} } }"#).is_err());
    }
}
