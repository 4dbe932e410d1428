//! Server Rules Configuration
//!
//! Gameplay switches that are not physics tuning: freeze length, rescue,
//! team policy and teleporter behavior. Loaded from JSON at startup.

use std::path::Path;

use serde::{Serialize, Deserialize};

/// How teams are treated by the rule engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamPolicy {
    /// Teams cannot be joined; everyone races in the flock.
    Off,
    /// Teams are optional.
    #[default]
    Optional,
    /// A run can only be started inside a team of at least two.
    Mandatory,
    /// Every actor races in a team of its own.
    ForcedSolo,
}

impl TeamPolicy {
    /// Whether a team id should be treated as one unit (shared time, rescue).
    pub fn treats_as_unit(self, team: u8) -> bool {
        use crate::game::teams::{TEAM_FLOCK, TEAM_SUPER};
        (self == TeamPolicy::ForcedSolo || team != TEAM_FLOCK) && team != TEAM_SUPER
    }
}

/// Errors raised while loading configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid JSON for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its accepted range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Server rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Default freeze length in seconds.
    pub freeze_delay: i32,
    /// Rescue is allowed outside teams.
    pub rescue: bool,
    /// Minimum seconds between two rescues.
    pub rescue_delay: i32,
    /// Team policy.
    pub team_policy: TeamPolicy,
    /// Legacy teleporters that keep the hook attached across the jump.
    pub old_teleport_hook: bool,
    /// Legacy teleporters that let weapons through.
    pub old_teleport_weapons: bool,
    /// Keep the hook when teleported.
    pub teleport_hold_hook: bool,
    /// Strip non-default weapons when teleported.
    pub teleport_lose_weapons: bool,
    /// Strip non-default weapons when crossing the start line.
    pub reset_pickups_on_start: bool,
    /// Actors spawn able to hit others.
    pub hit: bool,
    /// Actors spawn with endless hook.
    pub endless_drag: bool,
    /// Deep-frozen actors may still fire the hammer.
    pub deepfly: bool,
    /// Super actors always have endless hook.
    pub endless_super_hook: bool,
    /// Gun on a jetpack actor does not shoot projectiles.
    pub ninja_jetpack: bool,
    /// Seed for teleporter destination picking.
    pub rng_seed: u64,
    /// Maximum seconds between two full state broadcasts.
    pub reckoning_ceiling_secs: i32,
    /// Allow held fire on the tick an actor thaws.
    pub unfreeze_fire_grace: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            freeze_delay: 3,
            rescue: false,
            rescue_delay: 1,
            team_policy: TeamPolicy::Optional,
            old_teleport_hook: false,
            old_teleport_weapons: false,
            teleport_hold_hook: false,
            teleport_lose_weapons: false,
            reset_pickups_on_start: false,
            hit: true,
            endless_drag: false,
            deepfly: true,
            endless_super_hook: false,
            ninja_jetpack: false,
            rng_seed: 0,
            reckoning_ceiling_secs: 3,
            unfreeze_fire_grace: true,
        }
    }
}

impl GameConfig {
    /// Parse from a JSON string and validate.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.freeze_delay < 1 {
            return Err(ConfigError::Invalid(format!(
                "freeze_delay must be at least 1 second, got {}",
                self.freeze_delay
            )));
        }
        if self.rescue_delay < 0 {
            return Err(ConfigError::Invalid("rescue_delay must not be negative".into()));
        }
        if self.reckoning_ceiling_secs < 1 {
            return Err(ConfigError::Invalid("reckoning_ceiling_secs must be positive".into()));
        }
        Ok(())
    }

    /// Reckoning ceiling in ticks.
    pub fn reckoning_ceiling_ticks(&self) -> i64 {
        self.reckoning_ceiling_secs as i64 * crate::TICK_SPEED as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reckoning_ceiling_ticks(), 150);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GameConfig::from_json(r#"{ "freeze_delay": 5, "team_policy": "mandatory" }"#)
            .expect("valid config");
        assert_eq!(config.freeze_delay, 5);
        assert_eq!(config.team_policy, TeamPolicy::Mandatory);
        assert!(config.hit);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GameConfig::from_json(r#"{ "freeze_delay": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GameConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_team_policy_unit() {
        use crate::game::teams::{TEAM_FLOCK, TEAM_SUPER};
        assert!(!TeamPolicy::Optional.treats_as_unit(TEAM_FLOCK));
        assert!(TeamPolicy::Optional.treats_as_unit(3));
        assert!(TeamPolicy::ForcedSolo.treats_as_unit(TEAM_FLOCK));
        assert!(!TeamPolicy::ForcedSolo.treats_as_unit(TEAM_SUPER));
    }

    #[test]
    fn test_json_round_trip_keeps_fields() {
        let mut config = GameConfig::default();
        config.rescue = true;
        config.rng_seed = 99;
        let text = config.to_json().expect("serialize");
        assert_eq!(GameConfig::from_json(&text).expect("parse"), config);
    }
}
