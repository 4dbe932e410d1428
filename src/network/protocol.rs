//! Protocol Messages
//!
//! Commands a host feeds into a running session and the snapshot it
//! publishes every tick. All messages serialize to JSON for debugging ease,
//! with binary (bincode) for production.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::events::GameEvent;
use crate::game::input::PlayerInput;
use crate::game::movement::ActorId;
use crate::game::reckoning::ResyncReason;
use crate::game::snapshot::ObserverSnapshot;
use crate::game::world::ActorSummary;

// =============================================================================
// HOST -> SESSION
// =============================================================================

/// Commands applied at the start of the next tick, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientCommand {
    /// Fresh input for an actor.
    Input { actor: ActorId, input: PlayerInput },

    /// Spawn at a spawn point.
    Spawn { actor: ActorId },

    /// Self-kill.
    Kill { actor: ActorId },

    Pause { actor: ActorId },

    Resume { actor: ActorId },

    /// Return to the last safe position.
    Rescue { actor: ActorId },

    /// Join a team. Refused while the current team is locked.
    SetTeam { actor: ActorId, team: u8 },
}

impl ClientCommand {
    /// Actor the command is about.
    pub fn actor(&self) -> ActorId {
        match *self {
            Self::Input { actor, .. }
            | Self::Spawn { actor }
            | Self::Kill { actor }
            | Self::Pause { actor }
            | Self::Resume { actor }
            | Self::Rescue { actor }
            | Self::SetTeam { actor, .. } => actor,
        }
    }
}

// =============================================================================
// SESSION -> HOST
// =============================================================================

/// Everything a host needs after one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick just simulated.
    pub tick: i64,
    /// Hash of the authoritative state after the tick.
    pub state_hash: StateHash,
    pub actors: Vec<ActorSummary>,
    /// Unfiltered character view.
    pub characters: ObserverSnapshot,
    pub resyncs: Vec<(ActorId, ResyncReason)>,
    pub events: Vec<GameEvent>,
}

impl WorldSnapshot {
    /// Hex form of the state hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.state_hash)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientCommand {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let cmd = ClientCommand::SetTeam { actor: ActorId(4), team: 7 };
        let json = cmd.to_json().unwrap();
        assert_eq!(json, r#"{"set_team":{"actor":4,"team":7}}"#);
        assert_eq!(ClientCommand::from_json(&json).unwrap(), cmd);
    }

    #[test]
    fn test_binary_serialization_input() {
        let cmd = ClientCommand::Input {
            actor: ActorId(1),
            input: PlayerInput { direction: -1, jump: true, ..PlayerInput::idle() },
        };
        let bytes = cmd.to_bytes().unwrap();
        let parsed = ClientCommand::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, cmd);
        assert_eq!(parsed.actor(), ActorId(1));
    }

    #[test]
    fn test_malformed_command_rejected() {
        assert!(ClientCommand::from_json(r#"{"teleport":{"actor":1}}"#).is_err());
        assert!(ClientCommand::from_json(r#"{"spawn":{"actor":300}}"#).is_err());
    }
}
