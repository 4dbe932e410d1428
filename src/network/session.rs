//! Session Runner
//!
//! Drives a `GameWorld` at a fixed rate. Commands arrive over an mpsc
//! channel and are applied at the start of the next tick; every tick
//! publishes a `WorldSnapshot` on a broadcast channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Serialize, Deserialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};

use crate::game::config::{ConfigError, GameConfig};
use crate::game::input::InputRecording;
use crate::game::lifecycle;
use crate::game::map::TileMap;
use crate::game::movement::ActorId;
use crate::game::snapshot::{snapshot_for, ShowOthers};
use crate::game::tick::tick;
use crate::game::tuning::TuningTable;
use crate::game::world::{GameWorld, WorldError};
use crate::network::protocol::{ClientCommand, WorldSnapshot};

/// Configuration for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Pending command capacity.
    pub command_capacity: usize,
    /// Snapshots kept for slow subscribers.
    pub snapshot_capacity: usize,
    /// Server rules; defaults when absent.
    pub game_config_path: Option<PathBuf>,
    /// Tuning table; defaults when absent.
    pub tuning_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_SPEED,
            command_capacity: 1024,
            snapshot_capacity: 64,
            game_config_path: None,
            tuning_path: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        if config.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Server rules from `game_config_path`.
    pub fn game_config(&self) -> Result<GameConfig, ConfigError> {
        match &self.game_config_path {
            Some(path) => GameConfig::load(path),
            None => Ok(GameConfig::default()),
        }
    }

    /// Tuning from `tuning_path`.
    pub fn tuning(&self) -> Result<TuningTable, ConfigError> {
        match &self.tuning_path {
            Some(path) => TuningTable::load(path),
            None => Ok(TuningTable::default()),
        }
    }

    fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session is gone.
    #[error("session channel closed")]
    ChannelClosed,

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Sending side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<ClientCommand>,
    snapshots: broadcast::Sender<WorldSnapshot>,
    shutdown: broadcast::Sender<()>,
}

impl SessionHandle {
    /// Queue a command for the next tick.
    pub async fn send(&self, command: ClientCommand) -> Result<(), SessionError> {
        self.commands.send(command).await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldSnapshot> {
        self.snapshots.subscribe()
    }

    /// Stop the tick loop after the current tick.
    pub fn shutdown(&self) {
        // No receiver means the loop already stopped
        let _ = self.shutdown.send(());
    }
}

/// A world plus the channels that drive it.
pub struct GameSession {
    world: GameWorld,
    config: SessionConfig,
    commands: mpsc::Receiver<ClientCommand>,
    snapshots: broadcast::Sender<WorldSnapshot>,
    shutdown: broadcast::Sender<()>,
    /// Inputs as applied, per actor.
    recordings: BTreeMap<ActorId, InputRecording>,
}

impl GameSession {
    /// Session over an existing world.
    pub fn new(world: GameWorld, config: SessionConfig) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::channel(config.command_capacity.max(1));
        let (snapshots, _) = broadcast::channel(config.snapshot_capacity.max(1));
        let (shutdown, _) = broadcast::channel(1);

        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshots.clone(),
            shutdown: shutdown.clone(),
        };
        let session = Self {
            world,
            config,
            commands,
            snapshots,
            shutdown,
            recordings: BTreeMap::new(),
        };
        (session, handle)
    }

    /// Session on a map with rules and tuning from the configured paths.
    pub fn load(map: TileMap, config: SessionConfig) -> Result<(Self, SessionHandle), SessionError> {
        let world = GameWorld::new(map, config.game_config()?, config.tuning()?)?;
        Ok(Self::new(world, config))
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    /// Input history of every actor that sent input.
    pub fn recordings(&self) -> &BTreeMap<ActorId, InputRecording> {
        &self.recordings
    }

    /// Apply one command. Failures are logged and dropped.
    fn apply(&mut self, command: ClientCommand) {
        let actor = command.actor();
        let next_tick = self.world.tick + 1;
        let result = match command {
            ClientCommand::Input { actor, input } => {
                let applied = lifecycle::set_input(&mut self.world, actor, input);
                if applied.is_ok() {
                    self.recordings
                        .entry(actor)
                        .or_insert_with(|| InputRecording::new(actor, next_tick))
                        .record(next_tick, input.sanitized());
                }
                applied
            }
            ClientCommand::Spawn { actor } => lifecycle::spawn(&mut self.world, actor, None),
            ClientCommand::Kill { actor } => lifecycle::kill(&mut self.world, actor),
            ClientCommand::Pause { actor } => lifecycle::set_paused(&mut self.world, actor, true),
            ClientCommand::Resume { actor } => lifecycle::set_paused(&mut self.world, actor, false),
            ClientCommand::Rescue { actor } => lifecycle::rescue(&mut self.world, actor).map(|_| ()),
            ClientCommand::SetTeam { actor, team } => lifecycle::set_team(&mut self.world, actor, team),
        };
        if let Err(e) = result {
            warn!(actor = actor.0, error = %e, "command rejected");
        }
    }

    /// Apply pending commands, run one tick and publish the snapshot.
    pub fn step(&mut self) -> WorldSnapshot {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }

        let result = tick(&mut self.world);
        let snapshot = WorldSnapshot {
            tick: self.world.tick,
            state_hash: self.world.state_hash(),
            actors: self.world.summaries(),
            characters: snapshot_for(&self.world, None, ShowOthers::All),
            resyncs: result.resyncs,
            events: result.events,
        };
        // Nobody listening is fine
        let _ = self.snapshots.send(snapshot.clone());
        snapshot
    }

    /// Tick at the configured rate until shutdown. Returns the world and
    /// the input recordings.
    pub async fn run(mut self) -> (GameWorld, BTreeMap<ActorId, InputRecording>) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(map = %self.world.map.name, rate = self.config.tick_rate, "session started");

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.step();
                }
                _ = shutdown_rx.recv() => {
                    info!(tick = self.world.tick, "shutdown signal received");
                    break;
                }
            }
        }
        (self.world, self.recordings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::PlayerInput;

    fn create_test_session() -> (GameSession, SessionHandle) {
        let map = TileMap::from_ascii(
            "session",
            "############\n\
             #..........#\n\
             #.@......@.#\n\
             ############\n",
        )
        .unwrap();
        GameSession::load(map, SessionConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_commands_apply_on_next_step() {
        let (mut session, handle) = create_test_session();
        handle.send(ClientCommand::Spawn { actor: ActorId(0) }).await.unwrap();
        handle.send(ClientCommand::Spawn { actor: ActorId(1) }).await.unwrap();
        handle
            .send(ClientCommand::Input { actor: ActorId(0), input: PlayerInput::walking(1) })
            .await
            .unwrap();

        let snapshot = session.step();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.actors.len(), 2);
        assert_eq!(snapshot.characters.characters.len(), 2);
        assert_eq!(session.recordings()[&ActorId(0)].input_at(1), PlayerInput::walking(1));
    }

    #[tokio::test]
    async fn test_rejected_command_is_dropped() {
        let (mut session, handle) = create_test_session();
        handle.send(ClientCommand::Kill { actor: ActorId(5) }).await.unwrap();
        let snapshot = session.step();
        assert!(snapshot.actors.is_empty());
        assert!(session.recordings().is_empty());
    }

    #[tokio::test]
    async fn test_run_publishes_until_shutdown() {
        let (session, handle) = create_test_session();
        let mut snapshots = handle.subscribe();
        handle.send(ClientCommand::Spawn { actor: ActorId(0) }).await.unwrap();

        let runner = tokio::spawn(session.run());
        let first = snapshots.recv().await.unwrap();
        let second = snapshots.recv().await.unwrap();
        assert_eq!(second.tick, first.tick + 1);

        handle.shutdown();
        let (world, _) = runner.await.unwrap();
        assert!(world.tick >= 2);
        assert!(world.actor(ActorId(0)).is_some());
    }

    #[test]
    fn test_config_json() {
        let config = SessionConfig::from_json(r#"{"tick_rate": 25}"#).unwrap();
        assert_eq!(config.tick_rate, 25);
        assert_eq!(config.command_capacity, 1024);
        assert!(SessionConfig::from_json(r#"{"tick_rate": 0}"#).is_err());
    }
}
