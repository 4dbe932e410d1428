//! Tile Race Server
//!
//! Runs a demo session on a built-in map, then replays the recorded inputs
//! on a fresh world and checks that both end in the same state hash.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tile_race::{
    ActorId, PlayerInput, TileMap, TICK_SPEED, VERSION,
    game::{
        events::GameEventData,
        tick::replay,
    },
    network::{ClientCommand, GameSession, SessionConfig},
};

const DEMO_MAP: &str = "\
########################################
#......................................#
#......................................#
#..........#####.......................#
#....................xxxx..............#
#..@..@......................F.....E...#
#.S........U..........##...............#
########################################
";

const DEMO_SECONDS: u64 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Tile Race Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_SPEED);

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(&path).with_context(|| format!("loading session config {path}"))?,
        None => SessionConfig::default(),
    };
    let map = TileMap::from_ascii("demo", DEMO_MAP)?;
    let (session, handle) = GameSession::load(map.clone(), config.clone())?;
    let mut snapshots = handle.subscribe();

    let actors = [ActorId(0), ActorId(1)];
    for actor in actors {
        handle.send(ClientCommand::Spawn { actor }).await?;
    }

    let runner = tokio::spawn(session.run());
    let script = tokio::spawn({
        let handle = handle.clone();
        async move {
            // Run right, jumping every second; the second actor hooks up-right
            for step in 0..(DEMO_SECONDS * u64::from(TICK_SPEED) / 10) {
                let jump = step % 5 == 0;
                let walk = PlayerInput { direction: 1, jump, ..PlayerInput::idle() };
                let hook = PlayerInput { direction: 1, target_x: 100, target_y: -100, hook: step % 4 < 2, ..PlayerInput::idle() };
                if handle.send(ClientCommand::Input { actor: ActorId(0), input: walk }).await.is_err()
                    || handle.send(ClientCommand::Input { actor: ActorId(1), input: hook }).await.is_err()
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            handle.shutdown();
        }
    });

    drop(handle);

    let mut total_events = 0;
    loop {
        let snapshot = match snapshots.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Snapshot reader lagged, {} skipped", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        total_events += snapshot.events.len();
        for event in &snapshot.events {
            match &event.data {
                GameEventData::Kill { victim, .. } => info!("Actor {} died", victim.0),
                GameEventData::RaceFinished { actor, ticks, .. } => {
                    info!("Actor {} finished in {} ticks", actor.0, ticks)
                }
                GameEventData::Notice { actor, text } => info!("[{}] {}", actor.0, text),
                _ => {}
            }
        }
        if snapshot.tick % (5 * TICK_SPEED as i64) == 0 {
            info!("Tick {}: {} actors, hash {}", snapshot.tick, snapshot.actors.len(), &snapshot.hash_hex()[..16]);
        }
    }
    script.await?;
    let (world, recordings) = runner.await?;

    let hash = world.state_hash();
    info!("Ticks: {}, events: {}", world.tick, total_events);
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let recordings: Vec<_> = recordings.into_values().collect();
    let (replayed, _) = replay(map, config.game_config()?, config.tuning()?, &recordings, world.tick)?;
    let replay_hash = replayed.state_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
