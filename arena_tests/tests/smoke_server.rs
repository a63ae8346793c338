use std::time::Duration;

use arena_server::{scheduler::LoopState, GameServer};
use arena_shared::config::EngineConfig;
use arena_tests::spawn_server;

/// Smoke test: the loop ticks, stops, and restarts without any sessions.
#[tokio::test]
async fn server_runs_stops_and_restarts() -> anyhow::Result<()> {
    let (mut server, _addr) = spawn_server(64).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    server.stop().await?;
    assert_eq!(server.game_loop().state(), LoopState::Stopped);
    let ticks = server
        .game_loop()
        .simulation()
        .map(|s| s.status().tick)
        .unwrap_or_default();
    assert!(ticks > 0, "expected the loop to have ticked");

    server.restart().await?;
    assert!(server.game_loop().is_running());
    server.shutdown().await?;
    Ok(())
}

/// A tick rate too fast to schedule is refused before anything is bound.
#[tokio::test]
async fn unschedulable_tick_rate_is_refused() {
    let cfg = EngineConfig {
        server_addr: "127.0.0.1:0".to_string(),
        tick_hz: u32::MAX,
        ..Default::default()
    };
    assert!(GameServer::bind(cfg).await.is_err());
}
