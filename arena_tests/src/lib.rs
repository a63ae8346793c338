//! Shared harness for the socket-level tests.

use std::net::SocketAddr;

use arena_server::{server::bind_ephemeral, GameServer};
use arena_shared::config::EngineConfig;

/// Installs a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Binds a server on an ephemeral localhost port and starts it.
pub async fn spawn_server(tick_hz: u32) -> anyhow::Result<(GameServer, SocketAddr)> {
    let (mut server, _cfg) = bind_ephemeral(tick_hz).await?;
    server.start()?;
    let addr = server.local_addr();
    Ok((server, addr))
}

/// Like `spawn_server`, with a custom config (address is forced to localhost:0).
pub async fn spawn_server_with(mut cfg: EngineConfig) -> anyhow::Result<(GameServer, SocketAddr)> {
    cfg.server_addr = "127.0.0.1:0".to_string();
    let mut server = GameServer::bind(cfg).await?;
    server.start()?;
    let addr = server.local_addr();
    Ok((server, addr))
}
