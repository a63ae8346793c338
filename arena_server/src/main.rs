//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p arena_server -- [--config server.json] [--addr 127.0.0.1:4433]
//!                                [--tick-hz 20] [--speed 200] [--max-sessions 64]
//!
//! The server accepts sessions, runs the fixed-rate loop, and broadcasts a
//! snapshot of every entity each tick. Ctrl-C stops the loop and exits.

use std::env;

use anyhow::Context;
use arena_server::GameServer;
use arena_shared::config::EngineConfig;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<EngineConfig> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = &args[i + 1];
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config {path}"))?;
            EngineConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))?
        }
        _ => EngineConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().context("--tick-hz")?;
                i += 2;
            }
            "--speed" if i + 1 < args.len() => {
                cfg.move_speed = args[i + 1].parse().context("--speed")?;
                i += 2;
            }
            "--max-sessions" if i + 1 < args.len() => {
                cfg.max_sessions = args[i + 1].parse().context("--max-sessions")?;
                i += 2;
            }
            "--config" => i += 2,
            other => {
                warn!(arg = %other, "Ignoring unknown argument");
                i += 1;
            }
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        addr = %cfg.server_addr,
        tick_hz = cfg.tick_hz,
        speed = cfg.move_speed,
        max_sessions = cfg.max_sessions,
        "Starting server"
    );

    let mut server = GameServer::bind(cfg).await.context("create server")?;
    info!(local = %server.local_addr(), "Server listening");
    server.start()?;

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("Interrupted, shutting down");
    server.shutdown().await
}
