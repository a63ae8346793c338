//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--addr 127.0.0.1:4433] [--tick-hz 20] [--ticks N]
//!
//! A bot: connects, joins, and wanders by holding a random direction that
//! changes every second. Snapshots are logged occasionally.

use std::env;
use std::time::Duration;

use anyhow::Context;
use arena_client::{input::InputState, GameClient};
use arena_shared::config::EngineConfig;
use rand::Rng;
use tracing::info;

struct Args {
    cfg: EngineConfig,
    ticks: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut cfg = EngineConfig::default();
    let mut ticks = None;
    let args: Vec<String> = env::args().collect();
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
            "--ticks" if i + 1 < args.len() => {
                ticks = Some(args[i + 1].parse().context("--ticks")?);
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(Args { cfg, ticks })
}

fn random_input(rng: &mut impl Rng) -> InputState {
    InputState {
        left: rng.gen_bool(0.3),
        right: rng.gen_bool(0.3),
        up: rng.gen_bool(0.3),
        down: rng.gen_bool(0.3),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let Args { cfg, ticks } = parse_args()?;
    cfg.validate()?;
    info!(server = %cfg.server_addr, tick_hz = cfg.tick_hz, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;
    info!(uid = %client.uid, "Connected to server");

    let tick_interval = cfg.tick_interval();
    let ticks_per_turn = u64::from(cfg.tick_hz.max(1));
    let mut rng = rand::thread_rng();
    let mut input = random_input(&mut rng);
    let mut interval = tokio::time::interval(tick_interval);
    let mut n = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = interval.tick() => {}
        }

        if n % ticks_per_turn == 0 {
            input = random_input(&mut rng);
        }
        client.tick(input).await?;

        if let Some(snap) = client.latest_snapshot(Duration::from_millis(5)).await? {
            if n % ticks_per_turn == 0 {
                let me = snap.find(client.uid).map(|s| (s.x, s.y));
                info!(tick = n, entities = snap.states.len(), position = ?me, "Snapshot");
            }
        }

        n += 1;
        if ticks.is_some_and(|t| n >= t) {
            break;
        }
    }

    Ok(())
}
