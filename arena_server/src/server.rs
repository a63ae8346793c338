//! Server assembly.
//!
//! Wires the reference transport to the game loop:
//! - `Acceptor` turns TCP streams into sessions and session events;
//! - `GameLoop` owns the `Simulation` and runs it at the configured tick rate.
//!
//! The acceptor keeps queueing while the loop is stopped; queued events are
//! handled once it starts again.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use arena_shared::config::EngineConfig;
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    events::channels,
    hooks::{NullHooks, TickHooks},
    lifecycle::GameLoop,
    simulation::{SimConfig, Simulation},
    transport::Acceptor,
};

pub struct GameServer {
    pub cfg: EngineConfig,
    game_loop: GameLoop,
    acceptor: Option<Acceptor>,
    acceptor_task: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl GameServer {
    /// Binds the listener. Nothing runs until `start`.
    pub async fn bind(cfg: EngineConfig) -> anyhow::Result<Self> {
        Self::bind_with_hooks(cfg, NullHooks).await
    }

    pub async fn bind_with_hooks(
        cfg: EngineConfig,
        hooks: impl TickHooks + 'static,
    ) -> anyhow::Result<Self> {
        cfg.validate().context("invalid config")?;
        let addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;

        let (senders, sources) = channels();
        let acceptor = Acceptor::bind(addr, senders, cfg.outbound_capacity).await?;
        let local_addr = acceptor.local_addr()?;

        let sim = Simulation::new(SimConfig::from(&cfg)).with_hooks(hooks);
        let game_loop = GameLoop::new(sim, sources, cfg.tick_interval());

        Ok(Self {
            cfg,
            game_loop,
            acceptor: Some(acceptor),
            acceptor_task: None,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn game_loop(&self) -> &GameLoop {
        &self.game_loop
    }

    /// Starts the loop and, the first time, the acceptor.
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.game_loop.start()?;
        if let Some(acceptor) = self.acceptor.take() {
            self.acceptor_task = Some(tokio::spawn(acceptor.run()));
        }
        info!(addr = %self.local_addr, tick_hz = self.cfg.tick_hz, "Server running");
        Ok(())
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.game_loop.stop().await?;
        Ok(())
    }

    pub async fn restart(&mut self) -> anyhow::Result<()> {
        self.game_loop.restart().await?;
        Ok(())
    }

    /// Stops accepting and stops the loop.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(task) = self.acceptor_task.take() {
            task.abort();
        }
        if self.game_loop.is_running() {
            self.game_loop.stop().await?;
        }
        info!("Server shut down");
        Ok(())
    }
}

/// Helper for tests: bind to an ephemeral localhost port.
pub async fn bind_ephemeral(tick_hz: u32) -> anyhow::Result<(GameServer, EngineConfig)> {
    let cfg = EngineConfig {
        server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).to_string(),
        tick_hz,
        ..Default::default()
    };
    let server = GameServer::bind(cfg).await?;

    let mut cfg = server.cfg.clone();
    cfg.server_addr = server.local_addr().to_string();
    Ok((server, cfg))
}
