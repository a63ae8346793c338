//! The dispatch loop.
//!
//! One task waits on four sources and handles one ready event per wake:
//! stop signal, tick timer, new connections, session events. Stop is checked
//! first so it is never starved. When the timer fires, everything already
//! queued is applied before the tick runs; whatever arrives while the tick is
//! processed waits for the next wake.

use std::time::Duration;

use arena_shared::net::Snapshot;
use tokio::{
    sync::oneshot,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    error::SimError,
    events::{Connection, EventSources, SessionEvent},
    simulation::Simulation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Runs until `stop` fires (or its sender is dropped), then hands the state back.
pub(crate) async fn run(
    mut sim: Simulation,
    mut sources: EventSources,
    tick_interval: Duration,
    mut stop: oneshot::Receiver<()>,
) -> (Simulation, EventSources) {
    let mut ticker = time::interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();
    let mut state = LoopState::Running;
    info!(?tick_interval, status = ?sim.status(), "Game loop running");

    while state == LoopState::Running {
        tokio::select! {
            biased;

            _ = &mut stop => {
                state = LoopState::Stopped;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                on_tick(&mut sim, &mut sources, elapsed);
            }
            Some(conn) = sources.connections.recv() => handle_connection(&mut sim, conn),
            Some(event) = sources.events.recv() => handle_event(&mut sim, event),
        }
    }

    drop(ticker);
    info!(status = ?sim.status(), "Game loop stopped");
    (sim, sources)
}

/// One timer wake: everything already queued, then the tick itself.
fn on_tick(sim: &mut Simulation, sources: &mut EventSources, elapsed: Duration) -> Snapshot {
    drain_queued(sim, sources);
    sim.tick(elapsed)
}

/// Applies what was queued before the tick fired, and nothing newer.
fn drain_queued(sim: &mut Simulation, sources: &mut EventSources) {
    for _ in 0..sources.connections.len() {
        match sources.connections.try_recv() {
            Ok(conn) => handle_connection(sim, conn),
            Err(_) => break,
        }
    }
    for _ in 0..sources.events.len() {
        match sources.events.try_recv() {
            Ok(event) => handle_event(sim, event),
            Err(_) => break,
        }
    }
}

fn handle_connection(sim: &mut Simulation, conn: Connection) {
    if let Err(e) = sim.on_connection(conn) {
        warn!(error = %e, "Connection rejected");
    }
}

fn handle_event(sim: &mut Simulation, event: SessionEvent) {
    match sim.on_event(event) {
        Ok(()) => {}
        Err(e @ (SimError::Decode(_) | SimError::ParticipantMismatch { .. })) => {
            warn!(error = %e, "Dropping message");
        }
        Err(e) => debug!(error = %e, "Message ignored"),
    }
}
