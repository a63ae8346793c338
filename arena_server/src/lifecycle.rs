//! Start/stop/restart of the game loop as a background task.
//!
//! The loop task owns the simulation while it runs and returns it when it
//! stops, so a restart resumes with the same sessions, entities and id counter.

use std::time::Duration;

use tokio::{sync::oneshot, task::JoinHandle};
use tracing::info;

use crate::{
    error::LoopError,
    events::EventSources,
    scheduler::{self, LoopState},
    simulation::Simulation,
};

struct RunningLoop {
    stop: oneshot::Sender<()>,
    task: JoinHandle<(Simulation, EventSources)>,
}

pub struct GameLoop {
    tick_interval: Duration,
    idle: Option<(Simulation, EventSources)>,
    running: Option<RunningLoop>,
}

impl GameLoop {
    pub fn new(sim: Simulation, sources: EventSources, tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            idle: Some((sim, sources)),
            running: None,
        }
    }

    pub fn state(&self) -> LoopState {
        if self.running.is_some() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// The simulation, while the loop is stopped.
    pub fn simulation(&self) -> Option<&Simulation> {
        self.idle.as_ref().map(|(sim, _)| sim)
    }

    /// Spawns the loop on the current runtime.
    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.running.is_some() {
            return Err(LoopError::AlreadyRunning);
        }
        let (sim, sources) = self.idle.take().ok_or(LoopError::StateLost)?;
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(scheduler::run(sim, sources, self.tick_interval, stop_rx));
        self.running = Some(RunningLoop {
            stop: stop_tx,
            task,
        });
        Ok(())
    }

    /// Signals the loop and waits until it has left its dispatch cycle.
    pub async fn stop(&mut self) -> Result<(), LoopError> {
        let RunningLoop { stop, task } = self.running.take().ok_or(LoopError::NotRunning)?;
        // The task only exits on this signal, so a failed send means it died.
        let _ = stop.send(());
        let (sim, sources) = task.await?;
        info!(tick = sim.status().tick, "Game loop joined");
        self.idle = Some((sim, sources));
        Ok(())
    }

    /// Stops the loop if it is running, then starts it again.
    pub async fn restart(&mut self) -> Result<(), LoopError> {
        if self.is_running() {
            self.stop().await?;
        }
        self.start()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arena_shared::net::{
        encode_client, ClientMessage, InputCommand, Keys, Mouse, ParticipantId, ServerMessage,
    };
    use bytes::Bytes;
    use tokio::time::sleep;

    use super::*;
    use crate::{
        events::{channels, Connection, EventSenders, SessionEvent},
        simulation::SimConfig,
        sink::testing::RecordingSink,
    };

    const TICK: Duration = Duration::from_millis(100);

    fn game_loop() -> (GameLoop, EventSenders) {
        let (senders, sources) = channels();
        let sim = Simulation::new(SimConfig {
            move_speed: 200.0,
            max_sessions: 8,
        });
        (GameLoop::new(sim, sources, TICK), senders)
    }

    async fn connect(senders: &EventSenders) -> (ParticipantId, Arc<RecordingSink>) {
        let sink = RecordingSink::shared();
        let (conn, reply) = Connection::with_reply(sink.clone());
        senders.connections.send(conn).unwrap();
        (reply.await.unwrap(), sink)
    }

    fn send(senders: &EventSenders, from: ParticipantId, msg: ClientMessage) {
        senders
            .events
            .send(SessionEvent::Message {
                from: Some(from),
                payload: encode_client(&msg).unwrap(),
            })
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn start_stop_state_machine() {
        let (mut gl, _senders) = game_loop();
        assert_eq!(gl.state(), LoopState::Stopped);
        assert!(matches!(gl.stop().await, Err(LoopError::NotRunning)));

        gl.start().unwrap();
        assert!(gl.is_running());
        assert!(gl.simulation().is_none());
        assert!(matches!(gl.start(), Err(LoopError::AlreadyRunning)));

        sleep(TICK * 3).await;
        gl.stop().await.unwrap();
        assert_eq!(gl.state(), LoopState::Stopped);
        assert!(gl.simulation().unwrap().status().tick >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn join_scenario_through_the_loop() {
        let (mut gl, senders) = game_loop();
        gl.start().unwrap();

        let (id, sink) = connect(&senders).await;
        assert_eq!(id, ParticipantId(1));
        send(&senders, id, ClientMessage::Request { id });
        send(
            &senders,
            id,
            ClientMessage::Data(InputCommand {
                uid: id,
                tick: 1,
                keys: Keys::RIGHT,
                mouse: Mouse::default(),
            }),
        );

        sleep(TICK + TICK / 2).await;
        let msgs = sink.take();
        assert_eq!(msgs[0], ServerMessage::Offer { uid: id });
        assert_eq!(msgs[1], ServerMessage::Join);
        let ServerMessage::Data(snap) = &msgs[2] else {
            panic!("expected snapshot, got {:?}", msgs[2]);
        };
        assert_eq!(snap.states.len(), 1);
        assert!((snap.states[0].x - 20.0).abs() < 1e-3, "x = {}", snap.states[0].x);
        assert_eq!(snap.states[0].y, 0.0);

        gl.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_bytes_do_not_disturb_the_loop() {
        let (mut gl, senders) = game_loop();
        gl.start().unwrap();
        let (id, sink) = connect(&senders).await;
        send(&senders, id, ClientMessage::Request { id });
        senders
            .events
            .send(SessionEvent::Message {
                from: Some(id),
                payload: Bytes::from_static(b"\x00garbage"),
            })
            .unwrap();

        sleep(TICK * 2 + TICK / 2).await;
        assert!(gl.is_running());
        let snaps: Vec<_> = sink
            .take()
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::Data(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(snaps.len(), 2);
        for snap in snaps {
            assert_eq!(snap.states.len(), 1);
            assert_eq!((snap.states[0].x, snap.states[0].y), (0.0, 0.0));
        }
        gl.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_broadcasts() {
        let (mut gl, senders) = game_loop();
        gl.start().unwrap();
        let (_id, sink) = connect(&senders).await;
        sleep(TICK * 2).await;
        gl.stop().await.unwrap();

        let before = sink.take().len();
        assert!(before >= 2);
        sleep(TICK * 5).await;
        assert!(sink.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_keeps_sessions_and_ids() {
        let (mut gl, senders) = game_loop();
        gl.start().unwrap();
        let (first, _sink) = connect(&senders).await;
        sleep(TICK).await;

        gl.restart().await.unwrap();
        assert!(gl.is_running());
        let (second, _sink2) = connect(&senders).await;
        assert_eq!(first, ParticipantId(1));
        assert_eq!(second, ParticipantId(2));

        gl.stop().await.unwrap();
        assert_eq!(gl.simulation().unwrap().sessions().len(), 2);

        // Restart from stopped simply starts.
        gl.restart().await.unwrap();
        gl.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_leaves_next_snapshot() {
        let (mut gl, senders) = game_loop();
        gl.start().unwrap();
        let (a, sink_a) = connect(&senders).await;
        let (b, _sink_b) = connect(&senders).await;
        send(&senders, a, ClientMessage::Request { id: a });
        send(&senders, b, ClientMessage::Request { id: b });
        sleep(TICK + TICK / 2).await;
        sink_a.take();

        senders.events.send(SessionEvent::Closed { id: b }).unwrap();
        sleep(TICK).await;
        let last = sink_a.take().pop().unwrap();
        let ServerMessage::Data(snap) = last else {
            panic!("expected snapshot");
        };
        let ids: Vec<_> = snap.states.iter().map(|s| s.uid).collect();
        assert_eq!(ids, vec![a]);
        gl.stop().await.unwrap();
    }
}
