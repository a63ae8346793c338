//! Authoritative session state.
//!
//! `Simulation` owns the session registry, the entity store and the input
//! queue. It is driven by exactly one task (see `scheduler`), so none of its
//! state is shared or locked.
//!
//! Per tick:
//! 1. Apply every queued input (`elapsed * speed` per pressed direction).
//! 2. Run the update and collision hooks.
//! 3. Broadcast a full snapshot to every session, in id order.
//!
//! A session whose sink has closed is removed after the broadcast so the
//! remaining sessions still receive it.

use std::time::Duration;

use arena_shared::{
    config::EngineConfig,
    net::{decode_client, encode_server, ClientMessage, ParticipantId, ServerMessage, Snapshot},
};
use tracing::{debug, error, info, warn};

use crate::{
    entities::{Entity, EntityStore},
    error::SimError,
    events::{Connection, SessionEvent},
    hooks::{NullHooks, TickHooks},
    input_queue::InputQueue,
    registry::{IdAllocator, SessionRegistry},
    sink::SinkError,
};

/// Tunables consumed by the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// World units per second for a held direction key.
    pub move_speed: f32,
    pub max_sessions: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for SimConfig {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            move_speed: cfg.move_speed,
            max_sessions: cfg.max_sessions,
        }
    }
}

/// Point-in-time counters, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimStatus {
    pub tick: u64,
    pub sessions: usize,
    pub entities: usize,
    pub queued_inputs: usize,
}

pub struct Simulation {
    cfg: SimConfig,
    sessions: SessionRegistry,
    entities: EntityStore,
    inputs: InputQueue,
    ids: IdAllocator,
    hooks: Box<dyn TickHooks>,
    tick: u64,
}

impl Simulation {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            sessions: SessionRegistry::default(),
            entities: EntityStore::default(),
            inputs: InputQueue::default(),
            ids: IdAllocator::default(),
            hooks: Box::new(NullHooks),
            tick: 0,
        }
    }

    pub fn with_hooks(mut self, hooks: impl TickHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_ids(mut self, ids: IdAllocator) -> Self {
        self.ids = ids;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn status(&self) -> SimStatus {
        SimStatus {
            tick: self.tick,
            sessions: self.sessions.len(),
            entities: self.entities.len(),
            queued_inputs: self.inputs.len(),
        }
    }

    /// Registers a new session and offers it an id.
    ///
    /// On rejection the connection is dropped, which closes its reply channel.
    pub fn on_connection(&mut self, conn: Connection) -> Result<ParticipantId, SimError> {
        let Connection { sink, assigned } = conn;
        if self.sessions.len() >= self.cfg.max_sessions {
            return Err(SimError::SessionLimit {
                max: self.cfg.max_sessions,
            });
        }
        let id = self.ids.allocate()?;
        self.sessions.register(id, sink);
        if let Some(tx) = assigned {
            // The transport may already have given up on this session; its
            // sink will report Closed below.
            let _ = tx.send(id);
        }
        info!(participant = %id, sessions = self.sessions.len(), "Session registered");
        self.send_to(id, &ServerMessage::Offer { uid: id });
        Ok(id)
    }

    pub fn on_event(&mut self, event: SessionEvent) -> Result<(), SimError> {
        match event {
            SessionEvent::Message { from, payload } => self.on_message(from, &payload),
            SessionEvent::Closed { id } => {
                self.remove_participant(id);
                Ok(())
            }
        }
    }

    /// Decodes and handles one inbound payload.
    pub fn on_message(
        &mut self,
        from: Option<ParticipantId>,
        payload: &[u8],
    ) -> Result<(), SimError> {
        match decode_client(payload)? {
            ClientMessage::Data(cmd) => {
                check_sender(from, cmd.uid)?;
                self.inputs.push(cmd);
            }
            ClientMessage::Request { id } => {
                check_sender(from, id)?;
                self.on_join_request(id)?;
            }
            ClientMessage::Unknown { kind } => {
                debug!(kind = %kind, from = ?from, "Ignoring unknown message kind");
            }
        }
        Ok(())
    }

    fn on_join_request(&mut self, id: ParticipantId) -> Result<(), SimError> {
        let sink = self
            .sessions
            .get(id)
            .cloned()
            .ok_or(SimError::UnknownParticipant(id))?;
        if self.entities.contains(id) {
            debug!(participant = %id, "Repeated join request");
        } else {
            self.entities.create(id, 0.0, 0.0, sink);
            info!(participant = %id, entities = self.entities.len(), "Participant joined");
        }
        self.send_to(id, &ServerMessage::Join);
        Ok(())
    }

    /// Drops the session, entity and queued input of `id`.
    pub fn remove_participant(&mut self, id: ParticipantId) -> bool {
        let had_session = self.sessions.remove(id).is_some();
        let had_entity = self.entities.remove(id).is_some();
        self.inputs.discard(id);
        if had_session || had_entity {
            info!(participant = %id, sessions = self.sessions.len(), "Participant removed");
        }
        had_session || had_entity
    }

    /// Advances one tick and broadcasts the resulting snapshot.
    pub fn tick(&mut self, elapsed: Duration) -> Snapshot {
        let dt_sec = elapsed.as_secs_f32();
        self.apply_inputs(dt_sec);
        self.hooks.update(&mut self.entities, dt_sec);
        self.hooks.resolve_collisions(&mut self.entities, dt_sec);

        let snapshot = self.snapshot();
        self.broadcast(&ServerMessage::Data(snapshot.clone()));
        self.tick += 1;
        snapshot
    }

    /// Current state of every entity, in session order.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            states: self
                .sessions
                .all()
                .filter_map(|(id, _)| self.entities.get(id))
                .map(Entity::state)
                .collect(),
        }
    }

    fn apply_inputs(&mut self, dt_sec: f32) {
        let step = dt_sec * self.cfg.move_speed;
        for cmd in self.inputs.drain() {
            let delta = cmd.keys.direction().scale(step);
            if let Err(e) = self.entities.update(cmd.uid, |ent| ent.position += delta) {
                debug!(error = %e, tick = cmd.tick, "Dropping input");
            }
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        let payload = match encode_server(msg) {
            Ok(p) => p,
            Err(e) => {
                let err = SimError::Encode(e);
                error!(error = %err, tick = self.tick, "Snapshot not sent");
                return;
            }
        };

        let mut stale = Vec::new();
        for (id, sink) in self.sessions.all() {
            match sink.send(payload.clone()) {
                Ok(()) => {}
                Err(SinkError::Full) => {
                    warn!(participant = %id, "Outbound queue full, snapshot dropped");
                }
                Err(SinkError::Closed) => stale.push(id),
            }
        }
        for id in stale {
            warn!(participant = %id, "Sink closed during broadcast");
            self.remove_participant(id);
        }
    }

    fn send_to(&mut self, id: ParticipantId, msg: &ServerMessage) {
        let Some(sink) = self.sessions.get(id).cloned() else {
            return;
        };
        let payload = match encode_server(msg) {
            Ok(p) => p,
            Err(e) => {
                let err = SimError::Encode(e);
                error!(participant = %id, error = %err, "Message not sent");
                return;
            }
        };
        match sink.send(payload) {
            Ok(()) => {}
            Err(SinkError::Full) => {
                warn!(participant = %id, "Outbound queue full, message dropped");
            }
            Err(SinkError::Closed) => {
                warn!(participant = %id, "Sink closed");
                self.remove_participant(id);
            }
        }
    }
}

/// A session may only speak for its own participant.
fn check_sender(from: Option<ParticipantId>, claimed: ParticipantId) -> Result<(), SimError> {
    match from {
        Some(actual) if actual != claimed => Err(SimError::ParticipantMismatch { claimed, actual }),
        _ => Ok(()),
    }
}
