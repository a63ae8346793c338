//! Events flowing from the transport into the loop.
//!
//! Producers only ever enqueue; the loop is the single consumer. Both queues
//! are unbounded FIFOs. Capping them (and signalling overload back to the
//! transport) belongs in `EventSenders` if it is ever needed.

use arena_shared::net::ParticipantId;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::sink::SharedSink;

/// A newly accepted session.
#[derive(Debug)]
pub struct Connection {
    pub sink: SharedSink,
    /// Receives the assigned id. Dropped unanswered when the session is rejected.
    pub assigned: Option<oneshot::Sender<ParticipantId>>,
}

impl Connection {
    pub fn new(sink: SharedSink) -> Self {
        Self {
            sink,
            assigned: None,
        }
    }

    /// Like `new`, plus a receiver that resolves to the assigned id.
    pub fn with_reply(sink: SharedSink) -> (Self, oneshot::Receiver<ParticipantId>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sink,
                assigned: Some(tx),
            },
            rx,
        )
    }
}

/// Something that happened on an established session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Raw inbound payload. `from` is the session it arrived on, when known.
    Message {
        from: Option<ParticipantId>,
        payload: Bytes,
    },
    /// The session is gone.
    Closed { id: ParticipantId },
}

/// Producer side, cloned into the acceptor and every session listener.
#[derive(Debug, Clone)]
pub struct EventSenders {
    pub connections: mpsc::UnboundedSender<Connection>,
    pub events: mpsc::UnboundedSender<SessionEvent>,
}

/// Consumer side, owned by the loop.
#[derive(Debug)]
pub struct EventSources {
    pub connections: mpsc::UnboundedReceiver<Connection>,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

pub fn channels() -> (EventSenders, EventSources) {
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        EventSenders {
            connections: conn_tx,
            events: event_tx,
        },
        EventSources {
            connections: conn_rx,
            events: event_rx,
        },
    )
}
