//! Outbound message sinks.
//!
//! A sink is the loop's only handle on a session's outbound direction. The
//! transport owns the other end; the loop never blocks on it.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Why a message could not be handed to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The session's writer is gone; the session is stale.
    #[error("session closed")]
    Closed,
    /// The session is not draining fast enough; this message was dropped.
    #[error("outbound queue full")]
    Full,
}

/// Non-blocking outbound handle for one session.
pub trait Sink: Send + Sync + fmt::Debug {
    fn send(&self, payload: Bytes) -> Result<(), SinkError>;
}

pub type SharedSink = Arc<dyn Sink>;

/// Sink backed by a bounded channel drained by a writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Sink for ChannelSink {
    fn send(&self, payload: Bytes) -> Result<(), SinkError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording sinks for unit tests.

    use std::sync::Mutex;

    use arena_shared::net::{decode_server, ServerMessage};

    use super::*;

    /// Records everything sent to it; can be switched to fail.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<Bytes>>,
        fail_with: Mutex<Option<SinkError>>,
    }

    impl RecordingSink {
        pub fn shared() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn fail_with(&self, err: SinkError) {
            *self.fail_with.lock().unwrap() = Some(err);
        }

        pub fn messages(&self) -> Vec<ServerMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|b| decode_server(b).unwrap())
                .collect()
        }

        pub fn take(&self) -> Vec<ServerMessage> {
            let msgs = self.messages();
            self.sent.lock().unwrap().clear();
            msgs
        }
    }

    impl Sink for RecordingSink {
        fn send(&self, payload: Bytes) -> Result<(), SinkError> {
            if let Some(err) = *self.fail_with.lock().unwrap() {
                return Err(err);
            }
            self.sent.lock().unwrap().push(payload);
            Ok(())
        }
    }
}
