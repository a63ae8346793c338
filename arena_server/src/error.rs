//! Error types for the session loop.

use arena_shared::net::{DecodeError, ParticipantId};

/// Recoverable per-event failures. The loop logs these and keeps running.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no session or entity for participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("session {actual} sent a message claiming to be participant {claimed}")]
    ParticipantMismatch {
        claimed: ParticipantId,
        actual: ParticipantId,
    },

    #[error("participant id space exhausted")]
    IdSpaceExhausted,

    #[error("session limit of {max} reached")]
    SessionLimit { max: usize },

    #[error("failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Lifecycle misuse or loop task failure.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("game loop is already running")]
    AlreadyRunning,

    #[error("game loop is not running")]
    NotRunning,

    #[error("game loop state was lost with a failed task")]
    StateLost,

    #[error("game loop task failed: {0}")]
    Panicked(#[from] tokio::task::JoinError),
}
