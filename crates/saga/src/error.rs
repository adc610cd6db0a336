//! Saga error types.

use common::SagaId;
use messaging::{ChannelError, ReplyKind};
use thiserror::Error;

/// Errors that can occur during saga orchestration.
#[derive(Debug, Error)]
pub enum SagaError {
    /// No instance with the given ID is known to the orchestrator.
    #[error("Unknown saga instance: {0}")]
    UnknownSaga(SagaId),

    /// A reply arrived that no handler of the current step accepts.
    #[error("Saga {saga_id} received unexpected reply {kind:?} at step '{step}'")]
    UnexpectedReply {
        saga_id: SagaId,
        step: String,
        kind: ReplyKind,
    },

    /// Command transport failure.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
