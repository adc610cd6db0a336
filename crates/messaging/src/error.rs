//! Channel error types.

use thiserror::Error;

/// Errors raised by the command channel.
///
/// These are transport-level failures, not business rejections: business
/// rejections travel as failure-tagged replies, never as channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The destination channel cannot accept messages.
    #[error("Destination unavailable: {0}")]
    DestinationUnavailable(String),

    /// A payload could not be serialized for transport.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
