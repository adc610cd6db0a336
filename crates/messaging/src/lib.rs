//! Command/reply messaging between the orchestration service and saga
//! participants.
//!
//! Commands are typed payloads addressed to a named destination channel;
//! replies come back tagged with an outcome (success or failure) and the
//! saga instance ID they correlate to. The [`CommandChannel`] trait is the
//! seam where a real broker-backed transport (outbox + broker, at-least-once
//! delivery) plugs in; [`InMemoryCommandChannel`] is the in-process
//! implementation used by tests and the demo wiring.

pub mod channel;
pub mod commands;
pub mod error;
pub mod replies;

pub use channel::{CommandChannel, CommandMessage, InMemoryCommandChannel, MessageId};
pub use commands::{
    CUSTOMER_SERVICE_CHANNEL, Command, CommandWithDestination, SECURITY_SYSTEM_SERVICE_CHANNEL,
};
pub use error::ChannelError;
pub use replies::{Reply, ReplyKind, ReplyMessage, ReplyOutcome};
