//! Participant reply payloads and their outcome tagging.

use common::{CustomerId, LocationId, SagaId, SecuritySystemId};
use serde::{Deserialize, Serialize};

/// Replies sent by saga participants back to the orchestration service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    /// The location exists; carries the data the saga needs for later steps.
    LocationValidated {
        location_id: LocationId,
        location_name: String,
        customer_id: CustomerId,
    },

    /// The location does not exist.
    LocationNotFound,

    /// A security system was created.
    SecuritySystemCreated {
        security_system_id: SecuritySystemId,
    },

    /// The location already has a security system attached.
    LocationAlreadyHasSecuritySystem { location_id: LocationId },

    /// A location was created and attached to a security system.
    LocationCreatedWithSecuritySystem { location_id: LocationId },

    /// The customer does not exist.
    CustomerNotFound,

    /// The security system recorded its location ID.
    LocationNoted,
}

impl Reply {
    /// Returns the discriminant used for handler dispatch.
    pub fn kind(&self) -> ReplyKind {
        match self {
            Reply::LocationValidated { .. } => ReplyKind::LocationValidated,
            Reply::LocationNotFound => ReplyKind::LocationNotFound,
            Reply::SecuritySystemCreated { .. } => ReplyKind::SecuritySystemCreated,
            Reply::LocationAlreadyHasSecuritySystem { .. } => {
                ReplyKind::LocationAlreadyHasSecuritySystem
            }
            Reply::LocationCreatedWithSecuritySystem { .. } => {
                ReplyKind::LocationCreatedWithSecuritySystem
            }
            Reply::CustomerNotFound => ReplyKind::CustomerNotFound,
            Reply::LocationNoted => ReplyKind::LocationNoted,
        }
    }
}

/// Fieldless discriminant of [`Reply`], used as a handler-map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyKind {
    LocationValidated,
    LocationNotFound,
    SecuritySystemCreated,
    LocationAlreadyHasSecuritySystem,
    LocationCreatedWithSecuritySystem,
    CustomerNotFound,
    LocationNoted,
}

/// Outcome header attached to every reply by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyOutcome {
    Success,
    Failure,
}

/// A reply delivered to the orchestration service, correlated to the saga
/// instance that sent the originating command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub saga_id: SagaId,
    pub outcome: ReplyOutcome,
    pub reply: Reply,
}

impl ReplyMessage {
    /// Builds a reply tagged with the Success outcome.
    pub fn success(saga_id: SagaId, reply: Reply) -> Self {
        Self {
            saga_id,
            outcome: ReplyOutcome::Success,
            reply,
        }
    }

    /// Builds a reply tagged with the Failure outcome.
    pub fn failure(saga_id: SagaId, reply: Reply) -> Self {
        Self {
            saga_id,
            outcome: ReplyOutcome::Failure,
            reply,
        }
    }
}
