//! Saga-to-participant command payloads.

use common::{CustomerId, LocationId, SecuritySystemId};
use serde::{Deserialize, Serialize};

/// Destination channel of the customer-management service.
pub const CUSTOMER_SERVICE_CHANNEL: &str = "customer-service";

/// Destination channel of the security-system service.
pub const SECURITY_SYSTEM_SERVICE_CHANNEL: &str = "security-system-service";

/// Commands sent by the orchestration service to saga participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    /// Ask the customer service whether a location exists.
    ValidateLocation { location_id: LocationId },

    /// Create a security system for an already-validated location.
    CreateSecuritySystemWithLocationId {
        location_id: LocationId,
        location_name: String,
    },

    /// Create a security system before its location exists.
    CreateSecuritySystem { location_name: String },

    /// Create a location attached to an existing security system.
    CreateLocationWithSecuritySystem {
        customer_id: CustomerId,
        location_name: String,
        security_system_id: SecuritySystemId,
    },

    /// Record the location ID on a security system once the location exists.
    NoteLocationCreated {
        security_system_id: SecuritySystemId,
        location_id: LocationId,
    },

    /// Compensation: mark a security system as failed after a later step
    /// could not complete.
    UpdateCreationFailed {
        security_system_id: SecuritySystemId,
        reason: String,
    },
}

impl Command {
    /// Returns the command name as a string.
    pub fn command_type(&self) -> &'static str {
        match self {
            Command::ValidateLocation { .. } => "ValidateLocation",
            Command::CreateSecuritySystemWithLocationId { .. } => {
                "CreateSecuritySystemWithLocationId"
            }
            Command::CreateSecuritySystem { .. } => "CreateSecuritySystem",
            Command::CreateLocationWithSecuritySystem { .. } => "CreateLocationWithSecuritySystem",
            Command::NoteLocationCreated { .. } => "NoteLocationCreated",
            Command::UpdateCreationFailed { .. } => "UpdateCreationFailed",
        }
    }
}

/// A command paired with the channel it should be delivered to.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandWithDestination {
    pub destination: String,
    pub command: Command,
}

impl CommandWithDestination {
    /// Starts building a command message: `CommandWithDestination::send(cmd).to(channel)`.
    pub fn send(command: Command) -> CommandDestinationBuilder {
        CommandDestinationBuilder { command }
    }
}

/// Builder returned by [`CommandWithDestination::send`].
pub struct CommandDestinationBuilder {
    command: Command,
}

impl CommandDestinationBuilder {
    /// Addresses the command to the given destination channel.
    pub fn to(self, destination: impl Into<String>) -> CommandWithDestination {
        CommandWithDestination {
            destination: destination.into(),
            command: self.command,
        }
    }
}
