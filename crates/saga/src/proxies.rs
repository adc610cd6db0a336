//! Participant proxies.
//!
//! Thin per-service stubs that build outbound command messages addressed to
//! a participant's destination channel. Saga definitions call these instead
//! of constructing commands inline, keeping each participant's channel name
//! and command vocabulary in one place.

use common::{CustomerId, LocationId, SecuritySystemId};
use messaging::{
    CUSTOMER_SERVICE_CHANNEL, Command, CommandWithDestination, SECURITY_SYSTEM_SERVICE_CHANNEL,
};

/// Proxy for the customer-management service.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerServiceProxy;

impl CustomerServiceProxy {
    /// The customer service's destination channel.
    pub const CHANNEL: &'static str = CUSTOMER_SERVICE_CHANNEL;

    /// Asks the customer service to validate that a location exists.
    pub fn validate_location(&self, location_id: LocationId) -> CommandWithDestination {
        CommandWithDestination::send(Command::ValidateLocation { location_id }).to(Self::CHANNEL)
    }

    /// Asks the customer service to create a location attached to an
    /// existing security system.
    pub fn create_location_with_security_system(
        &self,
        customer_id: CustomerId,
        location_name: String,
        security_system_id: SecuritySystemId,
    ) -> CommandWithDestination {
        CommandWithDestination::send(Command::CreateLocationWithSecuritySystem {
            customer_id,
            location_name,
            security_system_id,
        })
        .to(Self::CHANNEL)
    }
}

/// Proxy for the security-system service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecuritySystemServiceProxy;

impl SecuritySystemServiceProxy {
    /// The security-system service's destination channel.
    pub const CHANNEL: &'static str = SECURITY_SYSTEM_SERVICE_CHANNEL;

    /// Creates a security system for an already-validated location.
    pub fn create_security_system_with_location_id(
        &self,
        location_id: LocationId,
        location_name: String,
    ) -> CommandWithDestination {
        CommandWithDestination::send(Command::CreateSecuritySystemWithLocationId {
            location_id,
            location_name,
        })
        .to(Self::CHANNEL)
    }

    /// Creates a security system before its location exists.
    pub fn create_security_system(&self, location_name: String) -> CommandWithDestination {
        CommandWithDestination::send(Command::CreateSecuritySystem { location_name })
            .to(Self::CHANNEL)
    }

    /// Records the created location's ID on a security system.
    pub fn note_location_created(
        &self,
        security_system_id: SecuritySystemId,
        location_id: LocationId,
    ) -> CommandWithDestination {
        CommandWithDestination::send(Command::NoteLocationCreated {
            security_system_id,
            location_id,
        })
        .to(Self::CHANNEL)
    }

    /// Compensation: marks a security system as failed.
    pub fn update_creation_failed(
        &self,
        security_system_id: SecuritySystemId,
        reason: String,
    ) -> CommandWithDestination {
        CommandWithDestination::send(Command::UpdateCreationFailed {
            security_system_id,
            reason,
        })
        .to(Self::CHANNEL)
    }
}
