//! The create-security-system-by-customer-id saga (legacy input shape).
//!
//! Three steps:
//!
//! 1. `CreateSecuritySystem` at the security-system service. This step has
//!    an externally visible side effect before the location exists, so it
//!    declares the one genuine compensating transaction in the system:
//!    `UpdateCreationFailed` marks the created system as failed if a later
//!    step cannot complete.
//! 2. `CreateLocationWithSecuritySystem` at the customer service.
//!    `CustomerNotFound` and `LocationAlreadyHasSecuritySystem` reject the
//!    saga and trigger the compensation of step 1.
//! 3. `NoteLocationCreated` back at the security-system service, recording
//!    the new location's ID on the system.

use std::sync::Arc;

use common::{CustomerId, LocationId, SagaId, SecuritySystemId};
use messaging::{Reply, ReplyKind};
use serde::{Deserialize, Serialize};

use crate::definition::{SagaData, SagaDefinition};
use crate::pending::PendingSecuritySystemResponses;
use crate::proxies::{CustomerServiceProxy, SecuritySystemServiceProxy};
use crate::rejection::RejectionReason;

pub const SAGA_TYPE: &str = "CreateSecuritySystem";
pub const REPLY_CHANNEL: &str = "create-security-system-saga-reply";

pub const STEP_CREATE_SECURITY_SYSTEM: &str = "create_security_system";
pub const STEP_CREATE_LOCATION: &str = "create_location";
pub const STEP_NOTE_LOCATION_CREATED: &str = "note_location_created";

/// Mutable bag of fields accumulated across the saga's steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecuritySystemSagaData {
    pub saga_id: Option<SagaId>,
    pub customer_id: CustomerId,
    pub location_name: String,
    pub security_system_id: Option<SecuritySystemId>,
    pub location_id: Option<LocationId>,
    pub rejection_reason: Option<RejectionReason>,
}

impl CreateSecuritySystemSagaData {
    /// Creates saga data for the given customer and location name.
    pub fn new(customer_id: CustomerId, location_name: String) -> Self {
        Self {
            saga_id: None,
            customer_id,
            location_name,
            security_system_id: None,
            location_id: None,
            rejection_reason: None,
        }
    }
}

impl SagaData for CreateSecuritySystemSagaData {
    fn set_saga_id(&mut self, saga_id: SagaId) {
        self.saga_id = Some(saga_id);
    }

    fn saga_id(&self) -> Option<SagaId> {
        self.saga_id
    }
}

/// Builds the saga definition, wiring reply handlers to the pending-response
/// registry.
pub fn definition(
    pending: Arc<PendingSecuritySystemResponses>,
) -> SagaDefinition<CreateSecuritySystemSagaData> {
    let customer_service = CustomerServiceProxy;
    let security_system_service = SecuritySystemServiceProxy;
    let pending_on_created = pending.clone();

    SagaDefinition::builder(SAGA_TYPE, REPLY_CHANNEL)
        .on_rolled_back(move |data: &CreateSecuritySystemSagaData| {
            match data.rejection_reason {
                Some(reason) => {
                    // No-op if the response already resolved at step 1.
                    pending.complete_security_system_creation(data.saga_id, Err(reason));
                }
                None => {
                    tracing::warn!(saga_id = ?data.saga_id, "saga rolled back without a rejection reason");
                }
            }
        })
        .step(
            STEP_CREATE_SECURITY_SYSTEM,
            move |data: &CreateSecuritySystemSagaData| {
                security_system_service.create_security_system(data.location_name.clone())
            },
        )
        .on_reply(ReplyKind::SecuritySystemCreated, move |data, reply| {
            if let Reply::SecuritySystemCreated { security_system_id } = reply {
                tracing::info!(%security_system_id, "security system created");
                data.security_system_id = Some(*security_system_id);
                pending_on_created
                    .complete_security_system_creation(data.saga_id, Ok(*security_system_id));
            }
        })
        .with_compensation(move |data: &CreateSecuritySystemSagaData| {
            data.security_system_id.map(|security_system_id| {
                let reason = data
                    .rejection_reason
                    .map(|r| r.message().to_string())
                    .unwrap_or_else(|| "Creation failed".to_string());
                security_system_service.update_creation_failed(security_system_id, reason)
            })
        })
        .step(
            STEP_CREATE_LOCATION,
            move |data: &CreateSecuritySystemSagaData| {
                customer_service.create_location_with_security_system(
                    data.customer_id,
                    data.location_name.clone(),
                    data.security_system_id.unwrap_or(SecuritySystemId::new(0)),
                )
            },
        )
        .on_reply(ReplyKind::LocationCreatedWithSecuritySystem, |data, reply| {
            if let Reply::LocationCreatedWithSecuritySystem { location_id } = reply {
                tracing::info!(%location_id, "location created with security system");
                data.location_id = Some(*location_id);
            }
        })
        .on_reply(ReplyKind::CustomerNotFound, |data, _reply| {
            tracing::info!(customer_id = %data.customer_id, "customer not found");
            data.rejection_reason = Some(RejectionReason::CustomerNotFound);
        })
        .on_reply(ReplyKind::LocationAlreadyHasSecuritySystem, |data, _reply| {
            tracing::info!(
                location_name = %data.location_name,
                "location already has a security system"
            );
            data.rejection_reason = Some(RejectionReason::LocationAlreadyHasSecuritySystem);
        })
        .step(
            STEP_NOTE_LOCATION_CREATED,
            move |data: &CreateSecuritySystemSagaData| {
                security_system_service.note_location_created(
                    data.security_system_id.unwrap_or(SecuritySystemId::new(0)),
                    data.location_id.unwrap_or(LocationId::new(0)),
                )
            },
        )
        .on_reply(ReplyKind::LocationNoted, |_data, _reply| {})
        .build()
}
