//! The create-security-system-by-location-id saga.
//!
//! Two compensable steps:
//!
//! 1. `ValidateLocation` at the customer service. Success records the
//!    location name and customer ID; `LocationNotFound` rejects the saga.
//! 2. `CreateSecuritySystemWithLocationId` at the security-system service.
//!    Success resolves the caller's pending response with the new ID;
//!    `LocationAlreadyHasSecuritySystem` rejects the saga.
//!
//! Neither step declares a compensation: step 1 has no side effect, and a
//! failure at step 2 leaves nothing behind to undo. Rollback only marks the
//! instance and resolves the pending response with the rejection reason.

use std::sync::Arc;

use common::{CustomerId, LocationId, SagaId, SecuritySystemId};
use messaging::{Reply, ReplyKind};
use serde::{Deserialize, Serialize};

use crate::definition::{SagaData, SagaDefinition};
use crate::pending::PendingSecuritySystemResponses;
use crate::proxies::{CustomerServiceProxy, SecuritySystemServiceProxy};
use crate::rejection::RejectionReason;

pub const SAGA_TYPE: &str = "CreateSecuritySystemWithLocationId";
pub const REPLY_CHANNEL: &str = "create-security-system-with-location-id-saga-reply";

pub const STEP_VALIDATE_LOCATION: &str = "validate_location";
pub const STEP_CREATE_SECURITY_SYSTEM: &str = "create_security_system";

/// Mutable bag of fields accumulated across the saga's steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecuritySystemWithLocationIdSagaData {
    pub saga_id: Option<SagaId>,
    pub location_id: LocationId,
    pub location_name: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub security_system_id: Option<SecuritySystemId>,
    pub rejection_reason: Option<RejectionReason>,
}

impl CreateSecuritySystemWithLocationIdSagaData {
    /// Creates saga data for the given input location.
    pub fn new(location_id: LocationId) -> Self {
        Self {
            saga_id: None,
            location_id,
            location_name: None,
            customer_id: None,
            security_system_id: None,
            rejection_reason: None,
        }
    }
}

impl SagaData for CreateSecuritySystemWithLocationIdSagaData {
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
) -> SagaDefinition<CreateSecuritySystemWithLocationIdSagaData> {
    let customer_service = CustomerServiceProxy;
    let security_system_service = SecuritySystemServiceProxy;
    let pending_on_created = pending.clone();

    SagaDefinition::builder(SAGA_TYPE, REPLY_CHANNEL)
        .on_rolled_back(move |data: &CreateSecuritySystemWithLocationIdSagaData| {
            match data.rejection_reason {
                Some(reason) => {
                    pending.complete_security_system_creation(data.saga_id, Err(reason));
                }
                None => {
                    tracing::warn!(saga_id = ?data.saga_id, "saga rolled back without a rejection reason");
                }
            }
        })
        .step(
            STEP_VALIDATE_LOCATION,
            move |data: &CreateSecuritySystemWithLocationIdSagaData| {
                customer_service.validate_location(data.location_id)
            },
        )
        .on_reply(ReplyKind::LocationValidated, |data, reply| {
            if let Reply::LocationValidated {
                location_id,
                location_name,
                customer_id,
            } = reply
            {
                tracing::info!(
                    %location_id,
                    location_name,
                    %customer_id,
                    "location validated"
                );
                data.location_name = Some(location_name.clone());
                data.customer_id = Some(*customer_id);
            }
        })
        .on_reply(ReplyKind::LocationNotFound, |data, _reply| {
            tracing::info!(location_id = %data.location_id, "location not found");
            data.rejection_reason = Some(RejectionReason::LocationNotFound);
        })
        .step(
            STEP_CREATE_SECURITY_SYSTEM,
            move |data: &CreateSecuritySystemWithLocationIdSagaData| {
                security_system_service.create_security_system_with_location_id(
                    data.location_id,
                    data.location_name.clone().unwrap_or_default(),
                )
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
        .on_reply(ReplyKind::LocationAlreadyHasSecuritySystem, |data, _reply| {
            tracing::info!(
                location_id = %data.location_id,
                "location already has a security system"
            );
            data.rejection_reason = Some(RejectionReason::LocationAlreadyHasSecuritySystem);
        })
        .build()
}
