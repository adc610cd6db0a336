//! Application service over the two creation sagas.

use std::sync::Arc;

use common::{CustomerId, LocationId, SagaId};
use messaging::CommandChannel;
use tokio::sync::oneshot;

use crate::create_security_system::{self, CreateSecuritySystemSagaData};
use crate::create_security_system_with_location_id::{
    self, CreateSecuritySystemWithLocationIdSagaData,
};
use crate::error::Result;
use crate::instance::SagaInstance;
use crate::orchestrator::SagaOrchestrator;
use crate::pending::{CreationResult, PendingSecuritySystemResponses};

/// Entry point for starting security-system creation sagas.
///
/// Owns one orchestrator per saga flow plus the shared pending-response
/// registry. The pending response is registered before the saga starts, so a
/// reply that arrives between the first command going out and the caller
/// awaiting cannot slip past the registry.
pub struct SecuritySystemSagaService {
    with_location_id: Arc<SagaOrchestrator<CreateSecuritySystemWithLocationIdSagaData>>,
    create: Arc<SagaOrchestrator<CreateSecuritySystemSagaData>>,
    pending: Arc<PendingSecuritySystemResponses>,
}

impl SecuritySystemSagaService {
    /// Creates the service and its orchestrators over the given transport.
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        let pending = Arc::new(PendingSecuritySystemResponses::new());
        let with_location_id = Arc::new(SagaOrchestrator::new(
            create_security_system_with_location_id::definition(pending.clone()),
            channel.clone(),
        ));
        let create = Arc::new(SagaOrchestrator::new(
            create_security_system::definition(pending.clone()),
            channel,
        ));
        Self {
            with_location_id,
            create,
            pending,
        }
    }

    /// Starts the create-by-location-id saga and returns the receiver that
    /// resolves with the creation outcome.
    pub async fn create_security_system_with_location_id(
        &self,
        location_id: LocationId,
    ) -> Result<oneshot::Receiver<CreationResult>> {
        let saga_id = SagaId::new();
        let receiver = self.pending.create_pending_response(saga_id);

        let data = CreateSecuritySystemWithLocationIdSagaData::new(location_id);
        if let Err(e) = self.with_location_id.start(saga_id, data).await {
            self.pending.remove_pending_response(saga_id);
            return Err(e);
        }
        Ok(receiver)
    }

    /// Starts the create-by-customer-id saga and returns the receiver that
    /// resolves with the creation outcome.
    pub async fn create_security_system(
        &self,
        customer_id: CustomerId,
        location_name: String,
    ) -> Result<oneshot::Receiver<CreationResult>> {
        let saga_id = SagaId::new();
        let receiver = self.pending.create_pending_response(saga_id);

        let data = CreateSecuritySystemSagaData::new(customer_id, location_name);
        if let Err(e) = self.create.start(saga_id, data).await {
            self.pending.remove_pending_response(saga_id);
            return Err(e);
        }
        Ok(receiver)
    }

    /// Looks up a saga instance across both flows.
    pub fn find_instance(&self, saga_id: SagaId) -> Option<SagaInstance> {
        self.with_location_id
            .get_instance(saga_id)
            .or_else(|| self.create.get_instance(saga_id))
    }

    /// Returns true if a caller is still waiting on the saga.
    pub fn has_pending_response(&self, saga_id: SagaId) -> bool {
        self.pending.has_pending_response(saga_id)
    }

    /// Resolves the pending response for a saga, if one is registered.
    pub fn complete_security_system_creation(
        &self,
        saga_id: Option<SagaId>,
        result: CreationResult,
    ) {
        self.pending.complete_security_system_creation(saga_id, result);
    }

    /// The orchestrator for the create-by-location-id flow.
    pub fn with_location_id_orchestrator(
        &self,
    ) -> &Arc<SagaOrchestrator<CreateSecuritySystemWithLocationIdSagaData>> {
        &self.with_location_id
    }

    /// The orchestrator for the create-by-customer-id flow.
    pub fn create_orchestrator(&self) -> &Arc<SagaOrchestrator<CreateSecuritySystemSagaData>> {
        &self.create
    }

    /// The shared pending-response registry.
    pub fn pending(&self) -> &Arc<PendingSecuritySystemResponses> {
        &self.pending
    }
}

impl std::fmt::Debug for SecuritySystemSagaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuritySystemSagaService")
            .field("pending", &self.pending.active_count())
            .finish_non_exhaustive()
    }
}
