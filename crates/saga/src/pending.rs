//! Pending-response correlation between HTTP callers and running sagas.

use std::collections::HashMap;
use std::sync::RwLock;

use common::{SagaId, SecuritySystemId};
use tokio::sync::oneshot;

use crate::rejection::RejectionReason;

/// Terminal outcome of a security-system creation saga, as seen by a caller.
pub type CreationResult = Result<SecuritySystemId, RejectionReason>;

/// Registry correlating saga instance IDs with caller-held response futures.
///
/// The HTTP-handling side registers an entry before starting a saga; the
/// message-consuming side resolves it from a reply handler. The registry is
/// volatile: entries do not survive a restart, so completion signals must
/// tolerate missing entries (duplicate delivery, or a reply that outlived
/// the process that registered it).
///
/// Entries orphaned by a caller-side timeout stay in the map until the saga
/// eventually resolves them; the `pending_responses_active` gauge makes that
/// backlog observable.
#[derive(Debug, Default)]
pub struct PendingSecuritySystemResponses {
    responses: RwLock<HashMap<SagaId, oneshot::Sender<CreationResult>>>,
}

impl PendingSecuritySystemResponses {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new unresolved response for a saga and returns the
    /// receiving half for the caller to await.
    ///
    /// Saga IDs are freshly generated per saga, so a collision means a bug
    /// upstream; the stale entry is dropped (its receiver sees a closed
    /// channel) and the event is logged.
    pub fn create_pending_response(&self, saga_id: SagaId) -> oneshot::Receiver<CreationResult> {
        let (sender, receiver) = oneshot::channel();
        let previous = self.responses.write().unwrap().insert(saga_id, sender);
        if previous.is_some() {
            tracing::warn!(%saga_id, "replaced an existing pending response for reused saga id");
        } else {
            metrics::gauge!("pending_responses_active").increment(1.0);
        }
        receiver
    }

    /// Resolves and removes the pending response for a saga.
    ///
    /// A missing saga ID (`None`) or an unknown one is a logged no-op:
    /// completion signals race with restarts and duplicate delivery, and
    /// must never crash the consumer.
    pub fn complete_security_system_creation(
        &self,
        saga_id: Option<SagaId>,
        result: CreationResult,
    ) {
        let Some(saga_id) = saga_id else {
            tracing::warn!("completion signal without a saga id ignored");
            return;
        };

        let sender = self.responses.write().unwrap().remove(&saga_id);
        match sender {
            Some(sender) => {
                metrics::gauge!("pending_responses_active").decrement(1.0);
                if sender.send(result).is_err() {
                    // Caller gave up (timed out) before the saga finished.
                    tracing::debug!(%saga_id, "pending response receiver already dropped");
                }
            }
            None => {
                tracing::debug!(%saga_id, "no pending response for saga");
            }
        }
    }

    /// Discards the pending response for a saga without resolving it.
    ///
    /// Used when a saga fails to start after its response was registered.
    pub fn remove_pending_response(&self, saga_id: SagaId) {
        if self.responses.write().unwrap().remove(&saga_id).is_some() {
            metrics::gauge!("pending_responses_active").decrement(1.0);
        }
    }

    /// Returns true if a pending response is registered for the saga.
    pub fn has_pending_response(&self, saga_id: SagaId) -> bool {
        self.responses.read().unwrap().contains_key(&saga_id)
    }

    /// Returns the number of unresolved entries.
    pub fn active_count(&self) -> usize {
        self.responses.read().unwrap().len()
    }
}
