//! Saga instance state machine.

use chrono::{DateTime, Utc};
use common::SagaId;
use serde::{Deserialize, Serialize};

/// The status of a saga instance in its lifecycle.
///
/// Status transitions:
/// ```text
/// Started ──┬──► Completed
///           └──► Compensating ──► RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaStatus {
    /// Steps are being executed.
    #[default]
    Started,

    /// All steps completed successfully (terminal).
    Completed,

    /// A step failed and compensating commands are being issued.
    Compensating,

    /// Compensation finished after a failure (terminal).
    RolledBack,
}

impl SagaStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Completed | SagaStatus::RolledBack)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Started => "Started",
            SagaStatus::Completed => "Completed",
            SagaStatus::Compensating => "Compensating",
            SagaStatus::RolledBack => "RolledBack",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One running (or finished) execution of a saga definition.
///
/// Tracks which step the instance is waiting on and its lifecycle status.
/// The step index always points at the step whose reply is outstanding;
/// steps before it have completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaInstance {
    id: SagaId,
    saga_type: String,
    status: SagaStatus,
    current_step: usize,
    created_at: DateTime<Utc>,
}

impl SagaInstance {
    /// Creates a new instance at step 0 in the Started status.
    pub fn new(id: SagaId, saga_type: impl Into<String>) -> Self {
        Self {
            id,
            saga_type: saga_type.into(),
            status: SagaStatus::Started,
            current_step: 0,
            created_at: Utc::now(),
        }
    }

    /// Returns the saga instance ID.
    pub fn id(&self) -> SagaId {
        self.id
    }

    /// Returns the saga type name.
    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Returns the lifecycle status.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Returns the index of the step whose reply is outstanding.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Returns when the instance was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Moves to the next step after a successful reply.
    pub fn advance(&mut self) {
        self.current_step += 1;
    }

    /// Marks the instance as compensating after a failure reply.
    pub fn mark_compensating(&mut self) {
        self.status = SagaStatus::Compensating;
    }

    /// Marks the instance as completed (terminal).
    pub fn mark_completed(&mut self) {
        self.status = SagaStatus::Completed;
    }

    /// Marks the instance as rolled back (terminal).
    pub fn mark_rolled_back(&mut self) {
        self.status = SagaStatus::RolledBack;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_instance_is_started_at_step_zero() {
        let instance = SagaInstance::new(SagaId::new(), "CreateSecuritySystem");
        assert_eq!(instance.status(), SagaStatus::Started);
        assert_eq!(instance.current_step(), 0);
        assert_eq!(instance.saga_type(), "CreateSecuritySystem");
    }

    #[test]
    fn test_advance_increments_step() {
        let mut instance = SagaInstance::new(SagaId::new(), "CreateSecuritySystem");
        instance.advance();
        instance.advance();
        assert_eq!(instance.current_step(), 2);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SagaStatus::Started.is_terminal());
        assert!(!SagaStatus::Compensating.is_terminal());
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::RolledBack.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SagaStatus::Started.to_string(), "Started");
        assert_eq!(SagaStatus::Completed.to_string(), "Completed");
        assert_eq!(SagaStatus::Compensating.to_string(), "Compensating");
        assert_eq!(SagaStatus::RolledBack.to_string(), "RolledBack");
    }

    #[test]
    fn test_rollback_transition() {
        let mut instance = SagaInstance::new(SagaId::new(), "CreateSecuritySystem");
        instance.mark_compensating();
        assert_eq!(instance.status(), SagaStatus::Compensating);
        instance.mark_rolled_back();
        assert_eq!(instance.status(), SagaStatus::RolledBack);
        assert!(instance.status().is_terminal());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let instance = SagaInstance::new(SagaId::new(), "CreateSecuritySystem");
        let json = serde_json::to_string(&instance).unwrap();
        let back: SagaInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), instance.id());
        assert_eq!(back.status(), instance.status());
    }
}
