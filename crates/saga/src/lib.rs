//! Saga orchestration for distributed security-system creation.
//!
//! This crate provides the orchestration core that coordinates the customer
//! and security-system services through asynchronous command/reply messaging:
//!
//! - a declarative [`SagaDefinition`] DSL (ordered steps, typed reply
//!   handlers, optional compensations),
//! - a generic [`SagaOrchestrator`] that drives definitions forward one reply
//!   at a time and rolls back in reverse order on failure,
//! - the [`PendingSecuritySystemResponses`] registry that bridges a
//!   synchronous HTTP caller to an asynchronously completing saga,
//! - the two concrete flows: create-by-location-id (two steps, no
//!   compensation needed) and create-by-customer-id (three steps, with a
//!   genuine compensating transaction).

pub mod create_security_system;
pub mod create_security_system_with_location_id;
pub mod definition;
pub mod error;
pub mod instance;
pub mod orchestrator;
pub mod participants;
pub mod pending;
pub mod proxies;
pub mod rejection;
pub mod service;

pub use create_security_system::CreateSecuritySystemSagaData;
pub use create_security_system_with_location_id::CreateSecuritySystemWithLocationIdSagaData;
pub use definition::{SagaData, SagaDefinition};
pub use error::SagaError;
pub use instance::{SagaInstance, SagaStatus};
pub use orchestrator::SagaOrchestrator;
pub use participants::{InMemoryCustomerService, InMemorySecuritySystemService, ReplyPump};
pub use pending::{CreationResult, PendingSecuritySystemResponses};
pub use proxies::{CustomerServiceProxy, SecuritySystemServiceProxy};
pub use rejection::RejectionReason;
pub use service::SecuritySystemSagaService;
