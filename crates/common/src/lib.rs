//! Shared identifier types used across the orchestration services.

pub mod types;

pub use types::{CustomerId, LocationId, SagaId, SecuritySystemId};
