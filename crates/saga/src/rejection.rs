//! Business rejection reasons.

use serde::{Deserialize, Serialize};

/// Why a saga could not complete.
///
/// Set exactly once on saga data, by the first failure reply handler that
/// runs; present if and only if the saga ends rolled back. Business
/// rejections are not transport errors: they travel as failure-tagged
/// replies and surface to the HTTP caller through the pending-response
/// future, mapped to a specific status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The location ID did not match any known location.
    LocationNotFound,

    /// The location already has a security system attached.
    LocationAlreadyHasSecuritySystem,

    /// The customer ID did not match any known customer.
    CustomerNotFound,
}

impl RejectionReason {
    /// Returns the human-readable rejection message.
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::LocationNotFound => "Location not found",
            RejectionReason::LocationAlreadyHasSecuritySystem => {
                "Location already has a security system"
            }
            RejectionReason::CustomerNotFound => "Customer not found",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}
