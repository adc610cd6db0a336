//! In-memory saga participants.
//!
//! Stand-ins for the remote customer and security-system services. They
//! consume command messages off the in-memory channel and produce the same
//! replies their real counterparts would, which lets the whole orchestration
//! run inside one process for local use and tests.

mod customer;
mod pump;
mod security_system;

pub use customer::InMemoryCustomerService;
pub use pump::ReplyPump;
pub use security_system::InMemorySecuritySystemService;
