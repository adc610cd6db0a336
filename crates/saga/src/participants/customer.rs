//! In-memory customer service participant.

use std::collections::HashMap;
use std::sync::Mutex;

use common::{CustomerId, LocationId};
use messaging::{Command, CommandMessage, Reply, ReplyMessage};

#[derive(Debug, Clone)]
struct LocationRecord {
    customer_id: CustomerId,
    name: String,
}

#[derive(Debug, Default)]
struct CustomerState {
    customers: Vec<CustomerId>,
    locations: HashMap<LocationId, LocationRecord>,
    next_customer_id: i64,
    next_location_id: i64,
    reject_location_creation: bool,
}

/// In-memory stand-in for the customer-management service.
///
/// Handles `ValidateLocation` and `CreateLocationWithSecuritySystem`.
#[derive(Debug, Default)]
pub struct InMemoryCustomerService {
    state: Mutex<CustomerState>,
}

impl InMemoryCustomerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customer and returns its ID.
    pub fn register_customer(&self) -> CustomerId {
        let mut state = self.state.lock().unwrap();
        state.next_customer_id += 1;
        let customer_id = CustomerId::new(state.next_customer_id);
        state.customers.push(customer_id);
        customer_id
    }

    /// Registers a location for a customer and returns its ID.
    pub fn register_location(&self, customer_id: CustomerId, name: &str) -> LocationId {
        let mut state = self.state.lock().unwrap();
        state.next_location_id += 1;
        let location_id = LocationId::new(state.next_location_id);
        state.locations.insert(
            location_id,
            LocationRecord {
                customer_id,
                name: name.to_string(),
            },
        );
        location_id
    }

    /// Makes subsequent `CreateLocationWithSecuritySystem` commands fail as
    /// if the location were already occupied.
    pub fn set_reject_location_creation(&self, reject: bool) {
        self.state.lock().unwrap().reject_location_creation = reject;
    }

    /// Processes one command message, returning the reply to send back.
    pub fn handle(&self, message: &CommandMessage) -> Option<ReplyMessage> {
        match &message.command {
            Command::ValidateLocation { location_id } => {
                let state = self.state.lock().unwrap();
                match state.locations.get(location_id) {
                    Some(record) => Some(ReplyMessage::success(
                        message.saga_id,
                        Reply::LocationValidated {
                            location_id: *location_id,
                            location_name: record.name.clone(),
                            customer_id: record.customer_id,
                        },
                    )),
                    None => Some(ReplyMessage::failure(
                        message.saga_id,
                        Reply::LocationNotFound,
                    )),
                }
            }
            Command::CreateLocationWithSecuritySystem {
                customer_id,
                location_name,
                ..
            } => {
                let mut state = self.state.lock().unwrap();
                if !state.customers.contains(customer_id) {
                    return Some(ReplyMessage::failure(
                        message.saga_id,
                        Reply::CustomerNotFound,
                    ));
                }
                if state.reject_location_creation {
                    let occupied = state
                        .locations
                        .iter()
                        .find(|(_, r)| &r.name == location_name)
                        .map(|(id, _)| *id)
                        .unwrap_or(LocationId::new(0));
                    return Some(ReplyMessage::failure(
                        message.saga_id,
                        Reply::LocationAlreadyHasSecuritySystem {
                            location_id: occupied,
                        },
                    ));
                }
                state.next_location_id += 1;
                let location_id = LocationId::new(state.next_location_id);
                state.locations.insert(
                    location_id,
                    LocationRecord {
                        customer_id: *customer_id,
                        name: location_name.clone(),
                    },
                );
                Some(ReplyMessage::success(
                    message.saga_id,
                    Reply::LocationCreatedWithSecuritySystem { location_id },
                ))
            }
            other => {
                tracing::warn!(command = other.command_type(), "unhandled command");
                None
            }
        }
    }
}
