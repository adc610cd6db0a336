//! In-memory security-system service participant.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use common::{LocationId, SecuritySystemId};
use messaging::{Command, CommandMessage, Reply, ReplyMessage};

#[derive(Debug, Clone)]
struct SystemRecord {
    location_name: String,
    location_id: Option<LocationId>,
}

#[derive(Debug, Default)]
struct SecuritySystemState {
    systems: HashMap<SecuritySystemId, SystemRecord>,
    occupied_locations: HashSet<LocationId>,
    creation_failed_calls: Vec<(SecuritySystemId, String)>,
    next_system_id: i64,
}

/// In-memory stand-in for the security-system service.
///
/// Handles `CreateSecuritySystemWithLocationId`, `CreateSecuritySystem`,
/// `NoteLocationCreated` and the `UpdateCreationFailed` compensation.
#[derive(Debug, Default)]
pub struct InMemorySecuritySystemService {
    state: Mutex<SecuritySystemState>,
}

impl InMemorySecuritySystemService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a location as already having a security system, so creation
    /// against it is rejected.
    pub fn mark_location_occupied(&self, location_id: LocationId) {
        self.state
            .lock()
            .unwrap()
            .occupied_locations
            .insert(location_id);
    }

    /// Returns the `UpdateCreationFailed` calls received so far.
    pub fn creation_failed_calls(&self) -> Vec<(SecuritySystemId, String)> {
        self.state.lock().unwrap().creation_failed_calls.clone()
    }

    /// Returns the number of systems currently recorded.
    pub fn system_count(&self) -> usize {
        self.state.lock().unwrap().systems.len()
    }

    /// Processes one command message, returning the reply to send back.
    pub fn handle(&self, message: &CommandMessage) -> Option<ReplyMessage> {
        match &message.command {
            Command::CreateSecuritySystemWithLocationId {
                location_id,
                location_name,
            } => {
                let mut state = self.state.lock().unwrap();
                if state.occupied_locations.contains(location_id) {
                    return Some(ReplyMessage::failure(
                        message.saga_id,
                        Reply::LocationAlreadyHasSecuritySystem {
                            location_id: *location_id,
                        },
                    ));
                }
                state.occupied_locations.insert(*location_id);
                state.next_system_id += 1;
                let security_system_id = SecuritySystemId::new(state.next_system_id);
                state.systems.insert(
                    security_system_id,
                    SystemRecord {
                        location_name: location_name.clone(),
                        location_id: Some(*location_id),
                    },
                );
                Some(ReplyMessage::success(
                    message.saga_id,
                    Reply::SecuritySystemCreated { security_system_id },
                ))
            }
            Command::CreateSecuritySystem { location_name } => {
                let mut state = self.state.lock().unwrap();
                state.next_system_id += 1;
                let security_system_id = SecuritySystemId::new(state.next_system_id);
                state.systems.insert(
                    security_system_id,
                    SystemRecord {
                        location_name: location_name.clone(),
                        location_id: None,
                    },
                );
                Some(ReplyMessage::success(
                    message.saga_id,
                    Reply::SecuritySystemCreated { security_system_id },
                ))
            }
            Command::NoteLocationCreated {
                security_system_id,
                location_id,
            } => {
                let mut state = self.state.lock().unwrap();
                if let Some(record) = state.systems.get_mut(security_system_id) {
                    record.location_id = Some(*location_id);
                }
                Some(ReplyMessage::success(message.saga_id, Reply::LocationNoted))
            }
            Command::UpdateCreationFailed {
                security_system_id,
                reason,
            } => {
                let mut state = self.state.lock().unwrap();
                state.systems.remove(security_system_id);
                state
                    .creation_failed_calls
                    .push((*security_system_id, reason.clone()));
                // Compensations are fire-and-forget; no reply expected.
                None
            }
            other => {
                tracing::warn!(command = other.command_type(), "unhandled command");
                None
            }
        }
    }
}
