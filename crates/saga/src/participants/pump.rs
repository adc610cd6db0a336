//! Message pump that closes the command/reply loop in-process.

use std::sync::Arc;
use std::time::Duration;

use messaging::{
    CUSTOMER_SERVICE_CHANNEL, InMemoryCommandChannel, ReplyMessage,
    SECURITY_SYSTEM_SERVICE_CHANNEL,
};
use tokio::task::JoinHandle;

use crate::create_security_system;
use crate::create_security_system_with_location_id;
use crate::participants::{InMemoryCustomerService, InMemorySecuritySystemService};
use crate::service::SecuritySystemSagaService;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Drains participant channels and routes replies back to the orchestrators.
///
/// Plays the role a message broker's consumer loops would in a distributed
/// deployment: commands reach the in-memory participants, and their replies
/// are dispatched to the orchestrator owning the `reply_to` channel.
#[derive(Clone)]
pub struct ReplyPump {
    channel: Arc<InMemoryCommandChannel>,
    customer_service: Arc<InMemoryCustomerService>,
    security_system_service: Arc<InMemorySecuritySystemService>,
    saga_service: Arc<SecuritySystemSagaService>,
}

impl ReplyPump {
    pub fn new(
        channel: Arc<InMemoryCommandChannel>,
        customer_service: Arc<InMemoryCustomerService>,
        security_system_service: Arc<InMemorySecuritySystemService>,
        saga_service: Arc<SecuritySystemSagaService>,
    ) -> Self {
        Self {
            channel,
            customer_service,
            security_system_service,
            saga_service,
        }
    }

    /// Drains both participant channels once and processes every queued
    /// command. Returns the number of commands processed.
    pub async fn run_once(&self) -> usize {
        let mut processed = 0;

        for message in self.channel.drain(CUSTOMER_SERVICE_CHANNEL) {
            processed += 1;
            let reply = self.customer_service.handle(&message);
            self.dispatch(&message.reply_to, reply).await;
        }

        for message in self.channel.drain(SECURITY_SYSTEM_SERVICE_CHANNEL) {
            processed += 1;
            let reply = self.security_system_service.handle(&message);
            self.dispatch(&message.reply_to, reply).await;
        }

        processed
    }

    /// Runs until no new commands appear, including those produced by the
    /// replies themselves.
    pub async fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let processed = self.run_once().await;
            if processed == 0 {
                return total;
            }
            total += processed;
        }
    }

    /// Spawns the pump as a background task polling the channel.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if self.run_once().await == 0 {
                    tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                }
            }
        })
    }

    async fn dispatch(&self, reply_to: &str, reply: Option<ReplyMessage>) {
        let Some(reply) = reply else {
            return;
        };
        let saga_id = reply.saga_id;

        let result = if reply_to == create_security_system_with_location_id::REPLY_CHANNEL {
            self.saga_service
                .with_location_id_orchestrator()
                .handle_reply(reply)
                .await
        } else if reply_to == create_security_system::REPLY_CHANNEL {
            self.saga_service
                .create_orchestrator()
                .handle_reply(reply)
                .await
        } else {
            tracing::warn!(reply_to, %saga_id, "reply for unknown channel dropped");
            return;
        };

        if let Err(e) = result {
            tracing::error!(%saga_id, error = %e, "failed to process reply");
        }
    }
}

impl std::fmt::Debug for ReplyPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPump").finish_non_exhaustive()
    }
}
