//! Generic saga execution engine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use common::SagaId;
use messaging::{CommandChannel, ReplyMessage, ReplyOutcome};

use crate::definition::{SagaData, SagaDefinition};
use crate::error::{Result, SagaError};
use crate::instance::{SagaInstance, SagaStatus};

struct SagaExecution<D> {
    instance: SagaInstance,
    data: D,
    started: Instant,
}

/// Drives instances of one saga definition forward, one reply at a time.
///
/// `start` sends the first step's command and registers the instance;
/// `handle_reply` is called by the message-consuming side for every reply on
/// the definition's reply channel. Steps per instance execute strictly in
/// sequence; replies for unrelated instances interleave freely. Instance
/// state is kept in a process-local map; a broker-backed deployment would
/// persist it, which is the transport collaborator's concern, not this
/// engine's.
pub struct SagaOrchestrator<D> {
    definition: SagaDefinition<D>,
    channel: Arc<dyn CommandChannel>,
    instances: RwLock<HashMap<SagaId, SagaExecution<D>>>,
}

impl<D: SagaData> SagaOrchestrator<D> {
    /// Creates an orchestrator for the given definition and transport.
    pub fn new(definition: SagaDefinition<D>, channel: Arc<dyn CommandChannel>) -> Self {
        Self {
            definition,
            channel,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the definition driven by this orchestrator.
    pub fn definition(&self) -> &SagaDefinition<D> {
        &self.definition
    }

    /// Starts a new saga instance: stamps the ID onto the data, registers
    /// the instance and sends the first step's command.
    #[tracing::instrument(skip(self, data), fields(saga_type = self.definition.saga_type()))]
    pub async fn start(&self, saga_id: SagaId, mut data: D) -> Result<()> {
        metrics::counter!("saga_executions_total").increment(1);
        data.set_saga_id(saga_id);

        let instance = SagaInstance::new(saga_id, self.definition.saga_type());
        tracing::info!(%saga_id, "saga started");

        let Some(first) = self.definition.step(0) else {
            let mut instance = instance;
            instance.mark_completed();
            self.insert(SagaExecution {
                instance,
                data,
                started: Instant::now(),
            });
            return Ok(());
        };

        tracing::info!(%saga_id, step = first.name(), "saga step started");
        let command = first.invoke(&data);
        self.insert(SagaExecution {
            instance,
            data,
            started: Instant::now(),
        });

        match self
            .channel
            .send(
                &command.destination,
                command.command,
                self.definition.reply_channel(),
                saga_id,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                self.instances.write().unwrap().remove(&saga_id);
                Err(e.into())
            }
        }
    }

    /// Processes one reply: dispatches to the current step's handler, then
    /// advances the saga or rolls it back.
    ///
    /// Replies for unknown or already-finished instances are logged no-ops:
    /// at-least-once delivery makes duplicates and restarts routine, and the
    /// consumer must never crash on them.
    #[tracing::instrument(skip(self, message), fields(saga_id = %message.saga_id))]
    pub async fn handle_reply(&self, message: ReplyMessage) -> Result<()> {
        let saga_id = message.saga_id;
        let Some(mut execution) = self.instances.write().unwrap().remove(&saga_id) else {
            tracing::warn!(%saga_id, "reply for unknown saga instance ignored");
            return Ok(());
        };

        let result = self.process_reply(&mut execution, &message).await;
        self.insert(execution);
        result
    }

    async fn process_reply(
        &self,
        execution: &mut SagaExecution<D>,
        message: &ReplyMessage,
    ) -> Result<()> {
        let saga_id = execution.instance.id();

        if execution.instance.status().is_terminal() {
            tracing::warn!(%saga_id, "reply for finished saga ignored");
            return Ok(());
        }

        let step_index = execution.instance.current_step();
        let Some(step) = self.definition.step(step_index) else {
            tracing::warn!(%saga_id, step_index, "no step awaiting a reply");
            return Ok(());
        };

        if !step.handle_reply(&mut execution.data, &message.reply) {
            return Err(SagaError::UnexpectedReply {
                saga_id,
                step: step.name().to_string(),
                kind: message.reply.kind(),
            });
        }

        match message.outcome {
            ReplyOutcome::Success => {
                execution.instance.advance();
                match self.definition.step(execution.instance.current_step()) {
                    Some(next) => {
                        tracing::info!(%saga_id, step = next.name(), "saga step started");
                        let command = next.invoke(&execution.data);
                        self.channel
                            .send(
                                &command.destination,
                                command.command,
                                self.definition.reply_channel(),
                                saga_id,
                            )
                            .await?;
                    }
                    None => {
                        execution.instance.mark_completed();
                        metrics::counter!("saga_completed").increment(1);
                        metrics::histogram!("saga_duration_seconds")
                            .record(execution.started.elapsed().as_secs_f64());
                        tracing::info!(%saga_id, "saga completed");
                    }
                }
            }
            ReplyOutcome::Failure => {
                tracing::info!(
                    %saga_id,
                    step = step.name(),
                    reply = ?message.reply.kind(),
                    "saga step failed, rolling back"
                );
                execution.instance.mark_compensating();
                self.compensate(execution).await;
                execution.instance.mark_rolled_back();
                self.definition.notify_rolled_back(&execution.data);

                metrics::counter!("saga_rolled_back").increment(1);
                metrics::histogram!("saga_duration_seconds")
                    .record(execution.started.elapsed().as_secs_f64());
                tracing::warn!(%saga_id, "saga rolled back");
            }
        }

        Ok(())
    }

    /// Sends compensating commands for completed steps, in reverse order.
    ///
    /// A compensation send failure is logged and the remaining compensations
    /// still run; recovering from it requires operator intervention.
    async fn compensate(&self, execution: &mut SagaExecution<D>) {
        let saga_id = execution.instance.id();
        let completed = execution.instance.current_step();

        for index in (0..completed).rev() {
            let Some(step) = self.definition.step(index) else {
                continue;
            };
            let Some(command) = step.compensate(&execution.data) else {
                tracing::debug!(%saga_id, step = step.name(), "nothing to compensate");
                continue;
            };

            match self
                .channel
                .send(
                    &command.destination,
                    command.command,
                    self.definition.reply_channel(),
                    saga_id,
                )
                .await
            {
                Ok(_) => {
                    tracing::info!(%saga_id, step = step.name(), "compensation command sent");
                }
                Err(e) => {
                    tracing::error!(
                        %saga_id,
                        step = step.name(),
                        error = %e,
                        "failed to send compensation command"
                    );
                }
            }
        }
    }

    /// Returns a snapshot of the instance with the given ID.
    pub fn get_instance(&self, saga_id: SagaId) -> Option<SagaInstance> {
        self.instances
            .read()
            .unwrap()
            .get(&saga_id)
            .map(|e| e.instance.clone())
    }

    /// Returns the IDs of all instances known to this orchestrator.
    pub fn instance_ids(&self) -> Vec<SagaId> {
        self.instances.read().unwrap().keys().copied().collect()
    }

    fn insert(&self, execution: SagaExecution<D>) {
        self.instances
            .write()
            .unwrap()
            .insert(execution.instance.id(), execution);
    }
}

impl<D: SagaData + Clone> SagaOrchestrator<D> {
    /// Returns a snapshot of the saga data for the given instance.
    pub fn get_data(&self, saga_id: SagaId) -> Option<D> {
        self.instances
            .read()
            .unwrap()
            .get(&saga_id)
            .map(|e| e.data.clone())
    }
}

impl<D> std::fmt::Debug for SagaOrchestrator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaOrchestrator")
            .field("saga_type", &self.definition.saga_type())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, LocationId, SecuritySystemId};
    use messaging::{
        CUSTOMER_SERVICE_CHANNEL, Command, CommandWithDestination, InMemoryCommandChannel, Reply,
        ReplyKind, SECURITY_SYSTEM_SERVICE_CHANNEL,
    };

    #[derive(Debug, Clone, Default)]
    struct TestData {
        saga_id: Option<SagaId>,
        location_id: i64,
        validated: bool,
        created_id: Option<i64>,
        failed: bool,
    }

    impl SagaData for TestData {
        fn set_saga_id(&mut self, saga_id: SagaId) {
            self.saga_id = Some(saga_id);
        }

        fn saga_id(&self) -> Option<SagaId> {
            self.saga_id
        }
    }

    fn definition() -> SagaDefinition<TestData> {
        SagaDefinition::builder("Test", "test-saga-reply")
            .step("validate", |data: &TestData| {
                CommandWithDestination::send(Command::ValidateLocation {
                    location_id: LocationId::new(data.location_id),
                })
                .to(CUSTOMER_SERVICE_CHANNEL)
            })
            .on_reply(ReplyKind::LocationValidated, |data, _| {
                data.validated = true;
            })
            .on_reply(ReplyKind::LocationNotFound, |data, _| {
                data.failed = true;
            })
            .with_compensation(|data: &TestData| {
                data.created_id.map(|id| {
                    CommandWithDestination::send(Command::UpdateCreationFailed {
                        security_system_id: SecuritySystemId::new(id),
                        reason: "test".to_string(),
                    })
                    .to(SECURITY_SYSTEM_SERVICE_CHANNEL)
                })
            })
            .step("create", |data: &TestData| {
                CommandWithDestination::send(Command::CreateSecuritySystemWithLocationId {
                    location_id: LocationId::new(data.location_id),
                    location_name: "Test".to_string(),
                })
                .to(SECURITY_SYSTEM_SERVICE_CHANNEL)
            })
            .on_reply(ReplyKind::SecuritySystemCreated, |data, reply| {
                if let Reply::SecuritySystemCreated { security_system_id } = reply {
                    data.created_id = Some(security_system_id.value());
                }
            })
            .on_reply(ReplyKind::LocationAlreadyHasSecuritySystem, |data, _| {
                data.failed = true;
            })
            .build()
    }

    fn setup() -> (SagaOrchestrator<TestData>, Arc<InMemoryCommandChannel>) {
        let channel = Arc::new(InMemoryCommandChannel::new());
        let orchestrator =
            SagaOrchestrator::new(definition(), channel.clone() as Arc<dyn CommandChannel>);
        (orchestrator, channel)
    }

    fn location_validated() -> Reply {
        Reply::LocationValidated {
            location_id: LocationId::new(1),
            location_name: "Warehouse".to_string(),
            customer_id: CustomerId::new(200),
        }
    }

    #[tokio::test]
    async fn test_start_sends_first_command_and_stamps_saga_id() {
        let (orchestrator, channel) = setup();
        let saga_id = SagaId::new();

        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();

        let sent = channel.drain(CUSTOMER_SERVICE_CHANNEL);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].saga_id, saga_id);
        assert_eq!(sent[0].reply_to, "test-saga-reply");

        let data = orchestrator.get_data(saga_id).unwrap();
        assert_eq!(data.saga_id(), Some(saga_id));

        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.status(), SagaStatus::Started);
        assert_eq!(instance.current_step(), 0);
    }

    #[tokio::test]
    async fn test_success_reply_advances_and_sends_next_command() {
        let (orchestrator, channel) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();
        channel.drain(CUSTOMER_SERVICE_CHANNEL);

        orchestrator
            .handle_reply(ReplyMessage::success(saga_id, location_validated()))
            .await
            .unwrap();

        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.current_step(), 1);
        assert_eq!(instance.status(), SagaStatus::Started);
        assert!(orchestrator.get_data(saga_id).unwrap().validated);
        assert_eq!(channel.queued_count(SECURITY_SYSTEM_SERVICE_CHANNEL), 1);
    }

    #[tokio::test]
    async fn test_last_step_success_completes_saga() {
        let (orchestrator, channel) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();

        orchestrator
            .handle_reply(ReplyMessage::success(saga_id, location_validated()))
            .await
            .unwrap();
        orchestrator
            .handle_reply(ReplyMessage::success(
                saga_id,
                Reply::SecuritySystemCreated {
                    security_system_id: SecuritySystemId::new(300),
                },
            ))
            .await
            .unwrap();

        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.status(), SagaStatus::Completed);
        assert_eq!(orchestrator.get_data(saga_id).unwrap().created_id, Some(300));
        // No compensation traffic
        assert_eq!(channel.sent_total(), 2);
    }

    #[tokio::test]
    async fn test_first_step_failure_rolls_back_without_commands() {
        let (orchestrator, channel) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();
        channel.drain(CUSTOMER_SERVICE_CHANNEL);

        orchestrator
            .handle_reply(ReplyMessage::failure(saga_id, Reply::LocationNotFound))
            .await
            .unwrap();

        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.status(), SagaStatus::RolledBack);
        assert!(orchestrator.get_data(saga_id).unwrap().failed);
        // No step completed before the failure, so nothing was compensated.
        assert_eq!(channel.queued_count(SECURITY_SYSTEM_SERVICE_CHANNEL), 0);
        assert_eq!(channel.queued_count(CUSTOMER_SERVICE_CHANNEL), 0);
    }

    #[tokio::test]
    async fn test_second_step_failure_runs_compensation_in_reverse() {
        let (orchestrator, channel) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();

        orchestrator
            .handle_reply(ReplyMessage::success(saga_id, location_validated()))
            .await
            .unwrap();
        channel.drain(CUSTOMER_SERVICE_CHANNEL);
        channel.drain(SECURITY_SYSTEM_SERVICE_CHANNEL);

        // Simulate the first step having had an external effect to undo.
        // Failure at the second step should compensate step one.
        orchestrator
            .handle_reply(ReplyMessage::failure(
                saga_id,
                Reply::LocationAlreadyHasSecuritySystem {
                    location_id: LocationId::new(1),
                },
            ))
            .await
            .unwrap();

        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.status(), SagaStatus::RolledBack);
        // The test definition's compensation only fires once created_id is
        // set, which this run never did.
        assert_eq!(channel.queued_count(SECURITY_SYSTEM_SERVICE_CHANNEL), 0);
    }

    #[tokio::test]
    async fn test_unknown_saga_reply_is_ignored() {
        let (orchestrator, _) = setup();

        let result = orchestrator
            .handle_reply(ReplyMessage::success(SagaId::new(), location_validated()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_reply_after_completion_is_ignored() {
        let (orchestrator, _) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();

        orchestrator
            .handle_reply(ReplyMessage::success(saga_id, location_validated()))
            .await
            .unwrap();
        orchestrator
            .handle_reply(ReplyMessage::success(
                saga_id,
                Reply::SecuritySystemCreated {
                    security_system_id: SecuritySystemId::new(300),
                },
            ))
            .await
            .unwrap();

        // Redelivery of the terminal reply.
        let result = orchestrator
            .handle_reply(ReplyMessage::success(
                saga_id,
                Reply::SecuritySystemCreated {
                    security_system_id: SecuritySystemId::new(300),
                },
            ))
            .await;
        assert!(result.is_ok());
        assert_eq!(
            orchestrator.get_instance(saga_id).unwrap().status(),
            SagaStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_unexpected_reply_kind_is_an_error() {
        let (orchestrator, _) = setup();
        let saga_id = SagaId::new();
        orchestrator
            .start(saga_id, TestData::default())
            .await
            .unwrap();

        let result = orchestrator
            .handle_reply(ReplyMessage::success(saga_id, Reply::LocationNoted))
            .await;
        assert!(matches!(result, Err(SagaError::UnexpectedReply { .. })));
        // The instance is left waiting at its current step.
        let instance = orchestrator.get_instance(saga_id).unwrap();
        assert_eq!(instance.current_step(), 0);
        assert_eq!(instance.status(), SagaStatus::Started);
    }

    #[tokio::test]
    async fn test_start_failure_leaves_no_instance_behind() {
        let channel = Arc::new(InMemoryCommandChannel::new());
        channel.set_fail_on_send(true);
        let orchestrator =
            SagaOrchestrator::new(definition(), channel.clone() as Arc<dyn CommandChannel>);

        let saga_id = SagaId::new();
        let result = orchestrator.start(saga_id, TestData::default()).await;
        assert!(matches!(result, Err(SagaError::Channel(_))));
        assert!(orchestrator.get_instance(saga_id).is_none());
    }
}
