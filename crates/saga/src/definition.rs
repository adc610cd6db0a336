//! Declarative saga definitions.
//!
//! A [`SagaDefinition`] is an ordered list of steps, each holding an invoke
//! function (current data to outbound command), a map of reply handlers
//! keyed by [`ReplyKind`], and an optional compensation. The definition is
//! plain data consumed generically by the orchestrator; the flow modules
//! build one with the fluent builder:
//!
//! ```ignore
//! SagaDefinition::builder(SAGA_TYPE, REPLY_CHANNEL)
//!     .step(STEP_VALIDATE_LOCATION, |data| proxy.validate_location(data.location_id))
//!     .on_reply(ReplyKind::LocationValidated, |data, reply| { ... })
//!     .on_reply(ReplyKind::LocationNotFound, |data, _| { ... })
//!     .step(...)
//!     ...
//!     .build()
//! ```

use std::collections::HashMap;

use common::SagaId;
use messaging::{CommandWithDestination, Reply, ReplyKind};

/// Saga data carried across steps of one saga run.
///
/// Owned exclusively by the orchestrator for the lifetime of the run; the
/// saga ID is stamped on it before the first command is sent so reply
/// handlers can correlate completion signals.
pub trait SagaData: Send + Sync + 'static {
    /// Records the instance ID assigned when the saga starts.
    fn set_saga_id(&mut self, saga_id: SagaId);

    /// Returns the instance ID, if the saga has started.
    fn saga_id(&self) -> Option<SagaId>;
}

type InvokeFn<D> = Box<dyn Fn(&D) -> CommandWithDestination + Send + Sync>;
type CompensationFn<D> = Box<dyn Fn(&D) -> Option<CommandWithDestination> + Send + Sync>;
type ReplyHandlerFn<D> = Box<dyn Fn(&mut D, &Reply) + Send + Sync>;
type RolledBackFn<D> = Box<dyn Fn(&D) + Send + Sync>;

/// One step of a saga: invoke action, reply handlers, optional compensation.
pub struct SagaStep<D> {
    name: &'static str,
    invoke: InvokeFn<D>,
    handlers: HashMap<ReplyKind, ReplyHandlerFn<D>>,
    compensation: Option<CompensationFn<D>>,
}

impl<D> SagaStep<D> {
    /// Returns the step name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the outbound command for this step from current saga data.
    pub fn invoke(&self, data: &D) -> CommandWithDestination {
        (self.invoke)(data)
    }

    /// Runs the handler registered for the given reply, if any.
    ///
    /// Returns false when no handler accepts this reply kind.
    pub fn handle_reply(&self, data: &mut D, reply: &Reply) -> bool {
        match self.handlers.get(&reply.kind()) {
            Some(handler) => {
                handler(data, reply);
                true
            }
            None => false,
        }
    }

    /// Builds this step's compensating command, if the step declared one and
    /// the data holds what it needs.
    pub fn compensate(&self, data: &D) -> Option<CommandWithDestination> {
        self.compensation.as_ref().and_then(|comp| comp(data))
    }

    /// Returns true if the step declared a compensating action.
    pub fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }
}

/// An ordered, compensable workflow description.
pub struct SagaDefinition<D> {
    saga_type: &'static str,
    reply_channel: &'static str,
    steps: Vec<SagaStep<D>>,
    on_rolled_back: Option<RolledBackFn<D>>,
}

impl<D> SagaDefinition<D> {
    /// Starts building a definition.
    pub fn builder(
        saga_type: &'static str,
        reply_channel: &'static str,
    ) -> SagaDefinitionBuilder<D> {
        SagaDefinitionBuilder {
            saga_type,
            reply_channel,
            steps: Vec::new(),
            on_rolled_back: None,
        }
    }

    /// Returns the saga type name.
    pub fn saga_type(&self) -> &'static str {
        self.saga_type
    }

    /// Returns the channel replies for this saga arrive on.
    pub fn reply_channel(&self) -> &'static str {
        self.reply_channel
    }

    /// Returns the ordered steps.
    pub fn steps(&self) -> &[SagaStep<D>] {
        &self.steps
    }

    /// Returns the step at the given index, if it exists.
    pub fn step(&self, index: usize) -> Option<&SagaStep<D>> {
        self.steps.get(index)
    }

    /// Invokes the rolled-back hook, if one was registered.
    pub fn notify_rolled_back(&self, data: &D) {
        if let Some(hook) = &self.on_rolled_back {
            hook(data);
        }
    }
}

/// Fluent builder for [`SagaDefinition`].
pub struct SagaDefinitionBuilder<D> {
    saga_type: &'static str,
    reply_channel: &'static str,
    steps: Vec<SagaStep<D>>,
    on_rolled_back: Option<RolledBackFn<D>>,
}

impl<D> SagaDefinitionBuilder<D> {
    /// Registers a hook fired once after compensation finishes and the saga
    /// is marked rolled back.
    pub fn on_rolled_back(mut self, hook: impl Fn(&D) + Send + Sync + 'static) -> Self {
        self.on_rolled_back = Some(Box::new(hook));
        self
    }

    /// Opens a new step with its invoke action.
    pub fn step(
        self,
        name: &'static str,
        invoke: impl Fn(&D) -> CommandWithDestination + Send + Sync + 'static,
    ) -> StepBuilder<D> {
        StepBuilder {
            definition: self,
            step: SagaStep {
                name,
                invoke: Box::new(invoke),
                handlers: HashMap::new(),
                compensation: None,
            },
        }
    }

    /// Finishes the definition.
    pub fn build(self) -> SagaDefinition<D> {
        SagaDefinition {
            saga_type: self.saga_type,
            reply_channel: self.reply_channel,
            steps: self.steps,
            on_rolled_back: self.on_rolled_back,
        }
    }
}

/// Builder for one step, returned by [`SagaDefinitionBuilder::step`].
pub struct StepBuilder<D> {
    definition: SagaDefinitionBuilder<D>,
    step: SagaStep<D>,
}

impl<D> StepBuilder<D> {
    /// Registers a handler for a reply kind of this step.
    pub fn on_reply(
        mut self,
        kind: ReplyKind,
        handler: impl Fn(&mut D, &Reply) + Send + Sync + 'static,
    ) -> Self {
        self.step.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Declares the compensating action for this step.
    ///
    /// The closure may return `None` when the data does not hold what the
    /// compensation needs (the step never took effect); nothing is sent then.
    pub fn with_compensation(
        mut self,
        compensation: impl Fn(&D) -> Option<CommandWithDestination> + Send + Sync + 'static,
    ) -> Self {
        self.step.compensation = Some(Box::new(compensation));
        self
    }

    /// Closes this step and opens the next one.
    pub fn step(
        self,
        name: &'static str,
        invoke: impl Fn(&D) -> CommandWithDestination + Send + Sync + 'static,
    ) -> StepBuilder<D> {
        self.finish().step(name, invoke)
    }

    /// Closes this step and finishes the definition.
    pub fn build(self) -> SagaDefinition<D> {
        self.finish().build()
    }

    fn finish(mut self) -> SagaDefinitionBuilder<D> {
        self.definition.steps.push(self.step);
        self.definition
    }
}
