//! Pipeline engine: a TTL-bounded state machine over `headers.execute.pipeline`.
//!
//! ```text
//! AwaitingNext --dequeue--> Dispatching --handler done--> AwaitingNext
//! AwaitingNext --empty queue--> Complete
//! Dispatching --ttl exhausted / unresolvable--> Failed
//! ```
//!
//! - Every dispatch (including re-entries after a workspace fetch and repeats)
//!   costs one unit of TTL, charged before the handler runs.
//! - Handlers install sub-pipelines ahead of the remaining queue, so nested
//!   work always finishes before the caller's next step.
//! - A handler error is recorded in `headers.execute.error` and the run goes
//!   on; only engine conditions reach `Failed`.

mod runner;
mod step_once;

use serde::Serialize;
use spl_registry::ActionResolver;
use spl_types::{ExecutionError, HistoryEntry, HistoryOutcome, RequestRecord};
use tracing::{debug, error, info, warn};

pub use runner::{ActionHandler, ActionScope, Completion, HandlerRegistry};
use step_once::{StepError, run_step};

use crate::{
    actions::register_platform_actions,
    context::ExecutionContext,
    error::{EngineError, action_error_code},
    parser::ParserOptions,
    workspace::WorkspaceStore,
};

/// Engine states. `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    AwaitingNext,
    Dispatching,
    Complete,
    Failed,
}

/// Outcome of [`PipelineEngine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub state: EngineState,
    /// Number of handler invocations, re-entries included.
    pub dispatched: usize,
    pub remaining_ttl: u32,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.state == EngineState::Complete
    }
}

#[derive(Debug)]
pub struct PipelineEngine {
    resolver: ActionResolver,
    handlers: HandlerRegistry,
}

impl PipelineEngine {
    pub fn new(resolver: ActionResolver, handlers: HandlerRegistry) -> Self {
        Self { resolver, handlers }
    }

    /// Engine with the `spl/...` platform actions registered.
    pub fn with_platform_actions(resolver: ActionResolver, options: ParserOptions) -> Self {
        let mut handlers = HandlerRegistry::new();
        register_platform_actions(&mut handlers, options);
        Self::new(resolver, handlers)
    }

    pub fn resolver(&self) -> &ActionResolver {
        &self.resolver
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    /// Drains the pipeline of `request` until it is empty or the run fails.
    pub fn run(&self, request: &mut RequestRecord, context: &mut ExecutionContext, workspace: &mut WorkspaceStore) -> RunSummary {
        let mut state = EngineState::AwaitingNext;
        let mut dispatched = 0;
        info!(queued = request.pipeline().len(), ttl = context.ttl, session = %context.session_id, "pipeline run started");

        loop {
            state = match state {
                EngineState::AwaitingNext => self.await_next(request, context),
                EngineState::Dispatching => self.dispatch(request, context, workspace, &mut dispatched),
                EngineState::Complete | EngineState::Failed => break,
            };
        }

        info!(state = ?state, dispatched, ttl = context.ttl, "pipeline run finished");
        RunSummary {
            state,
            dispatched,
            remaining_ttl: context.ttl,
        }
    }

    fn await_next(&self, request: &mut RequestRecord, context: &mut ExecutionContext) -> EngineState {
        if context.take_repeat() && request.headers.execute.current.is_some() {
            debug!(action = %context.action, "repeating current descriptor");
            return EngineState::Dispatching;
        }

        let Some(descriptor) = request.pipeline_mut().pop_front() else {
            request.headers.execute.current = None;
            return EngineState::Complete;
        };
        context.action = descriptor.action.clone();
        if let Some(ttl) = descriptor.ttl {
            context.ttl = ttl;
        }
        if let Some(app_root) = descriptor.app_root.as_ref() {
            context.app_root = Some(app_root.clone());
        }
        request.headers.execute.current = Some(descriptor);
        EngineState::Dispatching
    }

    fn dispatch(
        &self,
        request: &mut RequestRecord,
        context: &mut ExecutionContext,
        workspace: &mut WorkspaceStore,
        dispatched: &mut usize,
    ) -> EngineState {
        let action = context.action.clone();
        let Some(remaining) = context.ttl.checked_sub(1) else {
            return fail(request, context, EngineError::OutOfSteps { action });
        };
        context.ttl = remaining;
        *dispatched += 1;
        debug!(%action, ttl = remaining, "dispatching");

        let mut scope = ActionScope {
            request: &mut *request,
            context: &mut *context,
            workspace: &mut *workspace,
            resolver: &self.resolver,
        };
        let result = run_step(&action, &self.handlers, &mut scope);

        let mut entry = HistoryEntry::new(&action, remaining, HistoryOutcome::Completed);
        match result {
            Ok(Completion::Completed) => {}
            Ok(Completion::Pipeline(pipeline)) => {
                entry.outcome = HistoryOutcome::Pipeline;
                entry.queued = Some(pipeline.len());
                let queue = request.pipeline_mut();
                for descriptor in pipeline.into_iter().rev() {
                    queue.push_front(descriptor);
                }
            }
            Ok(Completion::Repeat) => {
                entry.outcome = HistoryOutcome::Repeat;
                context.request_repeat();
            }
            Err(StepError::Action(action_error)) => {
                let code = action_error_code(&action_error);
                let message = format!("{action_error:#}");
                warn!(%action, %code, error = %message, "action failed; continuing");
                entry.outcome = HistoryOutcome::Error;
                entry.message = Some(message.clone());
                request.set_error(ExecutionError::new(code, &action, message));
            }
            Err(StepError::Fatal(engine_error)) => return fail(request, context, engine_error),
        }
        if entry.outcome == HistoryOutcome::Completed && context.repeat {
            entry.outcome = HistoryOutcome::Repeat;
        }
        request.headers.execute.history.push(entry);
        EngineState::AwaitingNext
    }
}

fn fail(request: &mut RequestRecord, context: &ExecutionContext, engine_error: EngineError) -> EngineState {
    let action = context.action.clone();
    let message = engine_error.to_string();
    error!(%action, code = engine_error.code(), error = %message, "pipeline failed");

    let mut entry = HistoryEntry::new(&action, context.ttl, HistoryOutcome::Fatal);
    entry.message = Some(message.clone());
    request.headers.execute.history.push(entry);
    request.set_error(ExecutionError::new(engine_error.code(), &action, message));
    EngineState::Failed
}
