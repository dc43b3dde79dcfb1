use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map as JsonMap, Value};
use spl_registry::ActionResolver;
use spl_types::{PipelineDescriptor, RequestRecord};

use crate::{context::ExecutionContext, workspace::WorkspaceStore};

/// How a handler finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Nothing further to schedule.
    Completed,
    /// Install these descriptors ahead of the remaining pipeline.
    Pipeline(Vec<PipelineDescriptor>),
    /// Dispatch the same descriptor again (costs one more step).
    Repeat,
}

/// Everything a handler may touch while it runs.
pub struct ActionScope<'a> {
    pub request: &'a mut RequestRecord,
    pub context: &'a mut ExecutionContext,
    pub workspace: &'a mut WorkspaceStore,
    pub resolver: &'a ActionResolver,
}

impl ActionScope<'_> {
    /// URI of the descriptor being dispatched.
    pub fn action(&self) -> &str {
        &self.context.action
    }

    /// Parameters of the descriptor being dispatched.
    pub fn params(&self) -> JsonMap<String, Value> {
        match self.request.action(None) {
            Some(Value::Object(params)) => params,
            _ => JsonMap::new(),
        }
    }

    /// Reads and deserializes one parameter; `Ok(None)` when it is absent or null.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.request.action(Some(name)) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .with_context(|| format!("invalid parameter '{name}' for '{}'", self.action())),
        }
    }

    /// See [`WorkspaceStore::exists`].
    pub fn exists(&mut self, uri: &str, fetch_action: &str, fetch_args: JsonMap<String, Value>, blocking: bool) -> bool {
        self.workspace.exists(self.request, uri, fetch_action, fetch_args, blocking)
    }

    /// See [`WorkspaceStore::exists_all`].
    pub fn exists_all(&mut self, uris: &[&str], fetch_action: &str, fetch_args: JsonMap<String, Value>, blocking: bool) -> bool {
        self.workspace.exists_all(self.request, uris, fetch_action, fetch_args, blocking)
    }
}

/// Executes one action.
///
/// Handlers may read and write the request, context and workspace through the
/// scope. Returning `Err` records an action error and execution continues with
/// the next descriptor; only engine conditions (TTL, resolution) stop a run.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, scope: &mut ActionScope<'_>) -> Result<Completion>;
}

struct FnHandler<F>(F);

impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&mut ActionScope<'_>) -> Result<Completion> + Send + Sync,
{
    fn handle(&self, scope: &mut ActionScope<'_>) -> Result<Completion> {
        (self.0)(scope)
    }
}

/// Compiled-in handlers keyed by handler name (usually the action URI).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: IndexMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl ActionHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Registers a closure as a handler.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut ActionScope<'_>) -> Result<Completion> + Send + Sync + 'static,
    {
        self.register(name, FnHandler(handler));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(name).map(|handler| handler.as_ref())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}
