//! Resolution and invocation of a single dispatched descriptor.

use spl_types::{ModuleKind, ModuleManifest};
use tracing::debug;

use super::runner::{ActionScope, Completion, HandlerRegistry};
use crate::{
    error::EngineError,
    templates::{TemplateArguments, expand_template},
    workspace::defined_action_key,
};

/// Why a step did not complete normally.
pub(crate) enum StepError {
    /// The handler failed; the run continues.
    Action(anyhow::Error),
    /// The engine cannot proceed.
    Fatal(EngineError),
}

impl From<EngineError> for StepError {
    fn from(error: EngineError) -> Self {
        StepError::Fatal(error)
    }
}

/// Finds the implementation of `action` and runs it.
///
/// Lookup order: runtime-defined actions in the workspace, then the module
/// trees (override first), then handlers registered under the URI itself.
pub(crate) fn run_step(action: &str, handlers: &HandlerRegistry, scope: &mut ActionScope<'_>) -> Result<Completion, StepError> {
    if let Some(record) = scope.workspace.get(&defined_action_key(action)) {
        let manifest: ModuleManifest =
            serde_json::from_value(record.value.clone()).map_err(|source| EngineError::InvalidDefinition {
                action: action.to_string(),
                source,
            })?;
        if let Some(completion) = run_manifest(action, &manifest, handlers, scope)? {
            debug!(action, "dispatched runtime-defined action");
            return Ok(completion);
        }
    }

    if let Some(module) = scope.resolver.resolve_module(action).map_err(EngineError::from)? {
        if let Some(completion) = run_manifest(action, &module.manifest, handlers, scope)? {
            debug!(action, origin = ?module.origin, path = %module.path.display(), "dispatched module action");
            return Ok(completion);
        }
    }

    match handlers.get(action) {
        Some(handler) => handler.handle(scope).map_err(StepError::Action),
        None => Err(StepError::Fatal(EngineError::Unresolvable {
            action: action.to_string(),
        })),
    }
}

/// `Ok(None)` when the manifest only marks a namespace.
fn run_manifest(
    action: &str,
    manifest: &ModuleManifest,
    handlers: &HandlerRegistry,
    scope: &mut ActionScope<'_>,
) -> Result<Option<Completion>, StepError> {
    match manifest.kind() {
        ModuleKind::Handler(name) => {
            let handler = handlers.get(name).ok_or_else(|| EngineError::MissingHandler {
                action: action.to_string(),
                handler: name.to_string(),
            })?;
            handler.handle(scope).map(Some).map_err(StepError::Action)
        }
        ModuleKind::Template(pipeline) => {
            let arguments = TemplateArguments::from_params(&scope.params());
            Ok(Some(Completion::Pipeline(expand_template(pipeline, &arguments))))
        }
        ModuleKind::Namespace => Ok(None),
    }
}
