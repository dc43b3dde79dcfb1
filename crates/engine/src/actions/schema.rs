use anyhow::Result;
use spl_registry::ResolveError;
use spl_types::{ArgumentSchema, ExecutionError, WorkspaceRecord};
use tracing::{debug, warn};

use crate::{
    executor::{ActionScope, Completion},
    parser::{SchemaLookup, SchemaSource},
    workspace::{REFERENCE_PARAM, WorkspaceStore, defined_action_key, schema_key, schema_key_uri},
};

pub const SCHEMA_FETCH_ACTION: &str = "spl/schema/fetch";

/// Loads the schemas named by the `reference` parameter into the workspace.
///
/// A schema that cannot be found or read is cached as a failed entry, so the
/// waiting handler sees the failure instead of scheduling the fetch again.
/// Runtime-defined actions without a schema file get an empty schema.
pub fn fetch_schemas(scope: &mut ActionScope<'_>) -> Result<Completion> {
    let references: Vec<String> = scope.param(REFERENCE_PARAM)?.unwrap_or_default();

    for key in references {
        let Some(uri) = schema_key_uri(&key) else {
            warn!(%key, "fetch reference is not a schema key; skipped");
            continue;
        };
        let record = match scope.resolver.load_schema(uri) {
            Ok(schema) => WorkspaceRecord::from_value(serde_json::to_value(schema)?),
            Err(ResolveError::NotFound { .. }) if scope.workspace.contains(&defined_action_key(uri)) => {
                WorkspaceRecord::from_value(serde_json::to_value(ArgumentSchema::default())?)
            }
            Err(error) => {
                if matches!(error, ResolveError::NotFound { .. }) {
                    debug!(uri, "no argument schema");
                } else {
                    warn!(uri, %error, "argument schema could not be loaded");
                }
                WorkspaceRecord::failed(ExecutionError::new(error.code(), SCHEMA_FETCH_ACTION, error.to_string()))
            }
        };
        scope.workspace.set(key, record);
    }

    Ok(Completion::Completed)
}

/// Reads a fetched schema entry.
pub(crate) fn cached_schema(workspace: &WorkspaceStore, uri: &str) -> SchemaLookup {
    let Some(record) = workspace.get(&schema_key(uri)) else {
        return SchemaLookup::Missing(format!("schema for '{uri}' was not fetched"));
    };
    if let Some(error) = record.error() {
        return SchemaLookup::Missing(error.message);
    }
    match serde_json::from_value(record.value.clone()) {
        Ok(schema) => SchemaLookup::Ready(schema),
        Err(error) => SchemaLookup::Missing(format!("cached schema for '{uri}' is invalid: {error}")),
    }
}

/// Schema source backed by the workspace: a miss schedules
/// `spl/schema/fetch` ahead of the current descriptor and reports `Pending`.
pub(crate) struct WorkspaceSchemas<'a, 'b> {
    pub scope: &'a mut ActionScope<'b>,
}

impl SchemaSource for WorkspaceSchemas<'_, '_> {
    fn lookup(&mut self, uri: &str) -> SchemaLookup {
        if !self.scope.exists(&schema_key(uri), SCHEMA_FETCH_ACTION, Default::default(), true) {
            return SchemaLookup::Pending;
        }
        cached_schema(self.scope.workspace, uri)
    }
}
