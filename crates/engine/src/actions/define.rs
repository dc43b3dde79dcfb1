use std::fs;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};
use spl_registry::utils::MANIFEST_FILE;
use spl_types::{ModuleManifest, PipelineDescriptor, WorkspaceRecord};
use tracing::info;

use crate::{
    executor::{ActionScope, Completion},
    workspace::defined_action_key,
};

pub const ACTION_DEFINE_ACTION: &str = "spl/action/define";

#[derive(Debug, Deserialize)]
struct Definition {
    uri: String,
    pipeline: Vec<PipelineDescriptor>,
    #[serde(default)]
    description: Option<String>,
    /// Also write the manifest into the application override tree.
    #[serde(default)]
    save: bool,
}

/// Installs a template action for the rest of the run.
///
/// Parameters: `uri`, `pipeline` (descriptors, placeholders allowed),
/// optional `description` and `save`. With `save` the manifest is written to
/// `apps/<app>/modules/<rest>/index.json` and becomes an override for later
/// runs.
pub fn define_action(scope: &mut ActionScope<'_>) -> Result<Completion> {
    let definition: Definition =
        serde_json::from_value(Value::Object(scope.params())).context("invalid action definition")?;
    let uri = definition.uri.trim().trim_matches('/').to_string();
    if uri.is_empty() {
        bail!("action definition needs a non-empty 'uri'");
    }
    if definition.pipeline.iter().any(|descriptor| descriptor.action == uri) {
        bail!("action '{uri}' cannot invoke itself");
    }

    let manifest = ModuleManifest {
        description: definition.description,
        handler: None,
        pipeline: Some(definition.pipeline),
    };
    let document = serde_json::to_value(&manifest)?;

    let mut saved = Value::Null;
    if definition.save {
        let dir = scope.resolver.override_dir(&uri)?;
        fs::create_dir_all(&dir).with_context(|| format!("failed to create '{}'", dir.display()))?;
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_string_pretty(&document)?)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(%uri, path = %path.display(), "action definition saved");
        saved = Value::String(path.to_string_lossy().to_string());
    }

    scope.workspace.set(defined_action_key(&uri), WorkspaceRecord::from_value(document));
    scope.request.set_value(ACTION_DEFINE_ACTION, json!({ "uri": uri, "saved": saved }));
    Ok(Completion::Completed)
}
