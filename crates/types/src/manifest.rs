//! Module manifests (`index.json`) found in module trees.

use serde::{Deserialize, Serialize};

use crate::PipelineDescriptor;

/// Implementation file of a module directory.
///
/// Exactly one of `handler` or `pipeline` is expected; `handler` wins when
/// both are present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of a compiled-in handler to bind this URI to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Template pipeline expanded in place of this URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<PipelineDescriptor>>,
}

/// How a manifest implements its action.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleKind<'a> {
    Handler(&'a str),
    Template(&'a [PipelineDescriptor]),
    /// Directory exists but declares no implementation (a namespace).
    Namespace,
}

impl ModuleManifest {
    pub fn handler(name: impl Into<String>) -> Self {
        Self {
            handler: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn template(pipeline: Vec<PipelineDescriptor>) -> Self {
        Self {
            pipeline: Some(pipeline),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> ModuleKind<'_> {
        if let Some(handler) = self.handler.as_deref() {
            return ModuleKind::Handler(handler);
        }
        match self.pipeline.as_deref() {
            Some(pipeline) => ModuleKind::Template(pipeline),
            None => ModuleKind::Namespace,
        }
    }
}
