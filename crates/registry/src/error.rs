use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while resolving an action URI.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("action URI is empty")]
    EmptyUri,

    #[error("no module or argument schema found for '{uri}'")]
    NotFound { uri: String },

    #[error("'{uri}' belongs to a platform namespace and has no application override tree")]
    PlatformUri { uri: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    InvalidDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ResolveError {
    /// Wire-level error code recorded in `headers.execute.error`.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::EmptyUri | ResolveError::NotFound { .. } | ResolveError::PlatformUri { .. } => "ERESOLVE",
            ResolveError::Io { .. } | ResolveError::InvalidDocument { .. } => "EFETCH",
        }
    }
}
