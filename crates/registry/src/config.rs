use std::{
    env,
    path::{Path, PathBuf},
};

use dirs_next::config_dir;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spl_util::expand_tilde;
use thiserror::Error;
use tracing::{debug, warn};

/// Default step budget for a top-level invocation.
pub const DEFAULT_TTL: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Runtime settings loaded from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Platform root holding `modules/` and `apps/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Treat leftover command tokens as a parse failure instead of positional residue.
    #[serde(default)]
    pub strict_residue: bool,
    /// Extra application roots, each scanned as `<path>/modules`.
    #[serde(default)]
    pub apps: IndexMap<String, PathBuf>,
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root: None,
            ttl: DEFAULT_TTL,
            strict_residue: false,
            apps: IndexMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Loads the config from [`default_config_path`], falling back to defaults
    /// when the file is missing or malformed.
    pub fn load() -> Self {
        let path = default_config_path();
        if !path.exists() {
            debug!(path = %path.display(), "no runtime config found; using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "ignoring unreadable runtime config");
                Self::default()
            }
        }
    }

    /// Loads the config at `path`; errors are reported to the caller.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves the platform root: config value, then `$SPL_ROOT`, then the cwd.
    pub fn platform_root(&self) -> PathBuf {
        if let Some(root) = self.root.as_ref() {
            return expand_tilde(&root.to_string_lossy());
        }
        if let Ok(root) = env::var("SPL_ROOT")
            && !root.trim().is_empty()
        {
            return expand_tilde(&root);
        }
        env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Get the default path for the runtime configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("SPL_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("spl").join("config.json")
}
