//! Action module registry for the SPL runtime.
//!
//! Maps action URIs to implementation manifests and argument schemas by
//! scanning the global `modules/` tree and per-application override trees
//! (`apps/<app>/modules/`) once at startup.

pub mod config;
pub mod error;
pub mod models;
pub mod scan;
pub mod utils;

pub use config::{ConfigError, DEFAULT_TTL, RuntimeConfig, default_config_path};
pub use error::ResolveError;
pub use models::{ActionResolver, ModuleOrigin, ResolvedModule, SchemaLocation};
pub use scan::{ModuleDir, ModuleTree};
