use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use spl_types::{ArgumentSchema, ModuleManifest, is_platform_namespace};
use tracing::{debug, info};

use crate::{
    ResolveError, RuntimeConfig,
    scan::{ModuleDir, ModuleTree},
    utils::{Candidate, INDEX_SCHEMA_FILE, MANIFEST_FILE, lookup_candidates, schema_file_names, uri_segments},
};

/// Which tree satisfied a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOrigin {
    Global,
    Override { app: String },
}

/// Implementation lookup result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule {
    pub uri: String,
    pub origin: ModuleOrigin,
    pub path: PathBuf,
    pub manifest: ModuleManifest,
}

/// Schema lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaLocation {
    /// A schema document on disk.
    File { path: PathBuf, origin: ModuleOrigin },
    /// The URI is a known directory without a schema file; its schema is empty.
    Implicit { origin: ModuleOrigin },
}

/// In-memory registry of the module trees, built once at startup.
///
/// Resolution of an action URI follows the override-then-global rule
/// independently for the implementation (`index.json`) and the argument
/// schema (`<last>_arguments.json` / `index_arguments.json`), so an
/// application can override only one of the two.
#[derive(Debug, Clone, Default)]
pub struct ActionResolver {
    root: Option<PathBuf>,
    global: ModuleTree,
    overrides: IndexMap<String, ModuleTree>,
}

impl ActionResolver {
    /// A resolver without module trees; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scans `<root>/modules` and every `<root>/apps/<app>/modules`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spl_registry::ActionResolver;
    ///
    /// let root = tempfile::tempdir()?;
    /// std::fs::create_dir_all(root.path().join("modules/ns/read"))?;
    /// std::fs::write(root.path().join("modules/ns/read/index.json"), r#"{"handler": "ns/read"}"#)?;
    ///
    /// let resolver = ActionResolver::scan(root.path())?;
    /// assert!(resolver.resolve_module("ns/read")?.is_some());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let root = root.as_ref();
        let mut resolver = ActionResolver {
            root: Some(root.to_path_buf()),
            global: ModuleTree::scan(&root.join("modules"))?,
            overrides: IndexMap::new(),
        };

        let apps_dir = root.join("apps");
        if apps_dir.is_dir() {
            let mut apps = std::fs::read_dir(&apps_dir)
                .map_err(|source| ResolveError::Io {
                    path: apps_dir.clone(),
                    source,
                })?
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().to_string())
                .filter(|name| !name.starts_with('.'))
                .collect::<Vec<_>>();
            apps.sort();
            for app in apps {
                let app_root = apps_dir.join(&app);
                resolver.add_app_root(&app, &app_root)?;
            }
        }

        info!(
            root = %root.display(),
            applications = resolver.overrides.len(),
            "action registry built"
        );
        Ok(resolver)
    }

    /// Scans the configured platform root plus the config's extra app roots.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ResolveError> {
        let mut resolver = Self::scan(config.platform_root())?;
        for (app, path) in &config.apps {
            resolver.add_app_root(app, path)?;
        }
        Ok(resolver)
    }

    /// Registers `<app_root>/modules` as the override tree of `app`,
    /// replacing any previous tree for that application.
    pub fn add_app_root(&mut self, app: &str, app_root: &Path) -> Result<(), ResolveError> {
        let tree = ModuleTree::scan(&app_root.join("modules"))?;
        if tree.is_empty() {
            debug!(app, "application has no module overrides");
        }
        self.overrides.insert(app.to_string(), tree);
        Ok(())
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn lookup(&self, candidate: &Candidate) -> Option<(&ModuleDir, ModuleOrigin)> {
        match candidate {
            Candidate::Override { app, rest } => self
                .overrides
                .get(app)?
                .get(rest)
                .map(|dir| (dir, ModuleOrigin::Override { app: app.clone() })),
            Candidate::Global { path } => self.global.get(path).map(|dir| (dir, ModuleOrigin::Global)),
        }
    }

    /// Finds the implementation manifest for `uri`.
    ///
    /// Returns `Ok(None)` when no tree holds a manifest for the URI; callers
    /// decide whether that is fatal.
    pub fn resolve_module(&self, uri: &str) -> Result<Option<ResolvedModule>, ResolveError> {
        for candidate in lookup_candidates(uri)? {
            let Some((dir, origin)) = self.lookup(&candidate) else {
                continue;
            };
            if let Some(manifest) = dir.manifest.as_ref() {
                debug!(uri, ?origin, path = %dir.path.display(), "module resolved");
                return Ok(Some(ResolvedModule {
                    uri: uri.to_string(),
                    origin,
                    path: dir.path.join(MANIFEST_FILE),
                    manifest: manifest.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// Finds the argument schema for `uri`.
    pub fn resolve_schema(&self, uri: &str) -> Result<SchemaLocation, ResolveError> {
        let names = schema_file_names(uri);
        let mut implicit = None;
        for candidate in lookup_candidates(uri)? {
            let Some((dir, origin)) = self.lookup(&candidate) else {
                continue;
            };
            if let Some(path) = dir.schema_file(&names) {
                debug!(uri, ?origin, path = %path.display(), "argument schema resolved");
                return Ok(SchemaLocation::File { path, origin });
            }
            implicit.get_or_insert(origin);
        }
        implicit
            .map(|origin| SchemaLocation::Implicit { origin })
            .ok_or_else(|| ResolveError::NotFound { uri: uri.to_string() })
    }

    /// Resolves and reads the argument schema for `uri`.
    pub fn load_schema(&self, uri: &str) -> Result<ArgumentSchema, ResolveError> {
        match self.resolve_schema(uri)? {
            SchemaLocation::File { path, .. } => read_schema(&path),
            SchemaLocation::Implicit { .. } => Ok(ArgumentSchema::default()),
        }
    }

    /// Reads `modules/index_arguments.json`, the platform's extension of the
    /// global (empty-URI) schema.
    pub fn load_root_schema(&self) -> Result<Option<ArgumentSchema>, ResolveError> {
        let Some(path) = self
            .global
            .get("")
            .and_then(|dir| dir.schema_file(&[INDEX_SCHEMA_FILE.to_string()]))
        else {
            return Ok(None);
        };
        read_schema(&path).map(Some)
    }

    /// Whether any tree knows `uri` as a directory.
    pub fn contains(&self, uri: &str) -> bool {
        lookup_candidates(uri)
            .map(|candidates| candidates.iter().any(|candidate| self.lookup(candidate).is_some()))
            .unwrap_or(false)
    }

    /// Every URI with an implementation manifest, global first, deduplicated.
    pub fn action_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.global.action_paths().map(str::to_string).collect();
        for (app, tree) in &self.overrides {
            for relative in tree.action_paths() {
                let uri = if relative.is_empty() {
                    app.clone()
                } else {
                    format!("{app}/{relative}")
                };
                if !uris.contains(&uri) {
                    uris.push(uri);
                }
            }
        }
        uris
    }

    /// Directory an application override for `uri` is written to.
    pub fn override_dir(&self, uri: &str) -> Result<PathBuf, ResolveError> {
        let segments = uri_segments(uri);
        let Some((app, rest)) = segments.split_first() else {
            return Err(ResolveError::EmptyUri);
        };
        if is_platform_namespace(app) {
            return Err(ResolveError::PlatformUri { uri: uri.to_string() });
        }
        let app_root = match self.overrides.get(*app) {
            Some(tree) => tree.root().parent().map(Path::to_path_buf),
            None => self.root.as_ref().map(|root| root.join("apps").join(app)),
        }
        .ok_or_else(|| ResolveError::NotFound { uri: uri.to_string() })?;

        Ok(rest.iter().fold(app_root.join("modules"), |path, segment| path.join(segment)))
    }
}

fn read_schema(path: &Path) -> Result<ArgumentSchema, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ResolveError::InvalidDocument {
        path: path.to_path_buf(),
        source,
    })
}
