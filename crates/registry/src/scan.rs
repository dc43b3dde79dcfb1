//! Module tree scanning.
//!
//! A module tree is a directory (`modules/` or `apps/<app>/modules/`) whose
//! sub-directories are action URIs. Each directory may hold an `index.json`
//! manifest and any number of `*_arguments.json` schema files. Trees are
//! scanned once; resolution afterwards never touches the filesystem except to
//! read a schema document.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use spl_types::ModuleManifest;
use tracing::{debug, warn};

use crate::{
    ResolveError,
    utils::{MANIFEST_FILE, SCHEMA_FILE_SUFFIX},
};

/// One scanned directory of a module tree.
#[derive(Debug, Clone, Default)]
pub struct ModuleDir {
    pub path: PathBuf,
    /// Parsed `index.json`, when present and valid.
    pub manifest: Option<ModuleManifest>,
    /// File names of the `*_arguments.json` documents in this directory.
    pub schema_files: Vec<String>,
}

impl ModuleDir {
    /// Returns the first of `names` present in this directory.
    pub fn schema_file(&self, names: &[String]) -> Option<PathBuf> {
        names
            .iter()
            .find(|name| self.schema_files.iter().any(|file| file == *name))
            .map(|name| self.path.join(name))
    }
}

/// Directories of one module tree keyed by their `/`-joined relative path.
/// The tree root itself is stored under the empty key.
#[derive(Debug, Clone, Default)]
pub struct ModuleTree {
    root: PathBuf,
    dirs: IndexMap<String, ModuleDir>,
}

impl ModuleTree {
    /// Scans `root`; a missing directory yields an empty tree.
    pub fn scan(root: &Path) -> Result<Self, ResolveError> {
        let mut tree = ModuleTree {
            root: root.to_path_buf(),
            dirs: IndexMap::new(),
        };
        if !root.is_dir() {
            debug!(root = %root.display(), "module tree not present");
            return Ok(tree);
        }
        walk(root, "", &mut tree.dirs)?;
        debug!(root = %root.display(), directories = tree.dirs.len(), "module tree scanned");
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, relative: &str) -> Option<&ModuleDir> {
        self.dirs.get(relative)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Relative paths of the directories that carry a manifest.
    pub fn action_paths(&self) -> impl Iterator<Item = &str> {
        self.dirs
            .iter()
            .filter(|(_, dir)| dir.manifest.is_some())
            .map(|(relative, _)| relative.as_str())
    }
}

fn walk(dir: &Path, relative: &str, dirs: &mut IndexMap<String, ModuleDir>) -> Result<(), ResolveError> {
    let io_error = |source| ResolveError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut module_dir = ModuleDir {
        path: dir.to_path_buf(),
        ..Default::default()
    };
    let mut children = Vec::new();

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            children.push((path, name));
        } else if name == MANIFEST_FILE {
            module_dir.manifest = read_manifest(&path);
        } else if name.ends_with(SCHEMA_FILE_SUFFIX) {
            module_dir.schema_files.push(name);
        }
    }

    dirs.insert(relative.to_string(), module_dir);

    for (path, name) in children {
        let child_relative = if relative.is_empty() {
            name
        } else {
            format!("{relative}/{name}")
        };
        walk(&path, &child_relative, dirs)?;
    }
    Ok(())
}

fn read_manifest(path: &Path) -> Option<ModuleManifest> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) => {
            warn!(path = %path.display(), %error, "module manifest unreadable; directory treated as namespace");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(error) => {
            warn!(path = %path.display(), %error, "module manifest invalid; directory treated as namespace");
            None
        }
    }
}
