//! Per-run resource cache and the fetch-then-resume protocol.
//!
//! Handlers never block on I/O for a missing resource. Instead they call
//! [`WorkspaceStore::exists`]: when the entry is absent and the call is
//! blocking, a fetch descriptor followed by a copy of the current descriptor
//! is pushed to the front of the pipeline and the handler returns early. The
//! engine dispatches the fetch, then re-enters the handler, which now finds
//! the entry cached.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value};
use spl_types::{PipelineDescriptor, RequestRecord, WorkspaceRecord};
use tracing::{debug, warn};

/// Parameter naming the workspace keys a fetch descriptor must populate.
pub const REFERENCE_PARAM: &str = "reference";

const SCHEMA_KEY_PREFIX: &str = "spl/schema.";
const DEFINED_ACTION_KEY_PREFIX: &str = "spl/action.";

/// Workspace key of the cached argument schema for `uri`.
pub fn schema_key(uri: &str) -> String {
    format!("{SCHEMA_KEY_PREFIX}{uri}")
}

/// Action URI named by a schema key, if `key` is one.
pub fn schema_key_uri(key: &str) -> Option<&str> {
    key.strip_prefix(SCHEMA_KEY_PREFIX)
}

/// Workspace key of a runtime-defined action.
pub fn defined_action_key(uri: &str) -> String {
    format!("{DEFINED_ACTION_KEY_PREFIX}{uri}")
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceStore {
    entries: IndexMap<String, WorkspaceRecord>,
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `uri`, if any.
    pub fn get(&self, uri: &str) -> Option<&WorkspaceRecord> {
        self.entries.get(uri)
    }

    pub fn set(&mut self, uri: impl Into<String>, record: WorkspaceRecord) {
        let uri = uri.into();
        debug!(%uri, failed = record.error().is_some(), "workspace entry stored");
        self.entries.insert(uri, record);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when `uri` is cached.
    ///
    /// When it is not and `blocking` is set, the pipeline front becomes
    /// `[fetch_action, <current descriptor>, ...]` where the fetch descriptor
    /// carries `fetch_args` plus `uri` appended to its `reference` list. The
    /// requeued descriptor drops its TTL override. A non-blocking miss leaves
    /// the pipeline untouched.
    pub fn exists(
        &self,
        request: &mut RequestRecord,
        uri: &str,
        fetch_action: &str,
        fetch_args: JsonMap<String, Value>,
        blocking: bool,
    ) -> bool {
        self.exists_all(request, &[uri], fetch_action, fetch_args, blocking)
    }

    /// Like [`exists`](Self::exists) for several keys at once: a single fetch
    /// descriptor references every missing key, so the caller is re-entered
    /// only once.
    pub fn exists_all(
        &self,
        request: &mut RequestRecord,
        uris: &[&str],
        fetch_action: &str,
        mut fetch_args: JsonMap<String, Value>,
        blocking: bool,
    ) -> bool {
        let missing: Vec<&str> = uris.iter().copied().filter(|uri| !self.contains(uri)).collect();
        if missing.is_empty() {
            return true;
        }
        if !blocking {
            debug!(missing = ?missing, "workspace miss (non-blocking)");
            return false;
        }

        let mut reference = match fetch_args.remove(REFERENCE_PARAM) {
            Some(Value::Array(existing)) => existing,
            Some(Value::String(single)) => vec![Value::String(single)],
            _ => Vec::new(),
        };
        for uri in &missing {
            let uri = Value::String((*uri).to_string());
            if !reference.contains(&uri) {
                reference.push(uri);
            }
        }
        fetch_args.insert(REFERENCE_PARAM.into(), Value::Array(reference));

        match request.headers.execute.current.clone() {
            // The resume copy continues on the remaining budget.
            Some(mut resume) => {
                resume.ttl = None;
                request.pipeline_mut().push_front(resume);
            }
            None => warn!(fetch_action, "workspace fetch scheduled outside of a dispatch; nothing to resume"),
        }
        request
            .pipeline_mut()
            .push_front(PipelineDescriptor::new(fetch_action).with_params(fetch_args));
        debug!(missing = ?missing, fetch_action, "workspace miss; fetch scheduled before re-entry");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dispatching(action: &str) -> RequestRecord {
        let mut request = RequestRecord::with_pipeline([PipelineDescriptor::new("ns/after")]);
        request.headers.execute.current = Some(PipelineDescriptor::new(action).with_param("file", json!("a.txt")));
        request
    }

    #[test]
    fn present_entry_needs_no_fetch() {
        let mut workspace = WorkspaceStore::new();
        workspace.set("res/x", WorkspaceRecord::from_value(json!(1)));
        let mut request = dispatching("ns/read");

        assert!(workspace.exists(&mut request, "res/x", "fetch/x", JsonMap::new(), true));
        assert_eq!(request.pipeline().len(), 1);
    }

    #[test]
    fn blocking_miss_schedules_fetch_then_resume() {
        let workspace = WorkspaceStore::new();
        let mut request = dispatching("ns/read");
        let mut args = JsonMap::new();
        args.insert("reference".into(), json!(["res/a"]));

        assert!(!workspace.exists(&mut request, "res/x", "fetch/x", args, true));

        let actions: Vec<&str> = request.pipeline().iter().map(|entry| entry.action.as_str()).collect();
        assert_eq!(actions, vec!["fetch/x", "ns/read", "ns/after"]);
        assert_eq!(request.pipeline()[0].params["reference"], json!(["res/a", "res/x"]));
        assert_eq!(request.pipeline()[1].params["file"], "a.txt");
    }

    #[test]
    fn resume_copy_drops_ttl_override_but_keeps_app_root() {
        let workspace = WorkspaceStore::new();
        let mut request = RequestRecord::new();
        request.headers.execute.current = Some(PipelineDescriptor::new("ns/read").with_ttl(3).with_app_root("/srv/usr"));

        assert!(!workspace.exists(&mut request, "res/x", "fetch/x", JsonMap::new(), true));
        let resume = &request.pipeline()[1];
        assert_eq!(resume.action, "ns/read");
        assert_eq!(resume.ttl, None);
        assert_eq!(resume.app_root.as_deref(), Some("/srv/usr"));
    }

    #[test]
    fn non_blocking_miss_leaves_pipeline_alone() {
        let workspace = WorkspaceStore::new();
        let mut request = dispatching("ns/read");
        assert!(!workspace.exists(&mut request, "res/x", "fetch/x", JsonMap::new(), false));
        assert_eq!(request.pipeline().len(), 1);
    }

    #[test]
    fn exists_all_references_only_missing_keys() {
        let mut workspace = WorkspaceStore::new();
        workspace.set("res/a", WorkspaceRecord::from_value(json!(1)));
        let mut request = dispatching("ns/read");

        assert!(!workspace.exists_all(&mut request, &["res/a", "res/b", "res/c"], "fetch/x", JsonMap::new(), true));
        assert_eq!(request.pipeline().len(), 3);
        assert_eq!(request.pipeline()[0].params["reference"], json!(["res/b", "res/c"]));
    }

    #[test]
    fn key_helpers() {
        assert_eq!(schema_key("ns/read"), "spl/schema.ns/read");
        assert_eq!(schema_key_uri("spl/schema.ns/read"), Some("ns/read"));
        assert_eq!(schema_key_uri("other"), None);
        assert_eq!(defined_action_key("usr/x"), "spl/action.usr/x");
    }
}
