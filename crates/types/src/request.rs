//! The request record threaded through every dispatched action.
//!
//! A [`RequestRecord`] is the `{headers, value}` envelope: `headers` carries
//! execution metadata (the pending pipeline, history, error and per-action
//! config namespaces) and `value` is the payload area where actions publish
//! results under API-scoped keys.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use spl_util::json_path::{get_path, set_path, split_path};

use crate::PipelineDescriptor;

const EXECUTE_KEY: &str = "execute";

/// Wire-level error object stored at `headers.execute.error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub message: String,
    pub code: String,
    /// URI of the action (or engine phase) that raised the error.
    pub operation: String,
}

impl ExecutionError {
    pub fn new(code: impl Into<String>, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            operation: operation.into(),
        }
    }
}

/// What happened to a dispatched descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOutcome {
    Completed,
    Pipeline,
    Repeat,
    Error,
    Fatal,
}

/// One line of the execution history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    /// Remaining TTL after this dispatch was charged.
    pub ttl: u32,
    pub outcome: HistoryOutcome,
    /// Number of descriptors installed when `outcome` is `pipeline`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(action: impl Into<String>, ttl: u32, outcome: HistoryOutcome) -> Self {
        Self {
            action: action.into(),
            ttl,
            outcome,
            queued: None,
            message: None,
            at: Utc::now(),
        }
    }
}

/// Engine-owned part of the headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteHeaders {
    /// Pending descriptors, front is dispatched next.
    #[serde(default)]
    pub pipeline: VecDeque<PipelineDescriptor>,
    /// Descriptor currently being dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<PipelineDescriptor>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

/// Execution metadata half of the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers {
    #[serde(default)]
    pub execute: ExecuteHeaders,
    /// Everything else: `app`, `command` and one namespace per configured action URI.
    #[serde(flatten)]
    pub namespaces: JsonMap<String, Value>,
}

/// The `{headers, value}` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub value: JsonMap<String, Value>,
}

impl RequestRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record whose pipeline is seeded with `pipeline`.
    pub fn with_pipeline(pipeline: impl IntoIterator<Item = PipelineDescriptor>) -> Self {
        let mut record = Self::default();
        record.headers.execute.pipeline = pipeline.into_iter().collect();
        record
    }

    /// Reads config persisted for `action`; the whole namespace when `key` is `None`.
    pub fn config(&self, action: &str, key: Option<&str>) -> Option<&Value> {
        let namespace = self.headers.namespaces.get(action)?;
        match key {
            Some(key) => namespace.as_object()?.get(key),
            None => Some(namespace),
        }
    }

    /// Persists `value` under `key` in the config namespace of `action`,
    /// creating the namespace on first use.
    pub fn set_config(&mut self, action: &str, key: &str, value: Value) {
        let namespace = self
            .headers
            .namespaces
            .entry(action.to_string())
            .or_insert_with(|| Value::Object(JsonMap::new()));
        if !namespace.is_object() {
            *namespace = Value::Object(JsonMap::new());
        }
        if let Value::Object(map) = namespace {
            map.insert(key.to_string(), value);
        }
    }

    /// Parameters of the step being dispatched; one parameter when `key` is given.
    pub fn action(&self, key: Option<&str>) -> Option<Value> {
        let current = self.headers.execute.current.as_ref()?;
        match key {
            Some(key) => current.params.get(key).cloned(),
            None => Some(Value::Object(current.params.clone())),
        }
    }

    /// URI of the step being dispatched.
    pub fn current_action(&self) -> Option<&str> {
        self.headers.execute.current.as_ref().map(|current| current.action.as_str())
    }

    /// Dotted-path read into `headers`, `None` on any missing segment.
    pub fn rc_get(&self, path: &str) -> Option<Value> {
        let segments = split_path(path);
        let (first, rest) = segments.split_first()?;
        if *first == EXECUTE_KEY {
            let execute = serde_json::to_value(&self.headers.execute).ok()?;
            return get_path(&execute, &rest.join(".")).cloned();
        }
        let root = self.headers.namespaces.get(*first)?;
        get_path(root, &rest.join(".")).cloned()
    }

    /// Dotted-path write into `headers`.
    ///
    /// Parents must already exist; the engine-owned `execute` subtree is
    /// read-only through this accessor. Returns whether the write happened.
    pub fn rc_set(&mut self, path: &str, value: Value) -> bool {
        if split_path(path).first().is_none_or(|first| *first == EXECUTE_KEY) {
            return false;
        }
        set_path(&mut self.headers.namespaces, path, value, false)
    }

    pub fn pipeline(&self) -> &VecDeque<PipelineDescriptor> {
        &self.headers.execute.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut VecDeque<PipelineDescriptor> {
        &mut self.headers.execute.pipeline
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        self.headers.execute.error.as_ref()
    }

    pub fn set_error(&mut self, error: ExecutionError) {
        self.headers.execute.error = Some(error);
    }

    pub fn clear_error(&mut self) -> Option<ExecutionError> {
        self.headers.execute.error.take()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.headers.execute.history
    }

    /// Publishes a result under an API-scoped key of `value`.
    pub fn set_value(&mut self, api: &str, value: Value) {
        self.value.insert(api.to_string(), value);
    }

    pub fn value_of(&self, api: &str) -> Option<&Value> {
        self.value.get(api)
    }
}

/// A workspace entry: the same `{headers, value}` shape, untyped headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    #[serde(default)]
    pub headers: JsonMap<String, Value>,
    #[serde(default)]
    pub value: Value,
}

impl WorkspaceRecord {
    pub fn from_value(value: Value) -> Self {
        Self {
            headers: JsonMap::new(),
            value,
        }
    }

    /// Entry recording that the resource could not be fetched.
    pub fn failed(error: ExecutionError) -> Self {
        let mut headers = JsonMap::new();
        if let Ok(error) = serde_json::to_value(error) {
            headers.insert("error".into(), error);
        }
        Self {
            headers,
            value: Value::Null,
        }
    }

    pub fn error(&self) -> Option<ExecutionError> {
        self.headers
            .get("error")
            .and_then(|error| serde_json::from_value(error.clone()).ok())
    }
}
