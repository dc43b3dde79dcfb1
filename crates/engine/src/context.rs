//! Live execution context.
//!
//! Unlike the [`RequestRecord`](spl_types::RequestRecord), the context is never
//! serialized into the pipeline: it holds the engine's view of the current
//! step (URI, remaining TTL, console mode) plus free-form settings that
//! handlers may read and write for the duration of a run.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use tracing::debug;
use uuid::Uuid;

/// Console verbosity selected by the global `--verbose`/`--debug` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    #[default]
    Standard,
    Verbose,
    Debug,
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// URI of the descriptor being dispatched.
    pub action: String,
    /// Remaining step budget.
    pub ttl: u32,
    pub console: ConsoleMode,
    pub cwd: PathBuf,
    pub session_id: String,
    /// Application root propagated from the last dequeued descriptor.
    pub app_root: Option<String>,
    /// Application module overlays in effect (app name to app root).
    pub overlays: IndexMap<String, PathBuf>,
    /// Set by a handler to have its descriptor dispatched again.
    pub repeat: bool,
    settings: JsonMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(ttl: u32) -> Self {
        Self {
            action: String::new(),
            ttl,
            console: ConsoleMode::default(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            session_id: Uuid::new_v4().to_string(),
            app_root: None,
            overlays: IndexMap::new(),
            repeat: false,
            settings: JsonMap::new(),
        }
    }

    /// Reads a live setting; the whole context as an object when `key` is `None`.
    pub fn context(&self, key: Option<&str>) -> Option<Value> {
        let Some(key) = key else {
            let mut all = self.settings.clone();
            for name in ["action", "TTL", "console", "cwd", "sessionId", "appRoot", "overlays", "repeat"] {
                if let Some(value) = self.builtin(name) {
                    all.insert(name.to_string(), value);
                }
            }
            return Some(Value::Object(all));
        };
        self.builtin(key).or_else(|| self.settings.get(key).cloned())
    }

    /// Writes a live setting.
    ///
    /// Built-in keys only accept values of their own type; a mismatched value
    /// is ignored and `false` is returned.
    pub fn set_context(&mut self, key: &str, value: Value) -> bool {
        let applied = match key {
            "action" => value.as_str().map(|action| self.action = action.to_string()).is_some(),
            "TTL" => value
                .as_u64()
                .and_then(|ttl| u32::try_from(ttl).ok())
                .map(|ttl| self.ttl = ttl)
                .is_some(),
            "console" => serde_json::from_value(value).map(|mode| self.console = mode).is_ok(),
            "cwd" => value.as_str().map(|cwd| self.cwd = PathBuf::from(cwd)).is_some(),
            "sessionId" => value.as_str().map(|id| self.session_id = id.to_string()).is_some(),
            "appRoot" => match value {
                Value::Null => {
                    self.app_root = None;
                    true
                }
                Value::String(root) => {
                    self.app_root = Some(root);
                    true
                }
                _ => false,
            },
            "repeat" => value.as_bool().map(|repeat| self.repeat = repeat).is_some(),
            "overlays" => serde_json::from_value(value).map(|overlays| self.overlays = overlays).is_ok(),
            _ => {
                self.settings.insert(key.to_string(), value);
                true
            }
        };
        if !applied {
            debug!(key, "ignored context write with mismatched type");
        }
        applied
    }

    /// Asks the engine to dispatch the current descriptor again.
    pub fn request_repeat(&mut self) {
        self.repeat = true;
    }

    pub(crate) fn take_repeat(&mut self) -> bool {
        std::mem::take(&mut self.repeat)
    }

    fn builtin(&self, key: &str) -> Option<Value> {
        match key {
            "action" => Some(Value::String(self.action.clone())),
            "TTL" => Some(Value::from(self.ttl)),
            "console" => serde_json::to_value(self.console).ok(),
            "cwd" => Some(Value::String(self.cwd.to_string_lossy().to_string())),
            "sessionId" => Some(Value::String(self.session_id.clone())),
            "appRoot" => Some(self.app_root.clone().map(Value::String).unwrap_or(Value::Null)),
            "overlays" => serde_json::to_value(&self.overlays).ok(),
            "repeat" => Some(Value::Bool(self.repeat)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_keys_are_typed() {
        let mut context = ExecutionContext::new(10);
        assert_eq!(context.context(Some("TTL")), Some(json!(10)));

        assert!(context.set_context("TTL", json!(3)));
        assert_eq!(context.ttl, 3);
        assert!(!context.set_context("TTL", json!("three")));
        assert_eq!(context.ttl, 3);

        assert!(context.set_context("console", json!("debug")));
        assert_eq!(context.console, ConsoleMode::Debug);
    }

    #[test]
    fn free_settings_round_trip() {
        let mut context = ExecutionContext::new(1);
        assert_eq!(context.context(Some("profile")), None);
        context.set_context("profile", json!("dev"));
        assert_eq!(context.context(Some("profile")), Some(json!("dev")));

        let all = context.context(None).expect("context object");
        assert_eq!(all["profile"], "dev");
        assert_eq!(all["TTL"], 1);
    }

    #[test]
    fn repeat_flag_is_consumed_once() {
        let mut context = ExecutionContext::new(1);
        context.request_repeat();
        assert!(context.take_repeat());
        assert!(!context.take_repeat());
    }

    #[test]
    fn console_modes_order_by_verbosity() {
        assert!(ConsoleMode::Debug > ConsoleMode::Verbose);
        assert!(ConsoleMode::Verbose > ConsoleMode::Standard);
    }
}
