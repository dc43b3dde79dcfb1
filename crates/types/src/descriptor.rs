//! Pipeline descriptors: the unit queued in `headers.execute.pipeline`.
//!
//! On the wire a descriptor keeps its parameters under a key equal to its
//! own action URI:
//!
//! ```json
//! { "action": "ns/read", "ns/read": { "file": "a.txt" }, "TTL": 10, "appRoot": "/srv/usr" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

const ACTION_KEY: &str = "action";
const TTL_KEY: &str = "TTL";
const APP_ROOT_KEY: &str = "appRoot";

/// Errors raised when a JSON object is not a valid pipeline descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("pipeline descriptor is missing a string 'action'")]
    MissingAction,

    #[error("pipeline descriptor for '{action}' has non-object parameters")]
    InvalidParams { action: String },

    #[error("pipeline descriptor for '{action}' has an invalid TTL")]
    InvalidTtl { action: String },

    #[error("pipeline descriptor for '{action}' has a non-string appRoot")]
    InvalidAppRoot { action: String },
}

/// One queued action invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "JsonMap<String, Value>", into = "JsonMap<String, Value>")]
pub struct PipelineDescriptor {
    /// Action URI, e.g. `ns/read`.
    pub action: String,
    /// Named parameters for the action; empty when none were given.
    pub params: JsonMap<String, Value>,
    /// TTL override merged into the live context when dequeued.
    pub ttl: Option<u32>,
    /// Application root propagated into the live context when dequeued.
    pub app_root: Option<String>,
}

impl PipelineDescriptor {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: JsonMap<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Adds a single parameter, replacing any previous value for `name`.
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_app_root(mut self, app_root: impl Into<String>) -> Self {
        self.app_root = Some(app_root.into());
        self
    }
}

impl TryFrom<JsonMap<String, Value>> for PipelineDescriptor {
    type Error = DescriptorError;

    fn try_from(mut map: JsonMap<String, Value>) -> Result<Self, Self::Error> {
        let action = match map.remove(ACTION_KEY) {
            Some(Value::String(action)) if !action.is_empty() => action,
            _ => return Err(DescriptorError::MissingAction),
        };

        let params = match map.remove(&action) {
            None | Some(Value::Null) => JsonMap::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(DescriptorError::InvalidParams { action }),
        };

        let ttl = match map.remove(TTL_KEY) {
            None | Some(Value::Null) => None,
            Some(value) => {
                let ttl = value
                    .as_u64()
                    .and_then(|ttl| u32::try_from(ttl).ok())
                    .ok_or_else(|| DescriptorError::InvalidTtl { action: action.clone() })?;
                Some(ttl)
            }
        };

        let app_root = match map.remove(APP_ROOT_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(app_root)) => Some(app_root),
            Some(_) => return Err(DescriptorError::InvalidAppRoot { action }),
        };

        Ok(Self {
            action,
            params,
            ttl,
            app_root,
        })
    }
}

impl From<PipelineDescriptor> for JsonMap<String, Value> {
    fn from(descriptor: PipelineDescriptor) -> Self {
        let mut map = JsonMap::new();
        if !descriptor.params.is_empty() {
            map.insert(descriptor.action.clone(), Value::Object(descriptor.params));
        }
        map.insert(ACTION_KEY.to_string(), Value::String(descriptor.action));
        if let Some(ttl) = descriptor.ttl {
            map.insert(TTL_KEY.to_string(), Value::from(ttl));
        }
        if let Some(app_root) = descriptor.app_root {
            map.insert(APP_ROOT_KEY.to_string(), Value::String(app_root));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_live_under_the_action_uri() {
        let descriptor = PipelineDescriptor::new("ns/read").with_param("file", json!("a.txt")).with_ttl(4);
        let wire = serde_json::to_value(&descriptor).expect("serialize descriptor");
        assert_eq!(wire, json!({"action": "ns/read", "ns/read": {"file": "a.txt"}, "TTL": 4}));
    }

    #[test]
    fn deserializes_wire_shape() {
        let descriptor: PipelineDescriptor =
            serde_json::from_value(json!({"action": "usr/x", "usr/x": {"n": 1}, "appRoot": "/srv/usr"})).expect("descriptor");
        assert_eq!(descriptor.action, "usr/x");
        assert_eq!(descriptor.params["n"], 1);
        assert_eq!(descriptor.app_root.as_deref(), Some("/srv/usr"));
        assert_eq!(descriptor.ttl, None);
    }

    #[test]
    fn rejects_missing_action_and_bad_params() {
        let missing = serde_json::from_value::<PipelineDescriptor>(json!({"ns/read": {}}));
        assert!(missing.is_err());

        let bad = PipelineDescriptor::try_from(json!({"action": "ns/read", "ns/read": [1]}).as_object().cloned().unwrap_or_default());
        assert_eq!(bad, Err(DescriptorError::InvalidParams { action: "ns/read".into() }));
    }

    #[test]
    fn negative_ttl_is_rejected() {
        let result = serde_json::from_value::<PipelineDescriptor>(json!({"action": "a/b", "TTL": -1}));
        assert!(result.is_err());
    }
}
