use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::executor::{ActionScope, Completion};

pub const CONFIG_SET_ACTION: &str = "spl/config/set";

/// Stores `value` under `headers[<action>][<key>]` for later steps.
pub fn set_config(scope: &mut ActionScope<'_>) -> Result<Completion> {
    let action: String = scope.param("action")?.context("missing 'action' parameter")?;
    let key: String = scope.param("key")?.context("missing 'key' parameter")?;
    let value = scope.request.action(Some("value")).unwrap_or(Value::Null);

    debug!(%action, %key, "config value stored");
    scope.request.set_config(&action, &key, value);
    Ok(Completion::Completed)
}
