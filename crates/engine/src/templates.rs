//! Placeholder expansion for template pipelines.
//!
//! A module manifest (or a runtime-defined action) may implement its URI as a
//! pipeline of descriptors. String values inside those descriptors can refer to
//! the invoking descriptor's arguments:
//!
//! - `$1` .. `$9`: positional residue, 1-based
//! - `$@`: all positional values as an array
//! - `$*`: all positional values joined by spaces
//! - `${name}`: a named parameter
//!
//! A string that is exactly one placeholder is replaced by the raw JSON value;
//! placeholders embedded in longer text are interpolated as text. Missing
//! values become `null` and the empty string respectively.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map as JsonMap, Value};
use spl_types::PipelineDescriptor;

use crate::parser::POSITIONAL_KEY;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(?:([1-9@*])|\{([A-Za-z_][A-Za-z0-9_\-]*)\})").expect("valid placeholder regex"));

/// Values available to a template expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateArguments {
    pub positional: Vec<Value>,
    pub named: JsonMap<String, Value>,
}

impl TemplateArguments {
    /// Splits invocation parameters into named values and positional residue.
    pub fn from_params(params: &JsonMap<String, Value>) -> Self {
        let mut named = params.clone();
        let positional = match named.remove(POSITIONAL_KEY) {
            Some(Value::Array(values)) => values,
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![single],
        };
        Self { positional, named }
    }

    fn lookup(&self, captures: &Captures<'_>) -> Option<Value> {
        if let Some(name) = captures.get(2) {
            return self.named.get(name.as_str()).cloned();
        }
        match captures.get(1)?.as_str() {
            "@" => Some(Value::Array(self.positional.clone())),
            "*" => Some(Value::String(
                self.positional.iter().map(render).collect::<Vec<_>>().join(" "),
            )),
            digit => {
                let index = digit.parse::<usize>().ok()?.checked_sub(1)?;
                self.positional.get(index).cloned()
            }
        }
    }
}

/// Expands every descriptor of `pipeline` against `arguments`.
pub fn expand_template(pipeline: &[PipelineDescriptor], arguments: &TemplateArguments) -> Vec<PipelineDescriptor> {
    pipeline
        .iter()
        .map(|descriptor| {
            let params = descriptor
                .params
                .iter()
                .map(|(key, value)| (key.clone(), expand_value(value, arguments)))
                .collect();
            PipelineDescriptor {
                action: descriptor.action.clone(),
                params,
                ttl: descriptor.ttl,
                app_root: descriptor.app_root.as_deref().map(|root| expand_text(root, arguments)),
            }
        })
        .collect()
}

/// Expands placeholders in `value`, recursing through arrays and objects.
pub fn expand_value(value: &Value, arguments: &TemplateArguments) -> Value {
    match value {
        Value::String(text) => expand_string(text, arguments),
        Value::Array(items) => Value::Array(items.iter().map(|item| expand_value(item, arguments)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), expand_value(value, arguments)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn expand_string(text: &str, arguments: &TemplateArguments) -> Value {
    if let Some(captures) = PLACEHOLDER.captures(text)
        && captures.get(0).is_some_and(|whole| whole.start() == 0 && whole.end() == text.len())
    {
        return arguments.lookup(&captures).unwrap_or(Value::Null);
    }
    Value::String(expand_text(text, arguments))
}

fn expand_text(text: &str, arguments: &TemplateArguments) -> String {
    PLACEHOLDER
        .replace_all(text, |captures: &Captures<'_>| {
            arguments.lookup(captures).map(|value| render(&value)).unwrap_or_default()
        })
        .into_owned()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn arguments() -> TemplateArguments {
        let params = json!({"_positional": ["alice", 2], "greeting": "hi"});
        TemplateArguments::from_params(params.as_object().expect("object"))
    }

    #[test]
    fn whole_placeholders_keep_json_types() {
        let args = arguments();
        assert_eq!(expand_value(&json!("$2"), &args), json!(2));
        assert_eq!(expand_value(&json!("$@"), &args), json!(["alice", 2]));
        assert_eq!(expand_value(&json!("${greeting}"), &args), json!("hi"));
        assert_eq!(expand_value(&json!("$5"), &args), Value::Null);
    }

    #[test]
    fn embedded_placeholders_interpolate_text() {
        let args = arguments();
        assert_eq!(expand_value(&json!("${greeting}, $1!"), &args), json!("hi, alice!"));
        assert_eq!(expand_value(&json!("all: $*"), &args), json!("all: alice 2"));
        assert_eq!(expand_value(&json!("[$7]"), &args), json!("[]"));
        assert_eq!(expand_value(&json!("costs $$5"), &args), json!("costs $"));
    }

    #[test]
    fn template_pipeline_expands_nested_params() {
        let pipeline = vec![
            PipelineDescriptor::new("ns/write")
                .with_param("file", json!("$1.txt"))
                .with_param("meta", json!({"lines": ["$2"]}))
                .with_ttl(4),
        ];
        let expanded = expand_template(&pipeline, &arguments());
        assert_eq!(expanded[0].params["file"], "alice.txt");
        assert_eq!(expanded[0].params["meta"], json!({"lines": [2]}));
        assert_eq!(expanded[0].ttl, Some(4));
    }
}
