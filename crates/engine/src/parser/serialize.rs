//! Descriptor to command-token rendering.

use serde_json::Value;
use spl_types::{ArgumentSchema, ArgumentType, PipelineDescriptor};
use spl_util::COMMAND_GROUP_DELIMITER;

use super::POSITIONAL_KEY;

/// Renders `descriptor` as the tokens of one command group.
///
/// Only parameters declared by `schema` are emitted, always in `--name=value`
/// form so values that start with `-` survive. Positional residue follows the
/// named options.
pub fn to_command_tokens(descriptor: &PipelineDescriptor, schema: &ArgumentSchema) -> Vec<String> {
    let mut tokens = Vec::new();
    if let Some(ttl) = descriptor.ttl {
        tokens.push(format!("--steps={ttl}"));
    }
    tokens.push(descriptor.action.clone());

    for spec in schema.specs() {
        let Some(value) = descriptor.params.get(&spec.name) else {
            continue;
        };
        let values = match value {
            Value::Array(items) if spec.multiple => items.iter().collect(),
            single => vec![single],
        };
        for value in values {
            match (spec.r#type, value) {
                (ArgumentType::Boolean, Value::Bool(true)) => tokens.push(format!("--{}", spec.name)),
                _ => tokens.push(format!("--{}={}", spec.name, render(value))),
            }
        }
    }

    if let Some(Value::Array(residue)) = descriptor.params.get(POSITIONAL_KEY) {
        tokens.extend(residue.iter().map(render));
    }
    tokens
}

/// Joins groups into one command line, quoting tokens as needed.
pub fn to_command_line(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| group.iter().map(|token| quote_token(token)).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(&format!(" {COMMAND_GROUP_DELIMITER} "))
}

/// Double-quotes `token` when the lexer would otherwise split or unescape it.
pub fn quote_token(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token == COMMAND_GROUP_DELIMITER
        || token.chars().any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if !needs_quotes {
        return token.to_string();
    }
    let escaped = token.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spl_types::ArgumentSpec;

    #[test]
    fn tokens_follow_schema_order() {
        let schema = ArgumentSchema::new(vec![
            ArgumentSpec::new("force", ArgumentType::Boolean),
            ArgumentSpec::new("line", ArgumentType::Number).multiple(),
        ]);
        let descriptor = PipelineDescriptor::new("ns/read")
            .with_param("line", json!([1, 2]))
            .with_param("force", json!(true))
            .with_param("undeclared", json!("x"))
            .with_ttl(3);

        assert_eq!(
            to_command_tokens(&descriptor, &schema),
            vec!["--steps=3", "ns/read", "--force", "--line=1", "--line=2"]
        );
    }

    #[test]
    fn quoting_protects_spaces_and_delimiters() {
        assert_eq!(quote_token("plain"), "plain");
        assert_eq!(quote_token("two words"), "\"two words\"");
        assert_eq!(quote_token("_!_"), "\"_!_\"");
        assert_eq!(quote_token(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(
            to_command_line(&[vec!["a".into()], vec!["b".into(), "c d".into()]]),
            "a _!_ b \"c d\""
        );
    }
}
