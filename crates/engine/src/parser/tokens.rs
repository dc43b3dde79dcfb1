//! Single-level option matching and value coercion.

use serde_json::{Map as JsonMap, Number, Value};
use spl_types::{ArgumentSchema, ArgumentSpec, ArgumentType};

use crate::error::ParseError;

/// Result of matching one schema against a token list.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct LevelParse {
    pub named: JsonMap<String, Value>,
    /// Tokens the schema did not claim, in their original order.
    pub unknown: Vec<String>,
}

/// True for `-x`/`--name` style tokens; negative numbers are values.
pub(crate) fn looks_like_option(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

enum OptionToken<'a> {
    Long(&'a str, Option<&'a str>),
    Short(&'a str),
}

fn classify(token: &str) -> Option<OptionToken<'_>> {
    if !looks_like_option(token) {
        return None;
    }
    if let Some(body) = token.strip_prefix("--") {
        return Some(match body.split_once('=') {
            Some((name, inline)) => OptionToken::Long(name, Some(inline)),
            None => OptionToken::Long(body, None),
        });
    }
    Some(OptionToken::Short(&token[1..]))
}

/// Matches `tokens` against `schema` in partial mode: recognized options are
/// consumed wherever they appear, everything else is returned as unknown.
pub(crate) fn parse_level(schema: &ArgumentSchema, tokens: &[String]) -> Result<LevelParse, ParseError> {
    let mut parsed = LevelParse::default();
    let mut index = 0;

    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;

        if token == "--" {
            for rest in &tokens[index..] {
                assign_positional(schema, rest, &mut parsed)?;
            }
            break;
        }

        let (spec, inline) = match classify(token) {
            Some(OptionToken::Long(name, inline)) => (schema.by_name(name), inline),
            Some(OptionToken::Short(alias)) => (schema.by_alias(alias), None),
            None => {
                assign_positional(schema, token, &mut parsed)?;
                continue;
            }
        };
        let Some(spec) = spec else {
            parsed.unknown.push(token.clone());
            continue;
        };

        let value = match (spec.r#type.is_flag(), inline) {
            (_, Some(raw)) => coerce(spec, raw)?,
            (true, None) => Value::Bool(true),
            (false, None) => match tokens.get(index) {
                Some(next) if !looks_like_option(next) && next != "--" => {
                    index += 1;
                    coerce(spec, next)?
                }
                _ => return Err(ParseError::MissingValue { name: spec.name.clone() }),
            },
        };
        store(spec, value, &mut parsed.named)?;
    }

    Ok(parsed)
}

/// Length of the option prefix of `tokens` under `schema`: everything before
/// the first bare word, counting the values taken by `schema`'s own options.
pub(crate) fn leading_options_len(schema: &ArgumentSchema, tokens: &[String]) -> usize {
    let mut index = 0;
    while let Some(token) = tokens.get(index).filter(|token| *token != "--") {
        let takes_value = match classify(token) {
            Some(OptionToken::Long(name, None)) => schema.by_name(name).is_some_and(|spec| !spec.r#type.is_flag()),
            Some(OptionToken::Short(alias)) => schema.by_alias(alias).is_some_and(|spec| !spec.r#type.is_flag()),
            Some(OptionToken::Long(_, Some(_))) => false,
            None => break,
        };
        index += 1;
        if takes_value && tokens.get(index).is_some_and(|next| !looks_like_option(next)) {
            index += 1;
        }
    }
    index
}

fn assign_positional(schema: &ArgumentSchema, token: &str, parsed: &mut LevelParse) -> Result<(), ParseError> {
    match schema.default_option() {
        Some(spec) if spec.multiple || !parsed.named.contains_key(&spec.name) => {
            let value = coerce(spec, token)?;
            store(spec, value, &mut parsed.named)
        }
        _ => {
            parsed.unknown.push(token.to_string());
            Ok(())
        }
    }
}

fn store(spec: &ArgumentSpec, value: Value, named: &mut JsonMap<String, Value>) -> Result<(), ParseError> {
    if spec.multiple {
        match named.entry(spec.name.clone()).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(values) => values.push(value),
            other => *other = Value::Array(vec![value]),
        }
        return Ok(());
    }
    if named.contains_key(&spec.name) && !spec.r#type.is_flag() {
        return Err(ParseError::DuplicateOption { name: spec.name.clone() });
    }
    named.insert(spec.name.clone(), value);
    Ok(())
}

/// Converts a raw token to the JSON value declared by `spec`.
pub(crate) fn coerce(spec: &ArgumentSpec, raw: &str) -> Result<Value, ParseError> {
    let invalid = || ParseError::InvalidValue {
        name: spec.name.clone(),
        expected: spec.r#type.label(),
        raw: raw.to_string(),
    };
    match spec.r#type {
        ArgumentType::String => Ok(Value::String(raw.to_string())),
        ArgumentType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ArgumentType::Number => {
            if let Ok(integer) = raw.parse::<i64>() {
                return Ok(Value::from(integer));
            }
            raw.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid)
        }
        ArgumentType::BigInt => raw
            .strip_suffix('n')
            .unwrap_or(raw)
            .parse::<i128>()
            .map(|integer| Value::String(integer.to_string()))
            .map_err(|_| invalid()),
    }
}
