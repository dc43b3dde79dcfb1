//! Argument schema documents (`<name>_arguments.json`).
//!
//! A schema is a JSON array of option definitions:
//!
//! ```json
//! [
//!   { "name": "file", "alias": "f", "type": "String", "description": "file to read", "defaultOption": true },
//!   { "name": "lines", "type": "Number", "multiple": true, "description": "line numbers" }
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// Declared value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArgumentType {
    #[serde(alias = "boolean")]
    Boolean,
    #[serde(alias = "number")]
    Number,
    #[default]
    #[serde(alias = "string")]
    String,
    #[serde(alias = "bigint")]
    BigInt,
}

impl ArgumentType {
    /// Flag-style options take no value token.
    pub fn is_flag(self) -> bool {
        matches!(self, ArgumentType::Boolean)
    }

    pub fn label(self) -> &'static str {
        match self {
            ArgumentType::Boolean => "Boolean",
            ArgumentType::Number => "Number",
            ArgumentType::String => "String",
            ArgumentType::BigInt => "BigInt",
        }
    }
}

/// One option definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentSpec {
    pub name: String,
    /// Single-character short form used as `-x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, rename = "type")]
    pub r#type: ArgumentType,
    /// Repeated occurrences accumulate into an array.
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub description: String,
    /// Receives bare (non-option) tokens at this level.
    #[serde(default)]
    pub default_option: bool,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>, r#type: ArgumentType) -> Self {
        Self {
            name: name.into(),
            r#type,
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn default_option(mut self) -> Self {
        self.default_option = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An ordered list of option definitions for one action URI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentSchema(pub Vec<ArgumentSpec>);

impl ArgumentSchema {
    pub fn new(specs: Vec<ArgumentSpec>) -> Self {
        Self(specs)
    }

    pub fn specs(&self) -> &[ArgumentSpec] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&ArgumentSpec> {
        self.0.iter().find(|spec| spec.name == name)
    }

    pub fn by_alias(&self, alias: &str) -> Option<&ArgumentSpec> {
        self.0.iter().find(|spec| spec.alias.as_deref() == Some(alias))
    }

    pub fn default_option(&self) -> Option<&ArgumentSpec> {
        self.0.iter().find(|spec| spec.default_option)
    }

    /// Appends the options of `other` whose names are not defined yet.
    pub fn extend_missing(&mut self, other: ArgumentSchema) {
        for spec in other.0 {
            if self.by_name(&spec.name).is_none() {
                self.0.push(spec);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_schema_document() {
        let schema: ArgumentSchema = serde_json::from_value(json!([
            {"name": "file", "alias": "f", "type": "String", "description": "file", "defaultOption": true},
            {"name": "count", "type": "Number", "multiple": true, "description": "count"},
            {"name": "force", "type": "boolean", "description": "force"},
            {"name": "id", "type": "BigInt", "description": "id"},
            {"name": "note", "description": "untyped"}
        ]))
        .expect("schema document");

        assert_eq!(schema.specs().len(), 5);
        assert_eq!(schema.by_alias("f").map(|spec| spec.name.as_str()), Some("file"));
        assert_eq!(schema.default_option().map(|spec| spec.name.as_str()), Some("file"));
        assert!(schema.by_name("count").is_some_and(|spec| spec.multiple));
        assert_eq!(schema.by_name("force").map(|spec| spec.r#type), Some(ArgumentType::Boolean));
        assert_eq!(schema.by_name("id").map(|spec| spec.r#type), Some(ArgumentType::BigInt));
        assert_eq!(schema.by_name("note").map(|spec| spec.r#type), Some(ArgumentType::String));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_value::<ArgumentSchema>(json!([{"name": "x", "type": "Date"}]));
        assert!(result.is_err());
    }

    #[test]
    fn extend_missing_keeps_existing_definitions() {
        let mut schema = ArgumentSchema::new(vec![ArgumentSpec::new("help", ArgumentType::Boolean)]);
        schema.extend_missing(ArgumentSchema::new(vec![
            ArgumentSpec::new("help", ArgumentType::String),
            ArgumentSpec::new("profile", ArgumentType::String),
        ]));
        assert_eq!(schema.specs().len(), 2);
        assert_eq!(schema.by_name("help").map(|spec| spec.r#type), Some(ArgumentType::Boolean));
    }
}
