use spl_registry::ResolveError;
use thiserror::Error;

/// Code recorded when a handler returns an error without a more specific code.
pub const ACTION_ERROR_CODE: &str = "EACTION";
/// Code recorded for malformed command lines.
pub const PARSE_ERROR_CODE: &str = "EPARSE";

/// Conditions that stop the engine: the run transitions to `Failed`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ran out of steps before dispatching '{action}'")]
    OutOfSteps { action: String },

    #[error("no implementation found for action '{action}'")]
    Unresolvable { action: String },

    #[error("module '{action}' is bound to unknown handler '{handler}'")]
    MissingHandler { action: String, handler: String },

    #[error("invalid runtime-defined action '{action}': {source}")]
    InvalidDefinition {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::OutOfSteps { .. } => "ETTL",
            EngineError::Unresolvable { .. } | EngineError::InvalidDefinition { .. } => "ERESOLVE",
            EngineError::MissingHandler { .. } => "EHANDLER",
            EngineError::Resolve(error) => error.code(),
        }
    }
}

/// Malformed command tokens. Blocks pipeline construction for the group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("command group has no action URI")]
    MissingAction,

    #[error("unknown action '{uri}': {reason}")]
    UnknownAction { uri: String, reason: String },

    #[error("unknown option '{token}' before the action URI")]
    UnknownOption { token: String },

    #[error("option '--{name}' expects a value")]
    MissingValue { name: String },

    #[error("option '--{name}' expects a {expected} value, got '{raw}'")]
    InvalidValue {
        name: String,
        expected: &'static str,
        raw: String,
    },

    #[error("option '--{name}' was given more than once")]
    DuplicateOption { name: String },

    #[error("unexpected arguments for '{uri}': {}", residue.join(" "))]
    UnexpectedResidue { uri: String, residue: Vec<String> },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        PARSE_ERROR_CODE
    }
}

/// Handler error carrying an explicit wire code.
///
/// Handlers return it through `anyhow` when the default `EACTION` code would
/// lose information; the engine records `code` verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    pub code: String,
    pub message: String,
}

impl ActionFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Picks the wire code for an error returned by a handler.
pub(crate) fn action_error_code(error: &anyhow::Error) -> String {
    if let Some(failure) = error.downcast_ref::<ActionFailure>() {
        return failure.code.clone();
    }
    if let Some(parse) = error.downcast_ref::<ParseError>() {
        return parse.code().to_string();
    }
    if let Some(resolve) = error.downcast_ref::<ResolveError>() {
        return resolve.code().to_string();
    }
    ACTION_ERROR_CODE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_codes() {
        assert_eq!(action_error_code(&anyhow::anyhow!("boom")), "EACTION");
        assert_eq!(action_error_code(&ActionFailure::new("EQUOTA", "over quota").into()), "EQUOTA");
        assert_eq!(action_error_code(&ParseError::MissingAction.into()), "EPARSE");
        assert_eq!(
            action_error_code(&ResolveError::NotFound { uri: "usr/x".into() }.into()),
            "ERESOLVE"
        );
    }

    #[test]
    fn out_of_steps_message() {
        let error = EngineError::OutOfSteps { action: "ns/read".into() };
        assert_eq!(error.code(), "ETTL");
        assert!(error.to_string().contains("ran out of steps"));
    }
}
