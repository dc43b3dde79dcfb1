//! Command-line parsing into pipeline descriptors.
//!
//! A command line is split into groups on the `_!_` delimiter; each group
//! becomes at most one [`PipelineDescriptor`]. Parsing a group is a narrowing
//! walk:
//!
//! 1. The global schema claims `--help`, `--debug`, `--verbose`, `--steps` and
//!    `--test` (plus any options of the platform root schema) from the options
//!    leading the group. Once the URI starts, these names belong to the
//!    action; only an undeclared `--help` still requests help.
//! 2. The first unclaimed token is treated as a URI segment. Its argument
//!    schema is looked up through a [`SchemaSource`] and matched against the
//!    remaining tokens.
//! 3. If tokens remain and the next one is a bare word, it is appended to the
//!    URI and step 2 repeats, for at most [`MAX_SCHEMA_DEPTH`] levels.
//!
//! Tokens left over once no deeper schema exists are kept as positional
//! residue under [`POSITIONAL_KEY`] (or rejected with `strict_residue`).
//!
//! Schema lookups may be asynchronous from the engine's point of view: a
//! source can answer [`SchemaLookup::Pending`], in which case parsing stops
//! with [`ParseStatus::Pending`] and is expected to be retried once the schema
//! has been fetched into the workspace.

mod serialize;
mod tokens;

use serde_json::{Map as JsonMap, Value};
use spl_registry::ActionResolver;
use spl_types::{ArgumentSchema, ArgumentSpec, ArgumentType, PipelineDescriptor, join_uri};
use spl_util::split_command_groups;
use tracing::debug;

pub use serialize::{quote_token, to_command_line, to_command_tokens};
use tokens::{leading_options_len, looks_like_option, parse_level};

use crate::{context::ConsoleMode, error::ParseError};

/// Parameter key holding unmatched trailing tokens.
pub const POSITIONAL_KEY: &str = "_positional";
/// Maximum number of schema discoveries per command group.
pub const MAX_SCHEMA_DEPTH: usize = 3;

/// Answer of a [`SchemaSource`] for one URI.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLookup {
    Ready(ArgumentSchema),
    /// No schema exists (or it could not be loaded); carries the reason.
    Missing(String),
    /// A fetch has been scheduled; parse again later.
    Pending,
}

/// Supplies argument schemas by action URI.
pub trait SchemaSource {
    fn lookup(&mut self, uri: &str) -> SchemaLookup;
}

/// Reads schemas straight from the module trees.
pub struct ResolverSchemas<'a> {
    resolver: &'a ActionResolver,
}

impl<'a> ResolverSchemas<'a> {
    pub fn new(resolver: &'a ActionResolver) -> Self {
        Self { resolver }
    }
}

impl SchemaSource for ResolverSchemas<'_> {
    fn lookup(&mut self, uri: &str) -> SchemaLookup {
        match self.resolver.load_schema(uri) {
            Ok(schema) => SchemaLookup::Ready(schema),
            Err(error) => SchemaLookup::Missing(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Reject leftover tokens instead of keeping them as positional residue.
    pub strict_residue: bool,
}

/// A command group that could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    /// Zero-based index of the group on the command line.
    pub group: usize,
    pub error: ParseError,
}

/// Everything produced from one command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    /// Descriptors to queue, in command-line order.
    pub pipeline: Vec<PipelineDescriptor>,
    /// URIs whose help was requested; `""` asks for general help.
    pub help: Vec<String>,
    /// Descriptors parsed from `--test` groups; never queued.
    pub tested: Vec<PipelineDescriptor>,
    pub test: bool,
    pub console: ConsoleMode,
    pub failures: Vec<GroupFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseStatus {
    Parsed(ParseOutcome),
    /// A schema fetch was scheduled before all groups could be parsed.
    Pending,
}

/// Compiled-in options accepted in every command group.
pub fn global_schema() -> ArgumentSchema {
    ArgumentSchema::new(vec![
        ArgumentSpec::new("help", ArgumentType::Boolean)
            .alias("h")
            .describe("show help for the action instead of running it"),
        ArgumentSpec::new("debug", ArgumentType::Boolean).describe("debug console output"),
        ArgumentSpec::new("verbose", ArgumentType::Boolean)
            .alias("v")
            .describe("verbose console output"),
        ArgumentSpec::new("steps", ArgumentType::Number).describe("step budget for this action"),
        ArgumentSpec::new("test", ArgumentType::Boolean).describe("parse the command without running it"),
    ])
}

const GLOBAL_FLAGS: &[&str] = &["help", "debug", "verbose", "steps", "test"];

#[derive(Debug, Default)]
struct ParsedGroup {
    uri: Option<String>,
    params: JsonMap<String, Value>,
    help: bool,
    test: bool,
    steps: Option<u32>,
    console: ConsoleMode,
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    global: ArgumentSchema,
    options: ParserOptions,
}

impl CommandParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            global: global_schema(),
            options,
        }
    }

    /// Adds the options of the platform root schema to the global level.
    /// Compiled-in options keep their definitions.
    pub fn with_root_schema(mut self, root: ArgumentSchema) -> Self {
        self.global.extend_missing(root);
        self
    }

    pub fn global(&self) -> &ArgumentSchema {
        &self.global
    }

    pub fn parse_line(&self, line: &str, source: &mut dyn SchemaSource) -> ParseStatus {
        self.parse_groups(&split_command_groups(line), source)
    }

    pub fn parse_groups(&self, groups: &[Vec<String>], source: &mut dyn SchemaSource) -> ParseStatus {
        let mut outcome = ParseOutcome::default();

        for (index, tokens) in groups.iter().enumerate() {
            let group = match self.parse_group(tokens, source) {
                Ok(Some(group)) => group,
                Ok(None) => return ParseStatus::Pending,
                Err(error) => {
                    debug!(group = index, %error, "command group rejected");
                    outcome.failures.push(GroupFailure { group: index, error });
                    continue;
                }
            };

            outcome.console = outcome.console.max(group.console);
            outcome.test |= group.test;
            if group.help {
                outcome.help.push(group.uri.unwrap_or_default());
                continue;
            }
            let Some(uri) = group.uri else {
                continue;
            };
            let mut descriptor = PipelineDescriptor::new(uri).with_params(group.params);
            if let Some(steps) = group.steps {
                descriptor = descriptor.with_ttl(steps);
            }
            if group.test {
                outcome.tested.push(descriptor);
            } else {
                outcome.pipeline.push(descriptor);
            }
        }

        ParseStatus::Parsed(outcome)
    }

    /// `Ok(None)` when a schema is still being fetched.
    fn parse_group(&self, tokens: &[String], source: &mut dyn SchemaSource) -> Result<Option<ParsedGroup>, ParseError> {
        let lead = leading_options_len(&self.global, tokens);
        let global = parse_level(&self.global, &tokens[..lead])?;
        let mut group = ParsedGroup {
            help: flag(&global.named, "help"),
            test: flag(&global.named, "test"),
            steps: steps(&global.named)?,
            console: if flag(&global.named, "debug") {
                ConsoleMode::Debug
            } else if flag(&global.named, "verbose") {
                ConsoleMode::Verbose
            } else {
                ConsoleMode::Standard
            },
            ..Default::default()
        };
        group.params = global
            .named
            .into_iter()
            .filter(|(name, _)| !GLOBAL_FLAGS.contains(&name.as_str()))
            .collect();

        let mut remaining = global.unknown;
        remaining.extend_from_slice(&tokens[lead..]);
        let mut uri = String::new();

        for _ in 0..MAX_SCHEMA_DEPTH {
            let Some(segment) = remaining.first().filter(|token| !looks_like_option(token)) else {
                break;
            };
            let candidate = join_uri(&uri, segment);
            let schema = match source.lookup(&candidate) {
                SchemaLookup::Pending => return Ok(None),
                SchemaLookup::Ready(schema) => schema,
                SchemaLookup::Missing(reason) if group.uri.is_none() => {
                    return Err(ParseError::UnknownAction { uri: candidate, reason });
                }
                SchemaLookup::Missing(reason) => {
                    debug!(%candidate, %reason, "no deeper schema; narrowing stops");
                    break;
                }
            };

            remaining.remove(0);
            let mut level = parse_level(&schema, &remaining)?;
            if level.named.remove("help").is_some_and(|help| help == Value::Bool(true)) {
                group.help = true;
            }
            if schema.by_name("help").is_none() && take_help_flag(&mut level.unknown) {
                group.help = true;
            }
            group.params.extend(level.named);
            remaining = level.unknown;
            uri = candidate;
            group.uri = Some(uri.clone());
            if remaining.is_empty() {
                break;
            }
        }

        if remaining.is_empty() {
            return Ok(Some(group));
        }
        let Some(uri) = group.uri.clone() else {
            return Err(match remaining.into_iter().next() {
                Some(token) => ParseError::UnknownOption { token },
                None => ParseError::MissingAction,
            });
        };
        if self.options.strict_residue {
            return Err(ParseError::UnexpectedResidue { uri, residue: remaining });
        }
        debug!(%uri, residue = ?remaining, "unmatched tokens kept as positional arguments");
        group.params.insert(
            POSITIONAL_KEY.to_string(),
            Value::Array(remaining.into_iter().map(Value::String).collect()),
        );
        Ok(Some(group))
    }
}

/// Removes `--help`/`-h` left unclaimed by an action schema.
fn take_help_flag(unknown: &mut Vec<String>) -> bool {
    let before = unknown.len();
    unknown.retain(|token| token != "--help" && token != "-h");
    unknown.len() != before
}

fn flag(named: &JsonMap<String, Value>, name: &str) -> bool {
    named.get(name).is_some_and(|value| value == &Value::Bool(true))
}

fn steps(named: &JsonMap<String, Value>) -> Result<Option<u32>, ParseError> {
    let Some(value) = named.get("steps") else {
        return Ok(None);
    };
    value
        .as_u64()
        .and_then(|steps| u32::try_from(steps).ok())
        .map(Some)
        .ok_or_else(|| ParseError::InvalidValue {
            name: "steps".into(),
            expected: "non-negative integer",
            raw: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    /// In-memory schema source that records every lookup.
    #[derive(Default)]
    struct StaticSchemas {
        schemas: IndexMap<String, ArgumentSchema>,
        pending: Vec<String>,
        lookups: Vec<String>,
    }

    impl StaticSchemas {
        fn with(mut self, uri: &str, schema: ArgumentSchema) -> Self {
            self.schemas.insert(uri.into(), schema);
            self
        }
    }

    impl SchemaSource for StaticSchemas {
        fn lookup(&mut self, uri: &str) -> SchemaLookup {
            self.lookups.push(uri.to_string());
            if self.pending.iter().any(|pending| pending == uri) {
                return SchemaLookup::Pending;
            }
            match self.schemas.get(uri) {
                Some(schema) => SchemaLookup::Ready(schema.clone()),
                None => SchemaLookup::Missing(format!("no schema for '{uri}'")),
            }
        }
    }

    fn read_schema() -> ArgumentSchema {
        ArgumentSchema::new(vec![ArgumentSpec::new("file", ArgumentType::String).alias("f")])
    }

    fn parsed(status: ParseStatus) -> ParseOutcome {
        match status {
            ParseStatus::Parsed(outcome) => outcome,
            ParseStatus::Pending => panic!("parse unexpectedly pending"),
        }
    }

    #[test]
    fn groups_become_descriptors_in_order() {
        let mut source = StaticSchemas::default()
            .with("ns/read", read_schema())
            .with("ns/write", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("ns/read --file a.txt _!_ ns/write -f b.txt", &mut source));
        assert_eq!(
            outcome.pipeline,
            vec![
                PipelineDescriptor::new("ns/read").with_param("file", json!("a.txt")),
                PipelineDescriptor::new("ns/write").with_param("file", json!("b.txt")),
            ]
        );
        assert!(outcome.help.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn help_routes_uri_to_help_list() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("--help ns/read --file a.txt", &mut source));
        assert!(outcome.pipeline.is_empty());
        assert_eq!(outcome.help, vec!["ns/read"]);

        let outcome = parsed(parser.parse_line("--help", &mut source));
        assert_eq!(outcome.help, vec![""]);
    }

    #[test]
    fn narrowing_walks_segments_up_to_depth_limit() {
        let mut source = StaticSchemas::default()
            .with("tools", ArgumentSchema::default())
            .with("tools/db", ArgumentSchema::default())
            .with(
                "tools/db/dump",
                ArgumentSchema::new(vec![ArgumentSpec::new("table", ArgumentType::String)]),
            )
            .with("tools/db/dump/extra", ArgumentSchema::default());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("tools db dump --table users extra", &mut source));
        assert_eq!(outcome.pipeline[0].action, "tools/db/dump");
        assert_eq!(outcome.pipeline[0].params["table"], "users");
        assert_eq!(outcome.pipeline[0].params[POSITIONAL_KEY], json!(["extra"]));
        assert!(!source.lookups.contains(&"tools/db/dump/extra".to_string()));
    }

    #[test]
    fn residue_is_positional_unless_strict() {
        let mut source = StaticSchemas::default().with("usr/greet", ArgumentSchema::default());

        let lenient = CommandParser::new(ParserOptions::default());
        let outcome = parsed(lenient.parse_line("usr/greet alice bob", &mut source));
        assert_eq!(outcome.pipeline[0].params[POSITIONAL_KEY], json!(["alice", "bob"]));

        let strict = CommandParser::new(ParserOptions { strict_residue: true });
        let outcome = parsed(strict.parse_line("usr/greet alice bob", &mut source));
        assert!(outcome.pipeline.is_empty());
        assert!(matches!(outcome.failures[0].error, ParseError::UnexpectedResidue { .. }));
    }

    #[test]
    fn unknown_first_segment_fails_only_that_group() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("nope/x _!_ ns/read", &mut source));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].group, 0);
        assert!(matches!(outcome.failures[0].error, ParseError::UnknownAction { .. }));
        assert_eq!(outcome.pipeline, vec![PipelineDescriptor::new("ns/read")]);
    }

    #[test]
    fn global_flags_shape_the_outcome() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("--steps 5 --verbose ns/read _!_ --test --debug ns/read", &mut source));
        assert_eq!(outcome.pipeline, vec![PipelineDescriptor::new("ns/read").with_ttl(5)]);
        assert_eq!(outcome.tested, vec![PipelineDescriptor::new("ns/read")]);
        assert!(outcome.test);
        assert_eq!(outcome.console, ConsoleMode::Debug);
    }

    #[test]
    fn options_after_the_uri_belong_to_the_action() {
        let mut source = StaticSchemas::default().with(
            "ns/run",
            ArgumentSchema::new(vec![
                ArgumentSpec::new("test", ArgumentType::String),
                ArgumentSpec::new("steps", ArgumentType::Number),
                ArgumentSpec::new("level", ArgumentType::String).alias("v"),
            ]),
        );
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("ns/run --test suite1 --steps 2 -v high", &mut source));
        assert!(!outcome.test);
        assert!(outcome.tested.is_empty());
        assert_eq!(outcome.console, ConsoleMode::Standard);
        assert_eq!(
            outcome.pipeline,
            vec![
                PipelineDescriptor::new("ns/run")
                    .with_param("test", json!("suite1"))
                    .with_param("steps", json!(2))
                    .with_param("level", json!("high"))
            ]
        );
    }

    #[test]
    fn trailing_global_flags_are_action_residue() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("ns/read --verbose", &mut source));
        assert_eq!(outcome.console, ConsoleMode::Standard);
        assert_eq!(outcome.pipeline[0].params[POSITIONAL_KEY], json!(["--verbose"]));
    }

    #[test]
    fn undeclared_help_after_the_uri_still_requests_help() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());

        let outcome = parsed(parser.parse_line("ns/read --file a.txt --help", &mut source));
        assert!(outcome.pipeline.is_empty());
        assert_eq!(outcome.help, vec!["ns/read"]);
    }

    #[test]
    fn root_schema_options_flow_into_params() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default())
            .with_root_schema(ArgumentSchema::new(vec![ArgumentSpec::new("profile", ArgumentType::String)]));

        let outcome = parsed(parser.parse_line("--profile dev ns/read", &mut source));
        assert_eq!(outcome.pipeline[0].params["profile"], "dev");
    }

    #[test]
    fn pending_schema_suspends_the_parse() {
        let mut source = StaticSchemas::default();
        source.pending.push("ns/read".into());
        let parser = CommandParser::new(ParserOptions::default());
        assert_eq!(parser.parse_line("ns/read --file a.txt", &mut source), ParseStatus::Pending);
    }

    #[test]
    fn leading_unknown_option_is_rejected() {
        let mut source = StaticSchemas::default().with("ns/read", read_schema());
        let parser = CommandParser::new(ParserOptions::default());
        let outcome = parsed(parser.parse_line("--bogus ns/read", &mut source));
        assert_eq!(
            outcome.failures[0].error,
            ParseError::UnknownOption { token: "--bogus".into() }
        );
    }
}
