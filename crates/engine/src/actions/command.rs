use anyhow::{Context, Result};
use serde_json::{Value, json};
use spl_types::{ArgumentSchema, ExecutionError, PipelineDescriptor};
use tracing::{debug, warn};

use super::schema::{SCHEMA_FETCH_ACTION, WorkspaceSchemas, cached_schema};
use crate::{
    executor::{ActionHandler, ActionScope, Completion},
    parser::{CommandParser, ParseOutcome, ParseStatus, ParserOptions, SchemaLookup, global_schema},
    workspace::schema_key,
};

pub const COMMAND_PARSE_ACTION: &str = "spl/command/parse";
pub const COMMAND_HELP_ACTION: &str = "spl/command/help";
/// `value` key under which the parse summary is published.
pub const COMMAND_VALUE_KEY: &str = "spl/command";

/// Parses the command line into the pipeline.
///
/// The line comes from the `line` parameter, or `headers.command.line` when
/// the descriptor has none. Argument schemas are read through the workspace,
/// so the first parse of a line usually suspends for one or more schema
/// fetches before it completes.
pub struct CommandParseAction {
    options: ParserOptions,
}

impl CommandParseAction {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }
}

impl ActionHandler for CommandParseAction {
    fn handle(&self, scope: &mut ActionScope<'_>) -> Result<Completion> {
        let line = match scope.param::<String>("line")? {
            Some(line) => line,
            None => scope
                .request
                .rc_get("command.line")
                .and_then(|line| line.as_str().map(str::to_string))
                .context("no command line in parameters or headers.command.line")?,
        };

        let mut parser = CommandParser::new(self.options);
        if let Some(root) = scope.resolver.load_root_schema()? {
            parser = parser.with_root_schema(root);
        }

        let status = parser.parse_line(&line, &mut WorkspaceSchemas { scope: &mut *scope });
        let ParseStatus::Parsed(outcome) = status else {
            debug!(%line, "command parse suspended for schema fetch");
            return Ok(Completion::Completed);
        };

        scope.context.console = scope.context.console.max(outcome.console);
        if let Some(failure) = outcome.failures.first() {
            warn!(group = failure.group, error = %failure.error, "command group could not be parsed");
            scope.request.set_error(ExecutionError::new(
                failure.error.code(),
                COMMAND_PARSE_ACTION,
                failure.error.to_string(),
            ));
        }
        scope.request.set_value(COMMAND_VALUE_KEY, summarize(&outcome)?);

        let mut pipeline = outcome.pipeline;
        if !outcome.help.is_empty() {
            pipeline.push(PipelineDescriptor::new(COMMAND_HELP_ACTION).with_param("uris", json!(outcome.help)));
        }
        debug!(queued = pipeline.len(), test = outcome.test, "command parsed");
        if pipeline.is_empty() {
            return Ok(Completion::Completed);
        }
        Ok(Completion::Pipeline(pipeline))
    }
}

fn summarize(outcome: &ParseOutcome) -> Result<Value> {
    let failures: Vec<Value> = outcome
        .failures
        .iter()
        .map(|failure| {
            json!({
                "group": failure.group,
                "code": failure.error.code(),
                "message": failure.error.to_string(),
            })
        })
        .collect();
    Ok(json!({
        "pipeline": serde_json::to_value(&outcome.pipeline)?,
        "help": outcome.help,
        "test": outcome.test,
        "tested": serde_json::to_value(&outcome.tested)?,
        "failures": failures,
    }))
}

/// Renders usage text for the `uris` parameter into `value["spl/command/help"]`.
///
/// The empty URI stands for general help: global options and known actions.
pub struct CommandHelpAction;

impl ActionHandler for CommandHelpAction {
    fn handle(&self, scope: &mut ActionScope<'_>) -> Result<Completion> {
        let uris: Vec<String> = scope.param("uris")?.unwrap_or_default();
        let keys: Vec<String> = uris.iter().filter(|uri| !uri.is_empty()).map(|uri| schema_key(uri)).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        if !scope.exists_all(&keys, SCHEMA_FETCH_ACTION, Default::default(), true) {
            return Ok(Completion::Completed);
        }

        let mut sections = Vec::with_capacity(uris.len());
        for uri in &uris {
            if uri.is_empty() {
                let mut global = global_schema();
                if let Some(root) = scope.resolver.load_root_schema()? {
                    global.extend_missing(root);
                }
                sections.push(render_general_help(&global, &scope.resolver.action_uris()));
                continue;
            }
            let description = scope
                .resolver
                .resolve_module(uri)
                .ok()
                .flatten()
                .and_then(|module| module.manifest.description);
            match cached_schema(scope.workspace, uri) {
                SchemaLookup::Ready(schema) => sections.push(render_usage(uri, description.as_deref(), &schema)),
                SchemaLookup::Missing(reason) => sections.push(format!("No help available for '{uri}': {reason}")),
                SchemaLookup::Pending => sections.push(format!("No help available for '{uri}'")),
            }
        }

        let text = sections.join("\n\n");
        scope.request.set_value(COMMAND_HELP_ACTION, json!({ "uris": uris, "text": text }));
        Ok(Completion::Completed)
    }
}

/// Usage block for one action.
pub(crate) fn render_usage(uri: &str, description: Option<&str>, schema: &ArgumentSchema) -> String {
    let mut usage = format!("Usage: spl {uri}");
    if let Some(positional) = schema.default_option() {
        usage.push_str(&format!(" [<{}>{}]", positional.name, if positional.multiple { "..." } else { "" }));
    }
    if schema.specs().iter().any(|spec| !spec.default_option) {
        usage.push_str(" [options]");
    }

    let mut text = usage;
    if let Some(description) = description.filter(|description| !description.is_empty()) {
        text.push_str("\n\n");
        text.push_str(description);
    }
    if !schema.is_empty() {
        text.push_str("\n\nOptions:\n");
        text.push_str(&render_options(schema));
    }
    text
}

fn render_general_help(global: &ArgumentSchema, actions: &[String]) -> String {
    let mut text = String::from("Usage: spl [options] <action> [arguments] [_!_ <action> ...]\n\nGlobal options:\n");
    text.push_str(&render_options(global));
    if !actions.is_empty() {
        text.push_str("\n\nActions:\n");
        text.push_str(
            &actions
                .iter()
                .map(|action| format!("  {action}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    text
}

fn render_options(schema: &ArgumentSchema) -> String {
    let rows: Vec<(String, &str)> = schema
        .specs()
        .iter()
        .map(|spec| {
            let short = spec.alias.as_deref().map(|alias| format!("-{alias}, ")).unwrap_or_else(|| "    ".into());
            let value = if spec.r#type.is_flag() {
                String::new()
            } else {
                format!(" <{}>{}", spec.r#type.label(), if spec.multiple { "..." } else { "" })
            };
            (format!("{short}--{}{value}", spec.name), spec.description.as_str())
        })
        .collect();
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(left, description)| format!("  {left:<width$}  {description}").trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
