use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Map as JsonMap, Value, json};
use spl_engine::{
    ConsoleMode, ExecutionContext, ParserOptions, PipelineEngine, WorkspaceStore,
    actions::{COMMAND_HELP_ACTION, COMMAND_PARSE_ACTION},
    error::PARSE_ERROR_CODE,
    parser::to_command_line,
};
use spl_registry::{ActionResolver, RuntimeConfig};
use spl_types::{PipelineDescriptor, RequestRecord};
use spl_util::COMMAND_GROUP_DELIMITER;
use tracing::debug;

/// Run SPL actions: `spl <action> [options] [_!_ <action> [options] ...]`.
///
/// Everything after the launcher options is handed to the command parser,
/// including `--help`, `--verbose`, `--debug`, `--steps` and `--test`.
#[derive(Debug, Parser)]
#[command(name = "spl", version, about, disable_help_flag = true)]
struct Cli {
    /// Runtime config file; defaults to $SPL_CONFIG_PATH or <config dir>/spl/config.json.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Platform root holding `modules/` and `apps/`.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Step budget for the whole invocation.
    #[arg(long, value_name = "STEPS")]
    ttl: Option<u32>,

    /// Print the full request record as JSON.
    #[arg(long)]
    json: bool,

    /// Action command line; groups are separated by `_!_`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(console_hint(&cli.command));

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Console mode requested by the options leading the command, known before
/// parsing so the subscriber can be installed first.
fn console_hint(tokens: &[String]) -> ConsoleMode {
    let mut console = ConsoleMode::Standard;
    let mut previous = "";
    for token in tokens {
        if !token.starts_with('-') && previous != "--steps" {
            break;
        }
        match token.as_str() {
            "--debug" => console = console.max(ConsoleMode::Debug),
            "--verbose" | "-v" => console = console.max(ConsoleMode::Verbose),
            _ => {}
        }
        previous = token;
    }
    console
}

/// Rebuilds the command line from shell arguments. A bare `_!_` argument
/// separates groups; every other argument is quoted as needed.
fn command_line(tokens: &[String]) -> String {
    if tokens.is_empty() {
        return "--help".to_string();
    }
    let groups: Vec<Vec<String>> = tokens
        .split(|token| token == COMMAND_GROUP_DELIMITER)
        .map(<[String]>::to_vec)
        .collect();
    to_command_line(&groups)
}

/// Request that parses `line` and runs the resulting pipeline.
fn seed_request(line: &str, platform_root: &Path) -> RequestRecord {
    let mut request = RequestRecord::with_pipeline([PipelineDescriptor::new(COMMAND_PARSE_ACTION)]);
    request.headers.namespaces.insert("command".into(), json!({ "line": line }));
    request
        .headers
        .namespaces
        .insert("app".into(), json!({ "root": platform_root.to_string_lossy() }));
    request
}

fn init_tracing(console: ConsoleMode) {
    let default_filter = match console {
        ConsoleMode::Debug => "debug",
        ConsoleMode::Verbose => "info",
        ConsoleMode::Standard => "warn",
    };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match cli.config.as_deref() {
        Some(path) => RuntimeConfig::load_from(path)?,
        None => RuntimeConfig::load(),
    };
    if let Some(root) = cli.root {
        config.root = Some(root);
    }
    let platform_root = config.platform_root();
    debug!(root = %platform_root.display(), ttl = config.ttl, "runtime config loaded");

    let resolver = ActionResolver::from_config(&config).context("failed to scan module trees")?;
    let engine = PipelineEngine::with_platform_actions(
        resolver,
        ParserOptions {
            strict_residue: config.strict_residue,
        },
    );

    let mut request = seed_request(&command_line(&cli.command), &platform_root);

    let mut context = ExecutionContext::new(cli.ttl.unwrap_or(config.ttl));
    context.overlays = config.apps.clone();
    let mut workspace = WorkspaceStore::new();

    let summary = engine.run(&mut request, &mut context, &mut workspace);
    debug!(?summary, cached = workspace.len(), "run finished");

    print_result(&request, cli.json)?;
    if context.console >= ConsoleMode::Verbose {
        eprintln!("{} step(s) dispatched, {} remaining", summary.dispatched, summary.remaining_ttl);
    }

    let parse_failed = request.error().is_some_and(|error| error.code == PARSE_ERROR_CODE);
    if let Some(error) = request.error() {
        eprintln!("error [{}] {}: {}", error.code, error.operation, error.message);
    }
    Ok(if summary.succeeded() && !parse_failed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(request: &RequestRecord, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(request)?);
        return Ok(());
    }
    if let Some(text) = request
        .value_of(COMMAND_HELP_ACTION)
        .and_then(|help| help.get("text"))
        .and_then(Value::as_str)
    {
        println!("{text}");
        return Ok(());
    }

    let results: JsonMap<String, Value> = request
        .value
        .iter()
        .filter(|(key, _)| !key.starts_with("spl/"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !results.is_empty() {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
