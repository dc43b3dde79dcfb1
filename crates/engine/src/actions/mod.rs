//! Compiled-in platform actions (`spl/...`).
//!
//! | URI                 | Purpose                                                  |
//! |---------------------|----------------------------------------------------------|
//! | `spl/command/parse` | turn `headers.command.line` into the pipeline            |
//! | `spl/command/help`  | render usage for URIs collected by the parser            |
//! | `spl/schema/fetch`  | load argument schemas into the workspace                 |
//! | `spl/action/define` | install a template action at runtime, optionally on disk |
//! | `spl/config/set`    | persist a config value under an action's namespace       |

mod command;
mod config;
mod define;
mod schema;

pub use command::{COMMAND_HELP_ACTION, COMMAND_PARSE_ACTION, COMMAND_VALUE_KEY, CommandHelpAction, CommandParseAction};
pub use config::{CONFIG_SET_ACTION, set_config};
pub use define::{ACTION_DEFINE_ACTION, define_action};
pub use schema::{SCHEMA_FETCH_ACTION, fetch_schemas};

use crate::{executor::HandlerRegistry, parser::ParserOptions};

/// Registers every platform action under its own URI.
pub fn register_platform_actions(handlers: &mut HandlerRegistry, options: ParserOptions) {
    handlers.register(COMMAND_PARSE_ACTION, CommandParseAction::new(options));
    handlers.register(COMMAND_HELP_ACTION, CommandHelpAction);
    handlers.register_fn(SCHEMA_FETCH_ACTION, fetch_schemas);
    handlers.register_fn(ACTION_DEFINE_ACTION, define_action);
    handlers.register_fn(CONFIG_SET_ACTION, set_config);
}
