//! Small, dependency-light helpers shared by the SPL runtime crates.

pub mod json_path;
pub mod path_processing;
pub mod shell_lexing;

pub use json_path::{get_path, get_path_mut, set_path, split_path};
pub use path_processing::expand_tilde;
pub use shell_lexing::{COMMAND_GROUP_DELIMITER, lex_shell_like, lex_shell_like_ranged, split_command_groups, unquote};
