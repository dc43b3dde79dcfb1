//! # Shell-like Lexing Utilities
//!
//! Tokenizes raw command strings the way the command parser expects them:
//! whitespace separated, with single/double quotes and backslash escapes
//! keeping a token together. Command groups are separated by a standalone
//! `_!_` token.

/// Token separating independent command groups in one command string.
pub const COMMAND_GROUP_DELIMITER: &str = "_!_";

/// Tokenize input using a simple, shell-like lexer.
///
/// Quotes are preserved in the returned tokens; use [`unquote`] to strip them.
///
/// # Example
/// ```rust
/// use spl_util::shell_lexing::lex_shell_like;
///
/// let tokens = lex_shell_like("ns/write --content 'hello world'");
/// assert_eq!(tokens, vec!["ns/write", "--content", "'hello world'"]);
/// ```
pub fn lex_shell_like(input: &str) -> Vec<String> {
    lex_shell_like_ranged(input)
        .into_iter()
        .map(|token| token.text.to_string())
        .collect()
}

/// Token with original byte positions.
#[derive(Debug, Clone)]
pub struct LexToken<'a> {
    /// The text content of the token, quotes included
    pub text: &'a str,
    /// The starting byte position in the original string
    pub start: usize,
    /// The ending byte position in the original string
    pub end: usize,
}

/// Tokenize input returning borrowed slices and byte ranges.
///
/// # Example
/// ```rust
/// use spl_util::shell_lexing::lex_shell_like_ranged;
///
/// let tokens = lex_shell_like_ranged("ns/read --file a.txt");
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[1].text, "--file");
/// assert_eq!(tokens[1].start, 8);
/// assert_eq!(tokens[1].end, 14);
/// ```
pub fn lex_shell_like_ranged(input: &str) -> Vec<LexToken<'_>> {
    let mut tokens = Vec::new();
    let mut current_index = 0usize;
    let bytes = input.as_bytes();

    while current_index < bytes.len() {
        current_index = skip_whitespace(bytes, current_index);
        if current_index >= bytes.len() {
            break;
        }

        let start = current_index;
        current_index = parse_token(bytes, current_index);

        tokens.push(LexToken {
            text: &input[start..current_index],
            start,
            end: current_index,
        });
    }

    tokens
}

/// Removes quoting and backslash escapes from a lexed token.
///
/// Single quotes are literal (no escapes inside), double quotes honor
/// backslash escapes, and a backslash outside quotes escapes the next
/// character.
///
/// # Example
/// ```rust
/// use spl_util::shell_lexing::unquote;
///
/// assert_eq!(unquote("'hello world'"), "hello world");
/// assert_eq!(unquote("\"say \\\"hi\\\"\""), "say \"hi\"");
/// assert_eq!(unquote("path\\ with\\ spaces"), "path with spaces");
/// ```
pub fn unquote(token: &str) -> String {
    let mut output = String::with_capacity(token.len());
    let mut in_single_quotes = false;
    let mut in_double_quotes = false;
    let mut characters = token.chars();

    while let Some(character) = characters.next() {
        match character {
            '\\' if !in_single_quotes => {
                if let Some(escaped) = characters.next() {
                    output.push(escaped);
                } else {
                    output.push('\\');
                }
            }
            '\'' if !in_double_quotes => in_single_quotes = !in_single_quotes,
            '"' if !in_single_quotes => in_double_quotes = !in_double_quotes,
            other => output.push(other),
        }
    }

    output
}

/// Splits a raw command string into unquoted token groups.
///
/// Groups are separated by a bare `_!_` token; a quoted `'_!_'` is an
/// ordinary argument. Empty groups are dropped.
///
/// # Example
/// ```rust
/// use spl_util::shell_lexing::split_command_groups;
///
/// let groups = split_command_groups("ns/write --file a.txt _!_ ns/read --file a.txt");
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[1], vec!["ns/read", "--file", "a.txt"]);
/// ```
pub fn split_command_groups(input: &str) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for token in lex_shell_like_ranged(input) {
        if token.text == COMMAND_GROUP_DELIMITER {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(unquote(token.text));
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

fn skip_whitespace(bytes: &[u8], start_index: usize) -> usize {
    let mut index = start_index;
    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }
    index
}

/// Returns the index just past the token starting at `start_index`.
fn parse_token(bytes: &[u8], start_index: usize) -> usize {
    let mut index = start_index;
    let mut in_single_quotes = false;
    let mut in_double_quotes = false;

    while index < bytes.len() {
        let byte = bytes[index];

        if byte == b'\\' && !in_single_quotes && index + 1 < bytes.len() {
            index += 2;
            continue;
        }
        if byte == b'\'' && !in_double_quotes {
            in_single_quotes = !in_single_quotes;
        } else if byte == b'"' && !in_single_quotes {
            in_double_quotes = !in_double_quotes;
        } else if !in_single_quotes && !in_double_quotes && byte.is_ascii_whitespace() {
            break;
        }
        index += 1;
    }

    index
}
