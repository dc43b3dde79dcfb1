use spl_types::is_platform_namespace;

use crate::ResolveError;

/// File holding the implementation manifest of a module directory.
pub const MANIFEST_FILE: &str = "index.json";
/// Fallback schema file name of a module directory.
pub const INDEX_SCHEMA_FILE: &str = "index_arguments.json";
/// Suffix of the preferred `<lastSegment>_arguments.json` schema file.
pub const SCHEMA_FILE_SUFFIX: &str = "_arguments.json";

/// Where a URI may be found, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// `apps/<app>/modules/<rest>`
    Override { app: String, rest: String },
    /// `modules/<uri>`
    Global { path: String },
}

/// Normalizes a URI into its non-empty `/`-separated segments.
pub fn uri_segments(uri: &str) -> Vec<&str> {
    uri.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Lists the lookup candidates for `uri`, override first.
///
/// Platform namespaces (`spl`, `tools`) only resolve globally; any other
/// first segment names an application whose override tree is searched first.
///
/// # Example
/// ```rust
/// use spl_registry::utils::{Candidate, lookup_candidates};
///
/// let candidates = lookup_candidates("usr/x").expect("candidates");
/// assert_eq!(candidates[0], Candidate::Override { app: "usr".into(), rest: "x".into() });
/// assert_eq!(candidates[1], Candidate::Global { path: "usr/x".into() });
/// ```
pub fn lookup_candidates(uri: &str) -> Result<Vec<Candidate>, ResolveError> {
    let segments = uri_segments(uri);
    let Some((namespace, rest)) = segments.split_first() else {
        return Err(ResolveError::EmptyUri);
    };

    let global = Candidate::Global {
        path: segments.join("/"),
    };
    if is_platform_namespace(namespace) {
        return Ok(vec![global]);
    }
    Ok(vec![
        Candidate::Override {
            app: (*namespace).to_string(),
            rest: rest.join("/"),
        },
        global,
    ])
}

/// Schema file names tried for `uri`, preferred first.
pub fn schema_file_names(uri: &str) -> Vec<String> {
    match uri_segments(uri).last() {
        Some(last) => vec![format!("{last}{SCHEMA_FILE_SUFFIX}"), INDEX_SCHEMA_FILE.to_string()],
        None => vec![INDEX_SCHEMA_FILE.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_uris_only_resolve_globally() {
        let candidates = lookup_candidates("spl/command/parse").expect("candidates");
        assert_eq!(
            candidates,
            vec![Candidate::Global {
                path: "spl/command/parse".into()
            }]
        );
    }

    #[test]
    fn bare_application_uri_searches_app_root() {
        let candidates = lookup_candidates("/usr/").expect("candidates");
        assert_eq!(
            candidates[0],
            Candidate::Override {
                app: "usr".into(),
                rest: String::new()
            }
        );
    }

    #[test]
    fn empty_uri_is_an_error() {
        assert!(matches!(lookup_candidates(""), Err(ResolveError::EmptyUri)));
        assert!(matches!(lookup_candidates("//"), Err(ResolveError::EmptyUri)));
    }

    #[test]
    fn schema_names_follow_last_segment() {
        assert_eq!(schema_file_names("ns/read"), vec!["read_arguments.json", "index_arguments.json"]);
        assert_eq!(schema_file_names(""), vec!["index_arguments.json"]);
    }
}
