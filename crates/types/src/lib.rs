//! Shared type definitions for the SPL pipeline runtime.
//!
//! - [`RequestRecord`]: the `{headers, value}` envelope threaded through every action
//! - [`PipelineDescriptor`]: one queued action invocation
//! - [`ArgumentSchema`]: per-action option definitions used by the command parser
//! - [`ModuleManifest`]: implementation file of a module directory

pub mod descriptor;
pub mod manifest;
pub mod request;
pub mod schema;

pub use descriptor::{DescriptorError, PipelineDescriptor};
pub use manifest::{ModuleKind, ModuleManifest};
pub use request::{ExecuteHeaders, ExecutionError, Headers, HistoryEntry, HistoryOutcome, RequestRecord, WorkspaceRecord};
pub use schema::{ArgumentSchema, ArgumentSpec, ArgumentType};

/// Namespaces resolved against the platform's global module tree.
pub const PLATFORM_NAMESPACES: &[&str] = &["spl", "tools"];

/// Returns true when the first URI segment names a platform namespace.
pub fn is_platform_namespace(namespace: &str) -> bool {
    PLATFORM_NAMESPACES.contains(&namespace)
}

/// Joins a URI prefix and a segment with `/`, treating an empty prefix as the root.
pub fn join_uri(prefix: &str, segment: &str) -> String {
    let segment = segment.trim_matches('/');
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_uri_handles_root_prefix() {
        assert_eq!(join_uri("", "ns"), "ns");
        assert_eq!(join_uri("ns", "read"), "ns/read");
        assert_eq!(join_uri("ns/", "/read/"), "ns/read");
    }

    #[test]
    fn platform_namespaces() {
        assert!(is_platform_namespace("spl"));
        assert!(is_platform_namespace("tools"));
        assert!(!is_platform_namespace("usr"));
    }
}
