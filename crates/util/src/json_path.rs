//! Dotted-path navigation over `serde_json` values.
//!
//! Paths use `.` as the separator (`execute.pipeline.0.action`); array
//! elements are addressed by decimal index. Empty segments are ignored, so
//! `"a..b"` and `"a.b"` are the same path.

use serde_json::{Map as JsonMap, Value};

/// Splits a dotted path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|segment| !segment.is_empty()).collect()
}

/// Reads the value at `path`, returning `None` on any missing segment.
///
/// An empty path addresses `root` itself.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use spl_util::json_path::get_path;
///
/// let value = json!({"execute": {"pipeline": [{"action": "ns/read"}]}});
/// assert_eq!(get_path(&value, "execute.pipeline.0.action"), Some(&json!("ns/read")));
/// assert_eq!(get_path(&value, "execute.missing"), None);
/// ```
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    split_path(path).into_iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Mutable counterpart of [`get_path`].
pub fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    split_path(path).into_iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |index| items.get_mut(index)),
        _ => None,
    })
}

/// Writes `value` at `path` inside `root`.
///
/// When `create_missing` is false every parent segment must already exist
/// and the write is a no-op otherwise. When true, missing parents are
/// created as empty objects. Returns whether the value was written.
///
/// # Example
/// ```rust
/// use serde_json::{Map, json};
/// use spl_util::json_path::set_path;
///
/// let mut root = Map::new();
/// assert!(!set_path(&mut root, "app.name", json!("usr"), false));
/// assert!(set_path(&mut root, "app.name", json!("usr"), true));
/// assert_eq!(root["app"]["name"], "usr");
/// ```
pub fn set_path(root: &mut JsonMap<String, Value>, path: &str, value: Value, create_missing: bool) -> bool {
    let segments = split_path(path);
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        if !current.contains_key(*segment) {
            if !create_missing {
                return false;
            }
            current.insert((*segment).to_string(), Value::Object(JsonMap::new()));
        }
        match current.get_mut(*segment) {
            Some(Value::Object(next)) => current = next,
            _ => return false,
        }
    }

    current.insert((*last).to_string(), value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_path_addresses_root() {
        let value = json!({"a": 1});
        assert_eq!(get_path(&value, ""), Some(&value));
    }

    #[test]
    fn array_segments_require_numeric_index() {
        let value = json!({"items": ["x", "y"]});
        assert_eq!(get_path(&value, "items.1"), Some(&json!("y")));
        assert_eq!(get_path(&value, "items.first"), None);
        assert_eq!(get_path(&value, "items.9"), None);
    }

    #[test]
    fn set_path_refuses_to_descend_into_scalars() {
        let mut root = JsonMap::new();
        root.insert("leaf".into(), json!(3));
        assert!(!set_path(&mut root, "leaf.child", json!(true), true));
        assert_eq!(root["leaf"], json!(3));
    }

    #[test]
    fn get_path_mut_allows_in_place_updates() {
        let mut value = json!({"ns/read": {"file": "a.txt"}});
        if let Some(slot) = get_path_mut(&mut value, "ns/read.file") {
            *slot = json!("b.txt");
        }
        assert_eq!(value["ns/read"]["file"], "b.txt");
    }
}
