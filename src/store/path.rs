//! Dotted-path resolution over document trees
//!
//! A path such as `test_context.user.id` is split on `.`; each segment
//! selects a mapping key, or an index when the node is a sequence/array.
//! Lookups never fail on missing keys. Writes create intermediate mappings.

use serde_yaml::{Mapping, Value};

use crate::common::{Error, Result};

/// Path separator
pub const SEPARATOR: char = '.';

/// Split a dotted path into segments, rejecting empty paths and segments
pub fn segments(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split(SEPARATOR).collect();
    if path.is_empty() || parts.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

/// Look up a segment in a YAML mapping
///
/// Keys are normally strings, but YAML lets `1:` be a number key, so numeric
/// segments fall back to a number lookup.
fn mapping_child<'a>(map: &'a Mapping, segment: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(segment) {
        return Some(v);
    }
    if let Ok(n) = segment.parse::<i64>() {
        return map.get(Value::Number(n.into()));
    }
    None
}

/// Resolve a dotted path against a YAML value
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segs = segments(path).ok()?;
    let mut node = root;
    for seg in segs {
        node = match node {
            Value::Mapping(map) => mapping_child(map, seg)?,
            Value::Sequence(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Resolve a dotted path against a YAML mapping root
pub fn get_in<'a>(root: &'a Mapping, path: &str) -> Option<&'a Value> {
    let segs = segments(path).ok()?;
    let (first, rest) = segs.split_first()?;
    let node = mapping_child(root, first)?;
    if rest.is_empty() {
        return Some(node);
    }
    get(node, &rest.join("."))
}

/// Write `value` at `path`, creating intermediate mappings
///
/// An index segment into an existing sequence writes into that element.
/// Any other non-mapping node in the way is replaced by a mapping.
pub fn set(root: &mut Mapping, path: &str, value: Value) -> Result<()> {
    let segs = segments(path)?;
    set_segments(root, &segs, value);
    Ok(())
}

fn set_segments(map: &mut Mapping, segs: &[&str], value: Value) {
    let key = Value::String(segs[0].to_string());
    if segs.len() == 1 {
        map.insert(key, value);
        return;
    }

    let child = map
        .entry(key)
        .or_insert(Value::Mapping(Mapping::new()));
    set_child(child, &segs[1..], value);
}

fn set_child(node: &mut Value, segs: &[&str], value: Value) {
    if let Value::Sequence(items) = node {
        if let Some(item) = segs[0].parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            if segs.len() == 1 {
                *item = value;
            } else {
                set_child(item, &segs[1..], value);
            }
            return;
        }
    }

    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(inner) = node {
        set_segments(inner, segs, value);
    }
}

/// Remove the subtree at `path`, returning it if it existed
///
/// Removing a sequence element shifts the elements after it.
pub fn remove(root: &mut Mapping, path: &str) -> Result<Option<Value>> {
    let segs = segments(path)?;
    let (first, rest) = segs
        .split_first()
        .ok_or_else(|| Error::InvalidPath(path.to_string()))?;

    if rest.is_empty() {
        return Ok(root.remove(*first));
    }
    Ok(root
        .get_mut(*first)
        .and_then(|child| remove_from(child, rest)))
}

fn remove_from(node: &mut Value, segs: &[&str]) -> Option<Value> {
    let (first, rest) = segs.split_first()?;
    match node {
        Value::Mapping(map) => {
            if rest.is_empty() {
                map.remove(*first)
            } else {
                remove_from(map.get_mut(*first)?, rest)
            }
        }
        Value::Sequence(items) => {
            let index = first.parse::<usize>().ok().filter(|i| *i < items.len())?;
            if rest.is_empty() {
                Some(items.remove(index))
            } else {
                remove_from(&mut items[index], rest)
            }
        }
        _ => None,
    }
}

/// Resolve a dotted path against a JSON value (response bodies)
pub fn get_json<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let segs = segments(path).ok()?;
    let mut node = root;
    for seg in segs {
        node = match node {
            serde_json::Value::Object(map) => map.get(seg)?,
            serde_json::Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_segments_rejects_empty() {
        assert!(segments("").is_err());
        assert!(segments("a..b").is_err());
        assert!(segments(".a").is_err());
        assert_eq!(segments("a.b").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_get_nested() {
        let root = doc("environments:\n  api_base_url: https://x\n  timeout: 5\n");
        assert_eq!(
            get_in(&root, "environments.timeout"),
            Some(&Value::Number(5.into()))
        );
        assert_eq!(get_in(&root, "environments.missing"), None);
        assert_eq!(get_in(&root, "environments.timeout.deeper"), None);
        assert_eq!(get_in(&root, ""), None);
    }

    #[test]
    fn test_get_sequence_index_and_numeric_key() {
        let root = doc("users:\n  - name: a\n  - name: b\ncodes:\n  1: one\n");
        assert_eq!(
            get_in(&root, "users.1.name"),
            Some(&Value::String("b".to_string()))
        );
        assert_eq!(get_in(&root, "users.5.name"), None);
        assert_eq!(
            get_in(&root, "codes.1"),
            Some(&Value::String("one".to_string()))
        );
    }

    #[test]
    fn test_set_creates_intermediate_levels() {
        let mut root = Mapping::new();
        set(&mut root, "test_context.user.id", Value::Number(42.into())).unwrap();
        assert_eq!(
            get_in(&root, "test_context.user.id"),
            Some(&Value::Number(42.into()))
        );
    }

    #[test]
    fn test_set_replaces_scalar_in_the_way() {
        let mut root = doc("a: 1\n");
        set(&mut root, "a.b", Value::Bool(true)).unwrap();
        assert_eq!(get_in(&root, "a.b"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_set_into_sequence_element_keeps_siblings() {
        let mut root = doc("users:\n  - id: 1\n  - id: 2\n");
        set(&mut root, "users.0.id", Value::Number(9.into())).unwrap();
        assert_eq!(get_in(&root, "users.0.id"), Some(&Value::Number(9.into())));
        assert_eq!(get_in(&root, "users.1.id"), Some(&Value::Number(2.into())));

        set(&mut root, "users.1", Value::String("replaced".to_string())).unwrap();
        assert_eq!(
            get_in(&root, "users.1"),
            Some(&Value::String("replaced".to_string()))
        );
        assert!(get_in(&root, "users.0.id").is_some());
    }

    #[test]
    fn test_set_out_of_range_index_becomes_mapping_key() {
        let mut root = doc("users:\n  - id: 1\n");
        set(&mut root, "users.3.id", Value::Number(4.into())).unwrap();
        assert_eq!(get_in(&root, "users.3.id"), Some(&Value::Number(4.into())));
        assert!(get_in(&root, "users").unwrap().is_mapping());
    }

    #[test]
    fn test_remove_through_sequence() {
        let mut root = doc("users:\n  - id: 1\n    name: a\n  - id: 2\n");
        let removed = remove(&mut root, "users.0.name").unwrap();
        assert_eq!(removed, Some(Value::String("a".to_string())));
        assert_eq!(get_in(&root, "users.0.name"), None);
        assert_eq!(get_in(&root, "users.1.id"), Some(&Value::Number(2.into())));

        assert_eq!(remove(&mut root, "users.7").unwrap(), None);
        let removed = remove(&mut root, "users.0").unwrap();
        assert!(removed.is_some());
        assert_eq!(get_in(&root, "users.0.id"), Some(&Value::Number(2.into())));
    }

    #[test]
    fn test_remove_subtree() {
        let mut root = doc("a:\n  b: 1\n  c: 2\n");
        let removed = remove(&mut root, "a.b").unwrap();
        assert_eq!(removed, Some(Value::Number(1.into())));
        assert_eq!(get_in(&root, "a.b"), None);
        assert!(get_in(&root, "a.c").is_some());
        assert_eq!(remove(&mut root, "x.y").unwrap(), None);
    }

    #[test]
    fn test_get_json() {
        let body = serde_json::json!({"code": 0, "data": {"items": [{"id": 7}]}});
        assert_eq!(get_json(&body, "data.items.0.id"), Some(&serde_json::json!(7)));
        assert_eq!(get_json(&body, "data.items.1.id"), None);
        assert_eq!(get_json(&body, "code.x"), None);
    }
}
