//! Mutable test-data document
//!
//! Values written by one step (created IDs, the auth token) are read back by
//! later steps and by later runs. Every mutation is flushed to disk before
//! the call returns, so the file always reflects what the process has seen.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

use super::path;

/// Test-data store backed by a YAML file
#[derive(Debug)]
pub struct TestDataStore {
    path: PathBuf,
    doc: Mapping,
}

impl TestDataStore {
    /// Open the store, seeding from `path` if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let doc = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;
            parse(&content, &path)?
        } else {
            Mapping::new()
        };

        tracing::debug!(path = %path.display(), keys = doc.len(), "Opened test-data store");

        Ok(Self { path, doc })
    }

    /// File the document is persisted to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole document
    pub fn document(&self) -> &Mapping {
        &self.doc
    }

    /// Resolve a dotted path
    pub fn get(&self, key: &str) -> Option<&Value> {
        path::get_in(&self.doc, key)
    }

    /// Resolve a dotted path, falling back to `default`
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Resolve a dotted path as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Write a value and persist
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        path::set(&mut self.doc, key, value)?;
        tracing::debug!(key, "Test data updated");
        self.save()
    }

    /// Clear the whole document (`None`) or one subtree, then persist
    pub fn reset(&mut self, scope: Option<&str>) -> Result<()> {
        match scope {
            None => self.doc.clear(),
            Some(key) => {
                path::remove(&mut self.doc, key)?;
            }
        }
        tracing::debug!(scope = scope.unwrap_or("<all>"), "Test data reset");
        self.save()
    }

    /// Flush the document to disk
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let content = serde_yaml::to_string(&self.doc)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

fn parse(content: &str, origin: &Path) -> Result<Mapping> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| Error::ConfigParse(format!("{}: {}", origin.display(), e)))?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::ConfigParse(format!(
            "{}: test data must be a mapping",
            origin.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TestDataStore {
        TestDataStore::open(dir.path().join("test_data.yaml")).unwrap()
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.document().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        store.set("test_context.user_id", 42).unwrap();
        store.set("test_context.name", "alice").unwrap();

        assert_eq!(store.get("test_context.user_id"), Some(&Value::from(42)));
        assert_eq!(store.get_str("test_context.name"), Some("alice"));
        assert_eq!(
            store.get_or("test_context.missing", Value::from("fallback")),
            Value::from("fallback")
        );
    }

    #[test]
    fn test_set_persists_for_fresh_instance() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set("orders.last.id", "ord-1").unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get_str("orders.last.id"), Some("ord-1"));
    }

    #[test]
    fn test_set_into_seeded_list_persists_siblings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("test_data.yaml"),
            "users:\n  - id: 1\n  - id: 2\n",
        )
        .unwrap();
        let mut store = store_in(&dir);
        store.set("users.0.id", 9).unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("users.0.id"), Some(&Value::from(9)));
        assert_eq!(reopened.get("users.1.id"), Some(&Value::from(2)));
    }

    #[test]
    fn test_set_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.yaml");
        let mut store = TestDataStore::open(&path).unwrap();
        store.set("k", true).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_set_rejects_empty_path() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(store.set("", 1), Err(Error::InvalidPath(_))));
        assert!(matches!(store.set("a..b", 1), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_reset_scope_and_all() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set("flow_a.id", 1).unwrap();
        store.set("flow_b.id", 2).unwrap();

        store.reset(Some("flow_a")).unwrap();
        assert_eq!(store.get("flow_a.id"), None);
        assert_eq!(store.get("flow_b.id"), Some(&Value::from(2)));

        // Missing scope is a no-op
        store.reset(Some("flow_c.nested")).unwrap();

        store.reset(None).unwrap();
        assert!(store.document().is_empty());
        assert!(store_in(&dir).document().is_empty());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_data.yaml");
        std::fs::write(&path, "- not\n- a mapping\n").unwrap();
        assert!(matches!(
            TestDataStore::open(&path),
            Err(Error::ConfigParse(_))
        ));
    }
}
