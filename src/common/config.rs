//! Configuration file handling
//!
//! The configuration is a YAML document read once per [`ConfigStore`] and
//! never written back. It is exposed two ways: raw dotted-path lookups for
//! free-form values (`test_data.*`, anything a flow references through
//! `${config.…}`) and the typed [`Settings`] view used by the client and the
//! token manager.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{Error, Result};
use crate::store::path;

/// Read-only configuration document
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    doc: OnceLock<Mapping>,
}

impl ConfigStore {
    /// Create a store for `path` without reading it yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: OnceLock::new(),
        }
    }

    /// Create a store and load it immediately
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    /// Create an already-loaded store from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let store = Self::new(PathBuf::new());
        let doc = parse_document(content, "<inline>")?;
        let _ = store.doc.set(doc);
        Ok(store)
    }

    /// Path of the configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document
    ///
    /// The file is read on the first call only; later calls return the
    /// cached document.
    pub fn load(&self) -> Result<&Mapping> {
        if let Some(doc) = self.doc.get() {
            return Ok(doc);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.display().to_string(),
            error: e.to_string(),
        })?;
        let doc = parse_document(&content, &self.path.display().to_string())?;

        tracing::debug!(path = %self.path.display(), keys = doc.len(), "Loaded configuration");

        Ok(self.doc.get_or_init(|| doc))
    }

    /// Whether the document has been loaded
    pub fn is_loaded(&self) -> bool {
        self.doc.get().is_some()
    }

    /// Resolve a dotted path; `None` if missing or not loaded
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get().and_then(|doc| path::get_in(doc, key))
    }

    /// Resolve a dotted path, falling back to `default`
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Resolve a dotted path as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Resolve a dotted path as an unsigned integer
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Typed view of the document
    pub fn settings(&self) -> Result<Settings> {
        let doc = self.load()?;
        serde_yaml::from_value(Value::Mapping(doc.clone())).map_err(|e| {
            Error::ConfigParse(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn parse_document(content: &str, origin: &str) -> Result<Mapping> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| Error::ConfigParse(format!("{}: {}", origin, e)))?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(Error::ConfigParse(format!(
            "{}: expected a mapping at the top level, found {}",
            origin,
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Typed configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Target environment URLs and timeout
    pub environments: Environments,

    /// Credentials used by the login call
    #[serde(default)]
    pub ops_account: Option<Account>,

    /// Token handling
    #[serde(default)]
    pub auth: AuthSettings,

    /// Response envelope shape
    #[serde(default)]
    pub response: ResponseSettings,

    /// Test-data file, relative to the configuration file
    #[serde(default)]
    pub test_data_file: Option<PathBuf>,
}

/// Environment URLs
#[derive(Debug, Deserialize, Clone)]
pub struct Environments {
    /// Login endpoint (absolute URL)
    #[serde(default)]
    pub ops_login_url: Option<String>,

    /// Base URL business endpoints are resolved against
    pub api_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_timeout() -> u64 {
    30
}

/// Login credentials
#[derive(Debug, Deserialize, Clone)]
pub struct Account {
    pub username: String,
    pub password: String,
}

/// Token handling settings
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// Dotted path of the token in the login response body
    #[serde(default = "default_token_field")]
    pub token_field: String,

    /// Header the token is sent in
    #[serde(default = "default_header")]
    pub header: String,

    /// Scheme prefixed to the token; empty sends the bare token
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Token lifetime; unset means valid until rejected
    #[serde(default)]
    pub token_ttl_secs: Option<u64>,

    /// Business codes meaning "token expired"
    #[serde(default)]
    pub expired_codes: Vec<serde_json::Value>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_field: default_token_field(),
            header: default_header(),
            scheme: default_scheme(),
            token_ttl_secs: None,
            expired_codes: Vec::new(),
        }
    }
}

fn default_token_field() -> String {
    "data.token".to_string()
}
fn default_header() -> String {
    "Authorization".to_string()
}
fn default_scheme() -> String {
    "Bearer".to_string()
}

/// Response envelope settings
#[derive(Debug, Deserialize, Clone)]
pub struct ResponseSettings {
    /// Dotted path of the business code in the body
    #[serde(default = "default_code_field")]
    pub code_field: String,

    /// Business code meaning success
    #[serde(default = "default_success_code")]
    pub success_code: serde_json::Value,

    /// Dotted path of the payload in the body
    #[serde(default = "default_data_field")]
    pub data_field: String,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            code_field: default_code_field(),
            success_code: default_success_code(),
            data_field: default_data_field(),
        }
    }
}

fn default_code_field() -> String {
    "code".to_string()
}
fn default_success_code() -> serde_json::Value {
    serde_json::Value::from(0)
}
fn default_data_field() -> String {
    "data".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
environments:
  api_base_url: https://x
  timeout: 5
ops_account:
  username: ops
  password: secret
test_data:
  seed_user: alice
";

    #[test]
    fn test_get_and_default() {
        let store = ConfigStore::from_yaml(SAMPLE).unwrap();
        assert_eq!(store.get_u64("environments.timeout"), Some(5));
        assert_eq!(
            store.get_or("environments.missing", Value::Number(30.into())),
            Value::Number(30.into())
        );
        assert_eq!(store.get_str("test_data.seed_user"), Some("alice"));
    }

    #[test]
    fn test_get_before_load_is_none() {
        let store = ConfigStore::new("/nonexistent/config.yaml");
        assert!(!store.is_loaded());
        assert_eq!(store.get("environments.timeout"), None);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let store = ConfigStore::new("/nonexistent/config.yaml");
        let err = store.load().unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        assert!(matches!(
            ConfigStore::from_yaml("environments: [unclosed").unwrap_err(),
            Error::ConfigParse(_)
        ));
        assert!(matches!(
            ConfigStore::from_yaml("- just\n- a list\n").unwrap_err(),
            Error::ConfigParse(_)
        ));
    }

    #[test]
    fn test_load_is_cached() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = ConfigStore::open(file.path()).unwrap();
        std::fs::write(file.path(), "environments: {api_base_url: https://changed}\n").unwrap();

        let doc = store.load().unwrap();
        assert_eq!(
            path::get_in(doc, "environments.api_base_url"),
            Some(&Value::String("https://x".to_string()))
        );
    }

    #[test]
    fn test_settings_defaults() {
        let store = ConfigStore::from_yaml(SAMPLE).unwrap();
        let settings = store.settings().unwrap();
        assert_eq!(settings.environments.timeout, 5);
        assert_eq!(settings.auth.header, "Authorization");
        assert_eq!(settings.auth.scheme, "Bearer");
        assert_eq!(settings.auth.token_field, "data.token");
        assert_eq!(settings.response.code_field, "code");
        assert_eq!(settings.response.success_code, serde_json::json!(0));
        assert_eq!(settings.ops_account.unwrap().username, "ops");
    }

    #[test]
    fn test_settings_require_base_url() {
        let store = ConfigStore::from_yaml("environments:\n  timeout: 5\n").unwrap();
        assert!(matches!(store.settings().unwrap_err(), Error::ConfigParse(_)));
    }
}
