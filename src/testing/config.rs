//! Flow file configuration types
//!
//! Defines the data structures for deserializing YAML flow files. A file is
//! one flow: its tests run in order and share the test-data store.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::assertions::FieldCheck;

/// A flow loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct FlowFile {
    /// Name of the flow
    pub name: String,
    /// Optional description of what the flow covers
    pub description: Option<String>,
    /// Markers applied to every test in the file
    #[serde(default)]
    pub markers: Vec<String>,
    /// Test-data scopes cleared before the flow runs
    #[serde(default)]
    pub reset_data: Option<ResetData>,
    /// Tests in execution order
    pub tests: Vec<TestCase>,
}

/// Test-data reset performed before a flow
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ResetData {
    /// `true` clears everything, `false` nothing
    All(bool),
    /// Clear only these scopes
    Scopes(Vec<String>),
}

/// A single test inside a flow
#[derive(Deserialize, Debug)]
pub struct TestCase {
    /// Identifier used for `file::id` selection
    pub id: String,
    /// Human-readable name (defaults to the id)
    pub name: Option<String>,
    /// Markers for `--marker` selection
    #[serde(default)]
    pub markers: Vec<String>,
    /// Steps in execution order
    pub steps: Vec<TestStep>,
}

impl TestCase {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A single step in a test
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Call an endpoint
    Request(RequestStep),
    /// Write a value into the test-data store
    SetData {
        path: String,
        value: serde_json::Value,
    },
    /// Clear the test-data store or one subtree
    ResetData { scope: Option<String> },
    /// Log in explicitly
    Login {
        #[serde(default)]
        force: bool,
    },
}

/// Request step definition
#[derive(Deserialize, Debug)]
pub struct RequestStep {
    /// HTTP method (case-insensitive)
    #[serde(default = "default_method")]
    pub method: String,
    /// Endpoint relative to `environments.api_base_url`, or absolute URL
    pub endpoint: String,
    /// Query string parameters
    #[serde(default)]
    pub query: BTreeMap<String, serde_json::Value>,
    /// Extra headers
    #[serde(default)]
    pub headers: BTreeMap<String, serde_json::Value>,
    /// JSON body
    pub json: Option<serde_json::Value>,
    /// Attach the cached token (default: true)
    #[serde(default = "default_auth")]
    pub auth: bool,
    /// Expectations on the response
    pub expect: Option<ResponseExpectation>,
    /// Values copied into test data: `data_path: response_path`
    #[serde(default)]
    pub save: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_auth() -> bool {
    true
}

/// Expectations for a response
#[derive(Deserialize, Debug, Default)]
pub struct ResponseExpectation {
    /// Expected transport status
    pub status: Option<u16>,
    /// Expected business code
    pub biz_code: Option<serde_json::Value>,
    /// Field assertions
    #[serde(default)]
    pub fields: Vec<FieldAssertion>,
}

/// Assertion for a response field
#[derive(Deserialize, Debug)]
pub struct FieldAssertion {
    /// Dotted path into the body
    pub path: String,
    /// Expected value (loose scalar match)
    pub equals: Option<serde_json::Value>,
    /// Expected substring
    pub contains: Option<String>,
    /// Expected presence
    pub exists: Option<bool>,
}

impl FieldAssertion {
    /// Checks requested by this assertion, in the order they are applied
    pub fn checks(&self) -> Vec<FieldCheck> {
        let mut checks = Vec::new();
        if let Some(exists) = self.exists {
            checks.push(FieldCheck::Exists(exists));
        }
        if let Some(value) = &self.equals {
            checks.push(FieldCheck::Equals(value.clone()));
        }
        if let Some(needle) = &self.contains {
            checks.push(FieldCheck::Contains(needle.clone()));
        }
        checks
    }
}
