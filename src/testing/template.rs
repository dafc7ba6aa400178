//! `${…}` placeholder substitution for flow steps
//!
//! Supported placeholders:
//! - `${data.<path>}`   value from the test-data store
//! - `${config.<path>}` value from the configuration
//! - `${env.<NAME>}`    environment variable
//! - `${timestamp}`     unix time in seconds, fixed for the whole run
//!
//! A string that is exactly one placeholder takes the referenced value's
//! type (so `${data.user_id}` stays a number); placeholders embedded in
//! longer strings are rendered as text.

use serde_json::Value;
use serde_yaml::Mapping;

use crate::common::config::ConfigStore;
use crate::common::{Error, Result};
use crate::store::path;

/// Sources placeholders resolve against
pub struct TemplateScope<'a> {
    pub data: &'a Mapping,
    pub config: &'a ConfigStore,
    pub timestamp: u64,
}

impl TemplateScope<'_> {
    /// Resolve one placeholder name
    pub fn lookup(&self, name: &str) -> Result<Value> {
        let name = name.trim();
        if name == "timestamp" {
            return Ok(Value::from(self.timestamp));
        }

        let (source, key) = name
            .split_once('.')
            .ok_or_else(|| Error::Template(format!("unknown placeholder '${{{}}}'", name)))?;

        let yaml = match source {
            "data" => path::get_in(self.data, key),
            "config" => self.config.get(key),
            "env" => {
                return std::env::var(key).map(Value::String).map_err(|_| {
                    Error::Template(format!("environment variable '{}' is not set", key))
                });
            }
            _ => {
                return Err(Error::Template(format!(
                    "unknown placeholder source '{}' in '${{{}}}'",
                    source, name
                )))
            }
        };

        let yaml = yaml.ok_or_else(|| {
            Error::Template(format!("'{}' is not set (in '${{{}}}')", key, name))
        })?;
        serde_json::to_value(yaml)
            .map_err(|e| Error::Template(format!("'{}' cannot be used as JSON: {}", name, e)))
    }
}

/// Substitute placeholders in a JSON value, recursively
pub fn render_value(value: &Value, scope: &TemplateScope<'_>) -> Result<Value> {
    Ok(match value {
        Value::String(s) => render_string_value(s, scope)?,
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, scope))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(render_str(k, scope)?, render_value(v, scope)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

/// Substitute placeholders in a string, producing text
pub fn render_str(input: &str, scope: &TemplateScope<'_>) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Template(format!("unterminated placeholder in '{}'", input)))?;
        let value = scope.lookup(&after[..end])?;
        out.push_str(&value_text(&value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn render_string_value(s: &str, scope: &TemplateScope<'_>) -> Result<Value> {
    if let Some(name) = sole_placeholder(s) {
        return scope.lookup(name);
    }
    render_str(s, scope).map(Value::String)
}

/// Placeholder name if `s` is exactly one `${…}`
fn sole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains("${") || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Text form of a value for embedding in strings and query parameters
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
