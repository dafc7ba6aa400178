//! Response assertion helpers
//!
//! Every failure is an [`Error::Assertion`] naming the method, endpoint,
//! what was compared and both values.

use serde_json::Value;

use crate::common::{Error, Result};
use crate::store::path;

/// Placeholder shown when a field is absent from the body
const MISSING: &str = "<missing>";

/// Compare two JSON values, treating scalars loosely
///
/// `0` matches `"0"` and `true` matches `"true"`: business codes are
/// numbers in some APIs and strings in others, and configuration files
/// rarely agree with the wire. Arrays and objects must match exactly.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    if expected == actual {
        return true;
    }
    match (scalar_text(expected), scalar_text(actual)) {
        (Some(e), Some(a)) => e == a || numbers_equal(&e, &a),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn numbers_equal(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Render a value for a failure message
pub fn display(value: Option<&Value>) -> String {
    match value {
        None => MISSING.to_string(),
        Some(Value::String(s)) => format!("\"{}\"", s),
        Some(v) => v.to_string(),
    }
}

/// Assert the transport status code
pub fn assert_status(method: &str, endpoint: &str, expected: u16, actual: u16) -> Result<()> {
    if expected != actual {
        return Err(Error::assertion(method, endpoint, "status", expected, actual));
    }
    Ok(())
}

/// Assert the business code found at `code_field` in `body`
pub fn assert_biz_code(
    method: &str,
    endpoint: &str,
    code_field: &str,
    expected: &Value,
    body: &Value,
) -> Result<()> {
    let actual = path::get_json(body, code_field);
    match actual {
        Some(actual) if values_match(expected, actual) => Ok(()),
        _ => Err(Error::assertion(
            method,
            endpoint,
            "business code",
            display(Some(expected)),
            display(actual),
        )),
    }
}

/// A check against one field of a response body
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCheck {
    /// Field equals the value (loose scalar comparison)
    Equals(Value),
    /// Field's text contains the substring
    Contains(String),
    /// Field is present (`true`) or absent (`false`)
    Exists(bool),
}

/// Assert a field of `body` at a dotted path
pub fn assert_field(
    method: &str,
    endpoint: &str,
    body: &Value,
    field: &str,
    check: &FieldCheck,
) -> Result<()> {
    let actual = path::get_json(body, field);
    let what = format!("field '{}'", field);

    match check {
        FieldCheck::Equals(expected) => match actual {
            Some(a) if values_match(expected, a) => Ok(()),
            _ => Err(Error::assertion(
                method,
                endpoint,
                &what,
                display(Some(expected)),
                display(actual),
            )),
        },
        FieldCheck::Contains(needle) => {
            let text = match actual {
                Some(Value::String(s)) => Some(s.clone()),
                Some(v) => Some(v.to_string()),
                None => None,
            };
            match text {
                Some(t) if t.contains(needle.as_str()) => Ok(()),
                _ => Err(Error::assertion(
                    method,
                    endpoint,
                    &what,
                    format!("containing \"{}\"", needle),
                    display(actual),
                )),
            }
        }
        FieldCheck::Exists(should_exist) => {
            if actual.is_some() == *should_exist {
                Ok(())
            } else if *should_exist {
                Err(Error::assertion(method, endpoint, &what, "present", MISSING))
            } else {
                Err(Error::assertion(
                    method,
                    endpoint,
                    &what,
                    "absent",
                    display(actual),
                ))
            }
        }
    }
}
