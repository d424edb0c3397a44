use crate::data::ResponseData;
use serde::Serialize;
use serde_json::Value;

/// How the runner reacts to a failed check.
///
/// `FailFast` aborts the scenario on any failed check. `FailSoft` aborts only
/// on checks marked critical and records the rest, which is what a load run
/// wants when most post-conditions are observed through external metrics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CheckPolicy {
    FailFast,
    FailSoft,
}

#[derive(Debug, Clone)]
pub enum Predicate {
    StatusEquals(u16),
    BodyContains(String),
    /// The response body parsed as JSON must be a superset of the given value.
    JsonSubset(Value),
    /// The named response header must be present and contain the substring.
    HeaderContains(String, String),
}

#[derive(Debug, Clone)]
pub struct Check {
    label: String,
    predicate: Predicate,
    critical: bool,
}

impl Check {
    pub fn new<S: Into<String>>(label: S, predicate: Predicate) -> Self {
        Self {
            label: label.into(),
            predicate,
            critical: false,
        }
    }

    /// A check that aborts the scenario even under `CheckPolicy::FailSoft`.
    pub fn critical<S: Into<String>>(label: S, predicate: Predicate) -> Self {
        Self {
            label: label.into(),
            predicate,
            critical: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn evaluate(&self, response: &ResponseData) -> CheckResult {
        let detail = match &self.predicate {
            Predicate::StatusEquals(expected) => {
                if response.status_code == *expected {
                    None
                } else {
                    Some(format!(
                        "expected status {}, got {}",
                        expected, response.status_code
                    ))
                }
            }
            Predicate::BodyContains(needle) => {
                if response.body.contains(needle.as_str()) {
                    None
                } else {
                    Some(format!("body does not contain '{}'", needle))
                }
            }
            Predicate::JsonSubset(expected) => match response.parse_body() {
                Ok(actual) => json_subset(expected, &actual).err(),
                Err(_) => Some(String::from("response body is not valid json")),
            },
            Predicate::HeaderContains(name, needle) => match response.header(name) {
                Some(value) if value.contains(needle.as_str()) => None,
                Some(value) => Some(format!(
                    "header '{}' is '{}', expected it to contain '{}'",
                    name, value, needle
                )),
                None => Some(format!("header '{}' is missing", name)),
            },
        };

        CheckResult {
            label: self.label.clone(),
            passed: detail.is_none(),
            detail,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub label: String,
    pub passed: bool,
    pub detail: Option<String>,
}

/// Verifies that `actual` is a superset of `expected`: every key and value in
/// `expected` must appear in `actual`, recursively. On mismatch the returned
/// message names the offending path.
pub fn json_subset(expected: &Value, actual: &Value) -> Result<(), String> {
    json_subset_at(expected, actual, "$")
}

fn json_subset_at(expected: &Value, actual: &Value, path: &str) -> Result<(), String> {
    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (key, expected_value) in expected_map {
                let child_path = format!("{}.{}", path, key);
                match actual_map.get(key) {
                    Some(actual_value) => {
                        json_subset_at(expected_value, actual_value, &child_path)?
                    }
                    None => return Err(format!("{}: missing key", child_path)),
                }
            }
            Ok(())
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if expected_items.len() != actual_items.len() {
                return Err(format!(
                    "{}: expected {} elements, got {}",
                    path,
                    expected_items.len(),
                    actual_items.len()
                ));
            }
            for (index, (expected_item, actual_item)) in
                expected_items.iter().zip(actual_items).enumerate()
            {
                json_subset_at(expected_item, actual_item, &format!("{}[{}]", path, index))?;
            }
            Ok(())
        }
        _ => {
            if expected == actual {
                Ok(())
            } else {
                Err(format!("{}: expected {}, got {}", path, expected, actual))
            }
        }
    }
}
