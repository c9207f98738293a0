//! Subject attribute resolution.
//!
//! The subject is the authenticated party making the request. Comparators
//! reach its attributes through a [`SubjectAttributeResolver`] using
//! namespaced keys such as `user:::employee:company:title`.
//!
//! Resolution never fails: an unknown key resolves to an empty string. A
//! misconfigured key therefore shows up as a comparator that does not match,
//! not as an evaluation error.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

/// Default namespace prefix stripped from subject keys.
pub const DEFAULT_KEY_PREFIX: &str = "user:::";

/// Default path separator for nested subject keys.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Resolves a subject attribute key to its string value.
pub trait SubjectAttributeResolver: Send + Sync {
    /// Returns the attribute value, or an empty string if it cannot be resolved.
    fn resolve(&self, key: &str) -> String;
}

// ============================================================================
// Empty Subject
// ============================================================================

/// A subject with no attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySubject;

impl SubjectAttributeResolver for EmptySubject {
    fn resolve(&self, _key: &str) -> String {
        String::new()
    }
}

// ============================================================================
// Static Subject
// ============================================================================

/// A subject backed by an already-flattened key/value map.
///
/// Keys are matched verbatim.
#[derive(Debug, Clone, Default)]
pub struct StaticSubject {
    attributes: HashMap<String, String>,
}

impl StaticSubject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticSubject
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SubjectAttributeResolver for StaticSubject {
    fn resolve(&self, key: &str) -> String {
        self.attributes.get(key).cloned().unwrap_or_default()
    }
}

// ============================================================================
// JSON Subject
// ============================================================================

/// Resolves keys by walking a JSON object describing the subject.
///
/// `user:::employee:company:title` strips the prefix, splits on the separator
/// and looks up `employee` -> `company` -> `title`.
#[derive(Debug, Clone)]
pub struct JsonSubject {
    data: Map<String, Value>,
    key_prefix: String,
    separator: String,
}

impl Default for JsonSubject {
    fn default() -> Self {
        Self {
            data: Map::new(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl JsonSubject {
    /// Parses the subject from JSON text.
    ///
    /// Malformed input, or a root that is not an object, logs a warning and
    /// yields a subject with no attributes.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                warn!(error = %e, "Failed to parse subject data; using empty subject");
                Self::default()
            }
        }
    }

    /// Builds the subject from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self {
                data,
                ..Self::default()
            },
            other => {
                warn!(kind = json_kind(&other), "Subject data is not a JSON object; using empty subject");
                Self::default()
            }
        }
    }

    /// Overrides the namespace prefix stripped from keys.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Overrides the path separator. An empty separator is ignored.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let key = key.trim();
        let stripped;
        let path = if self.key_prefix.is_empty() {
            key
        } else {
            stripped = key.replace(&self.key_prefix, "");
            stripped.as_str()
        };

        let mut parts = path.split(self.separator.as_str());
        let first = parts.next()?;
        let mut current = self.data.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl SubjectAttributeResolver for JsonSubject {
    fn resolve(&self, key: &str) -> String {
        self.lookup(key).map(render_leaf).unwrap_or_default()
    }
}

fn render_leaf(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const EMPLOYEE: &str = r#"
        {
            "employee": {
                "company": {
                    "title": "Hello inc.",
                    "established": 1983,
                    "geolocation": {
                        "latitude": 37.7749,
                        "longitude": -122.4194
                    },
                    "active": true,
                    "parent": null,
                    "tags": ["a", "b"]
                }
            }
        }"#;

    #[test_case("user:::employee:company:title", "Hello inc."; "nested key with prefix")]
    #[test_case("  user:::employee:company:title  ", "Hello inc."; "surrounding whitespace is trimmed")]
    #[test_case("user:::employee:company:address", ""; "missing key")]
    #[test_case("", ""; "empty key")]
    #[test_case("employee:company:established", "1983"; "integer rendered without prefix")]
    #[test_case("employee:company:geolocation:latitude", "37.7749"; "float")]
    #[test_case("employee:company:active", "true"; "boolean")]
    #[test_case("employee:company:parent", ""; "null renders empty")]
    #[test_case("employee:company:tags", r#"["a","b"]"#; "array renders as json")]
    #[test_case("employee:company:title:extra", ""; "walking through a leaf")]
    fn test_json_subject_resolve(key: &str, expected: &str) {
        let subject = JsonSubject::from_json(EMPLOYEE);
        assert_eq!(subject.resolve(key), expected);
    }

    #[test]
    fn test_malformed_subject_resolves_empty() {
        for text in ["", "{", "[1, 2]", "\"just a string\""] {
            let subject = JsonSubject::from_json(text);
            assert_eq!(subject.resolve("user:::employee:company:title"), "");
        }
    }

    #[test]
    fn test_custom_prefix_and_separator() {
        let subject = JsonSubject::from_json(r#"{"org": {"unit": "finance"}}"#)
            .with_key_prefix("subject/")
            .with_separator(".");

        assert_eq!(subject.resolve("subject/org.unit"), "finance");
        assert_eq!(subject.resolve("org.unit"), "finance");
        assert_eq!(subject.resolve("user:::org:unit"), "");
    }

    #[test]
    fn test_empty_separator_is_ignored() {
        let subject = JsonSubject::from_json(r#"{"a": {"b": "c"}}"#).with_separator("");
        assert_eq!(subject.resolve("a:b"), "c");
    }

    #[test]
    fn test_static_subject() {
        let subject: StaticSubject = [("user:::id", "42")].into_iter().collect();
        assert_eq!(subject.resolve("user:::id"), "42");
        assert_eq!(subject.resolve("id"), "");

        let subject = StaticSubject::new().with("role", "admin");
        assert_eq!(subject.resolve("role"), "admin");
    }

    #[test]
    fn test_empty_subject() {
        assert_eq!(EmptySubject.resolve("anything"), "");
    }
}
