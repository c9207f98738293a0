//! Request attributes for policy evaluation.
//!
//! A request names a resource and an action and carries a typed attribute
//! bag: four disjoint maps holding string, integer, float and boolean values.
//! The bag is built once per request and never mutated by the engine.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Value Kind
// ============================================================================

/// The value type an attribute lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A value type that can live in the attribute bag.
///
/// Comparators are generic over this trait so the equality and membership
/// checks are written once for all four value types.
pub trait AttributeValue: PartialEq + fmt::Debug {
    /// Which map of [`Properties`] holds values of this type.
    const KIND: ValueKind;

    /// Looks up `key` in the map for this type.
    fn lookup<'a>(properties: &'a Properties, key: &str) -> Option<&'a Self>;
}

impl AttributeValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn lookup<'a>(properties: &'a Properties, key: &str) -> Option<&'a Self> {
        properties.string.get(key)
    }
}

impl AttributeValue for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn lookup<'a>(properties: &'a Properties, key: &str) -> Option<&'a Self> {
        properties.integer.get(key)
    }
}

impl AttributeValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn lookup<'a>(properties: &'a Properties, key: &str) -> Option<&'a Self> {
        properties.float.get(key)
    }
}

impl AttributeValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn lookup<'a>(properties: &'a Properties, key: &str) -> Option<&'a Self> {
        properties.boolean.get(key)
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Typed attribute bag describing the resource being accessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    #[serde(rename = "String")]
    pub string: HashMap<String, String>,
    #[serde(rename = "Integer")]
    pub integer: HashMap<String, i64>,
    #[serde(rename = "Float")]
    pub float: HashMap<String, f64>,
    #[serde(rename = "Boolean")]
    pub boolean: HashMap<String, bool>,
}

impl Properties {
    /// Returns the value stored under `key` in the map for `T`.
    pub fn get<T: AttributeValue>(&self, key: &str) -> Option<&T> {
        T::lookup(self, key)
    }

    /// Returns `true` if `key` is present in the map for `kind`.
    pub fn contains(&self, kind: ValueKind, key: &str) -> bool {
        match kind {
            ValueKind::String => self.string.contains_key(key),
            ValueKind::Integer => self.integer.contains_key(key),
            ValueKind::Float => self.float.contains_key(key),
            ValueKind::Boolean => self.boolean.contains_key(key),
        }
    }

    /// Total number of attributes across all four maps.
    pub fn len(&self) -> usize {
        self.string.len() + self.integer.len() + self.float.len() + self.boolean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Resource Request
// ============================================================================

/// An access request: which action on which resource, with what attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Properties", default)]
    pub properties: Properties,
}

impl ResourceRequest {
    /// Creates a request with an empty attribute bag.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            properties: Properties::default(),
        }
    }

    /// Starts an incremental builder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }
}

/// Incremental builder for a [`ResourceRequest`].
///
/// One builder per in-flight request. Inserting the same key twice keeps the
/// last value.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    request: ResourceRequest,
}

impl RequestBuilder {
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.request.resource = resource.into();
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.request.action = action.into();
        self
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .properties
            .string
            .insert(key.into(), value.into());
        self
    }

    pub fn integer(mut self, key: impl Into<String>, value: i64) -> Self {
        self.request.properties.integer.insert(key.into(), value);
        self
    }

    pub fn float(mut self, key: impl Into<String>, value: f64) -> Self {
        self.request.properties.float.insert(key.into(), value);
        self
    }

    pub fn boolean(mut self, key: impl Into<String>, value: bool) -> Self {
        self.request.properties.boolean.insert(key.into(), value);
        self
    }

    /// Finalizes the request.
    pub fn build(self) -> ResourceRequest {
        self.request
    }
}

// ============================================================================
// Tests
// ============================================================================
