//! Policy document definitions.
//!
//! A policy document is an ordered list of statements. Each statement pairs
//! an effect with a resource, a set of actions and an optional condition.
//! Field names follow the JSON wire format (`Version`, `PolicyID`,
//! `Statement`, `Effect`, `Resource`, `Action`, `Condition`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;

// ============================================================================
// Effect
// ============================================================================

/// The effect of a statement: allow or deny access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grant access.
    Allow,
    /// Deny access.
    Deny,
}

impl Effect {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = EvaluationError;

    /// Parses the exact literals `Allow` and `Deny`. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Allow" => Ok(Self::Allow),
            "Deny" => Ok(Self::Deny),
            other => Err(EvaluationError::InvalidEffect {
                effect: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Comparator
// ============================================================================

/// Names a registered custom predicate and where its second operand comes from.
///
/// Exactly one of `string_arg`, `prop_arg` and `user_arg` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationFunc {
    /// Registry name of the predicate.
    #[serde(default)]
    pub function: String,
    /// Literal second operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_arg: Option<String>,
    /// Second operand read from the request's string attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop_arg: Option<String>,
    /// Second operand resolved from the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_arg: Option<String>,
}

impl ValidationFunc {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }

    pub fn with_string_arg(mut self, value: impl Into<String>) -> Self {
        self.string_arg = Some(value.into());
        self
    }

    pub fn with_prop_arg(mut self, key: impl Into<String>) -> Self {
        self.prop_arg = Some(key.into());
        self
    }

    pub fn with_user_arg(mut self, key: impl Into<String>) -> Self {
        self.user_arg = Some(key.into());
        self
    }
}

/// A bundle of sub-predicates tested against one named attribute.
///
/// Every present sub-predicate must hold for the comparator to match. A
/// comparator with no sub-predicates matches vacuously.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Comparator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_in: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_equal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_in: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer_equal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float_in: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float_equal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_equal: Option<bool>,
    /// Subject attribute key whose value must equal the resource's string attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prop_equal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_func: Option<ValidationFunc>,
}

impl Comparator {
    /// Creates a comparator with no sub-predicates.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string_in<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.string_in = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_string_equal(mut self, value: impl Into<String>) -> Self {
        self.string_equal = Some(value.into());
        self
    }

    pub fn with_integer_in(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.integer_in = Some(values.into_iter().collect());
        self
    }

    pub fn with_integer_equal(mut self, value: i64) -> Self {
        self.integer_equal = Some(value);
        self
    }

    pub fn with_float_in(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.float_in = Some(values.into_iter().collect());
        self
    }

    pub fn with_float_equal(mut self, value: f64) -> Self {
        self.float_equal = Some(value);
        self
    }

    pub fn with_boolean_equal(mut self, value: bool) -> Self {
        self.boolean_equal = Some(value);
        self
    }

    pub fn with_user_prop_equal(mut self, key: impl Into<String>) -> Self {
        self.user_prop_equal = Some(key.into());
        self
    }

    pub fn with_validation_func(mut self, func: ValidationFunc) -> Self {
        self.validation_func = Some(func);
        self
    }

    /// Returns `true` if no sub-predicate is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Condition
// ============================================================================

/// Attribute key -> comparator mapping used by one quantifier group.
pub type ComparatorMap = BTreeMap<String, Comparator>;

/// Two independent quantifier groups. Both must pass for the condition to match.
///
/// An absent or empty group passes vacuously.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// At least one comparator in the group must match.
    #[serde(
        rename = "AtLeastOne",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub at_least_one: Option<ComparatorMap>,
    /// Every comparator in the group must match.
    #[serde(
        rename = "MustHaveAll",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub must_have_all: Option<ComparatorMap>,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a comparator to the `AtLeastOne` group (builder pattern).
    pub fn with_at_least_one(mut self, key: impl Into<String>, comparator: Comparator) -> Self {
        self.at_least_one
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), comparator);
        self
    }

    /// Adds a comparator to the `MustHaveAll` group (builder pattern).
    pub fn with_must_have_all(mut self, key: impl Into<String>, comparator: Comparator) -> Self {
        self.must_have_all
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), comparator);
        self
    }
}

// ============================================================================
// Statement
// ============================================================================

/// One rule inside a policy document.
///
/// The effect is kept as the raw string from the document. It is checked
/// when the statement set is evaluated, not when it is parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Effect", default)]
    pub effect: String,
    /// Exact-match resource identifier.
    #[serde(rename = "Resource", default)]
    pub resource: String,
    /// Actions this statement covers.
    #[serde(rename = "Action", alias = "Actions", default)]
    pub actions: Vec<String>,
    #[serde(
        rename = "Condition",
        alias = "Conditions",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<Condition>,
}

impl Statement {
    /// Creates a statement from a raw effect string.
    pub fn new<I, S>(effect: impl Into<String>, resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: effect.into(),
            resource: resource.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    /// Creates an `Allow` statement.
    pub fn allow<I, S>(resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Effect::Allow.as_str(), resource, actions)
    }

    /// Creates a `Deny` statement.
    pub fn deny<I, S>(resource: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Effect::Deny.as_str(), resource, actions)
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Parses the effect string.
    pub fn effect(&self) -> Result<Effect, EvaluationError> {
        self.effect.parse()
    }

    /// Returns `true` if this statement covers the resource/action pair.
    ///
    /// Resource matching is exact string equality; action matching is set
    /// membership. No wildcards.
    pub fn applies_to(&self, resource: &str, action: &str) -> bool {
        self.resource == resource && self.actions.iter().any(|a| a == action)
    }
}

// ============================================================================
// PolicyDocument
// ============================================================================

/// A versioned, named list of statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default)]
    pub version: i64,
    /// Informational identifier, surfaced in decisions and logs.
    #[serde(rename = "PolicyID", default)]
    pub policy_id: String,
    #[serde(rename = "Statement", alias = "Statements", default)]
    pub statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            policy_id: policy_id.into(),
            statements: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Appends a statement (builder pattern).
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
