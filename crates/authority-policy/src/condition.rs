//! Condition and comparator evaluation.
//!
//! A condition has two quantifier groups. Each group maps attribute keys to
//! comparators; the group counts how many comparators match and applies its
//! quantifier to `(matched, total)`. A missing attribute is an error for the
//! whole evaluation, never a silent non-match.

use tracing::debug;

use crate::attributes::{AttributeValue, Properties, ResourceRequest, ValueKind};
use crate::error::{EvaluationError, Result};
use crate::policy::{Comparator, ComparatorMap, Condition};
use crate::predicate::PredicateRegistry;
use crate::subject::SubjectAttributeResolver;

// ============================================================================
// Quantifier
// ============================================================================

/// How a group combines the results of its comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// At least one comparator must match.
    AtLeastOne,
    /// Every comparator must match.
    MustHaveAll,
}

impl Quantifier {
    /// Applies the quantifier. An empty group always holds.
    pub const fn holds(self, matched: usize, total: usize) -> bool {
        if total == 0 {
            return true;
        }
        match self {
            Self::AtLeastOne => matched > 0,
            Self::MustHaveAll => matched == total,
        }
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// Borrowed view of everything comparator evaluation needs.
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    pub request: &'a ResourceRequest,
    pub subject: &'a dyn SubjectAttributeResolver,
    pub predicates: &'a PredicateRegistry,
}

impl<'a> Matcher<'a> {
    pub fn new(
        request: &'a ResourceRequest,
        subject: &'a dyn SubjectAttributeResolver,
        predicates: &'a PredicateRegistry,
    ) -> Self {
        Self {
            request,
            subject,
            predicates,
        }
    }

    /// Returns `true` if both quantifier groups of `condition` hold.
    ///
    /// Both groups are evaluated in full so a missing attribute in either
    /// one is always reported.
    pub fn matches_condition(&self, condition: &Condition) -> Result<bool> {
        let at_least_one = self.group_holds(Quantifier::AtLeastOne, condition.at_least_one.as_ref())?;
        let must_have_all =
            self.group_holds(Quantifier::MustHaveAll, condition.must_have_all.as_ref())?;
        Ok(at_least_one && must_have_all)
    }

    /// Applies `quantifier` to a group. An absent group holds.
    pub fn group_holds(&self, quantifier: Quantifier, group: Option<&ComparatorMap>) -> Result<bool> {
        let Some(group) = group else {
            return Ok(true);
        };
        let (matched, total) = self.count_matched(group)?;
        let holds = quantifier.holds(matched, total);
        debug!(?quantifier, matched, total, holds, "Evaluated condition group");
        Ok(holds)
    }

    /// Counts matching comparators in a group, as `(matched, total)`.
    pub fn count_matched(&self, group: &ComparatorMap) -> Result<(usize, usize)> {
        let mut matched = 0;
        for (key, comparator) in group {
            if self.matches_comparator(key, comparator)? {
                matched += 1;
            }
        }
        Ok((matched, group.len()))
    }

    /// Tests every present sub-predicate of `comparator` against attribute `key`.
    ///
    /// All attributes the comparator needs are checked for presence first, so
    /// the outcome does not depend on which sub-predicate would fail first.
    pub fn matches_comparator(&self, key: &str, comparator: &Comparator) -> Result<bool> {
        let properties = &self.request.properties;
        for kind in required_kinds(comparator) {
            if !properties.contains(kind, key) {
                debug!(key, %kind, "Comparator attribute missing from request");
                return Err(EvaluationError::MissingAttribute {
                    key: key.to_string(),
                    kind,
                });
            }
        }

        let typed = typed_matches(
            properties,
            key,
            comparator.string_equal.as_ref(),
            comparator.string_in.as_deref(),
        )? && typed_matches(
            properties,
            key,
            comparator.integer_equal.as_ref(),
            comparator.integer_in.as_deref(),
        )? && typed_matches(
            properties,
            key,
            comparator.float_equal.as_ref(),
            comparator.float_in.as_deref(),
        )? && typed_matches::<bool>(properties, key, comparator.boolean_equal.as_ref(), None)?;

        Ok(typed && self.subject_matches(key, comparator) && self.predicate_matches(key, comparator))
    }

    fn subject_matches(&self, key: &str, comparator: &Comparator) -> bool {
        let Some(subject_key) = &comparator.user_prop_equal else {
            return true;
        };
        let expected = self.subject.resolve(subject_key);
        self.request.properties.string.get(key) == Some(&expected)
    }

    fn predicate_matches(&self, key: &str, comparator: &Comparator) -> bool {
        let Some(func) = &comparator.validation_func else {
            return true;
        };
        let first = self
            .request
            .properties
            .string
            .get(key)
            .map_or("", String::as_str);
        match self
            .predicates
            .call(func, first, &self.request.properties, self.subject)
        {
            Ok(matched) => matched,
            Err(e) => {
                debug!(key, error = %e, "Validation func did not match");
                false
            }
        }
    }
}

/// Equality and membership check for one value type.
///
/// Each present check must hold; absent checks impose no constraint.
fn typed_matches<T: AttributeValue>(
    properties: &Properties,
    key: &str,
    equal: Option<&T>,
    one_of: Option<&[T]>,
) -> Result<bool> {
    if equal.is_none() && one_of.is_none() {
        return Ok(true);
    }
    let value = properties
        .get::<T>(key)
        .ok_or_else(|| EvaluationError::MissingAttribute {
            key: key.to_string(),
            kind: T::KIND,
        })?;

    let equal_ok = equal.is_none_or(|expected| expected == value);
    let in_ok = one_of.is_none_or(|list| list.contains(value));
    Ok(equal_ok && in_ok)
}

/// Value types the comparator reads from the request bag.
fn required_kinds(comparator: &Comparator) -> Vec<ValueKind> {
    let mut kinds = Vec::with_capacity(4);
    if comparator.string_in.is_some()
        || comparator.string_equal.is_some()
        || comparator.user_prop_equal.is_some()
        || comparator.validation_func.is_some()
    {
        kinds.push(ValueKind::String);
    }
    if comparator.integer_in.is_some() || comparator.integer_equal.is_some() {
        kinds.push(ValueKind::Integer);
    }
    if comparator.float_in.is_some() || comparator.float_equal.is_some() {
        kinds.push(ValueKind::Float);
    }
    if comparator.boolean_equal.is_some() {
        kinds.push(ValueKind::Boolean);
    }
    kinds
}

// ============================================================================
// Tests
// ============================================================================
