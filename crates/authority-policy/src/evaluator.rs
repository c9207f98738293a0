//! Policy decision resolution.
//!
//! Statements from every policy in the context are merged in declaration
//! order, checked for valid effects, filtered by resource, action and
//! condition, and then resolved: no surviving statement denies by default,
//! any surviving `Deny` wins, otherwise access is allowed.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::attributes::ResourceRequest;
use crate::condition::Matcher;
use crate::error::{BoxError, EvaluationError, Result};
use crate::policy::{Effect, PolicyDocument, Statement};
use crate::predicate::PredicateRegistry;
use crate::subject::{EmptySubject, SubjectAttributeResolver};

// ============================================================================
// Result Effect
// ============================================================================

/// The outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultEffect {
    Allowed,
    Denied,
}

impl ResultEffect {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "ALLOWED",
            Self::Denied => "DENIED",
        }
    }

    /// Collapses an evaluation outcome, mapping every error to `Denied`.
    pub fn or_denied(outcome: &Result<Self>) -> Self {
        match outcome {
            Ok(effect) => *effect,
            Err(_) => Self::Denied,
        }
    }
}

impl fmt::Display for ResultEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Validation Override
// ============================================================================

/// Replaces the rule engine entirely.
///
/// When an override is configured, its result is the decision. No merging,
/// filtering or effect validation takes place.
pub trait ValidationOverride: Send + Sync {
    fn override_validation(
        &self,
        policies: &[PolicyDocument],
        subject: &dyn SubjectAttributeResolver,
        request: &ResourceRequest,
    ) -> std::result::Result<ResultEffect, BoxError>;
}

// ============================================================================
// Evaluation Context
// ============================================================================

/// Everything a decision depends on apart from the request itself.
///
/// Build it once, then share it across concurrent evaluations. Evaluation
/// only reads from the context.
#[derive(Clone)]
pub struct EvaluationContext {
    policies: Vec<PolicyDocument>,
    subject: Arc<dyn SubjectAttributeResolver>,
    predicates: PredicateRegistry,
    validation_override: Option<Arc<dyn ValidationOverride>>,
    error: Option<EvaluationError>,
    audit_enabled: bool,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            policies: Vec::new(),
            subject: Arc::new(EmptySubject),
            predicates: PredicateRegistry::new(),
            validation_override: None,
            error: None,
            audit_enabled: true,
        }
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("policies", &self.policies.len())
            .field("predicates", &self.predicates)
            .field("override", &self.validation_override.is_some())
            .field("error", &self.error)
            .field("audit_enabled", &self.audit_enabled)
            .finish_non_exhaustive()
    }
}

impl EvaluationContext {
    /// Creates an empty context: no policies, an empty subject, audit on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends policies in declaration order.
    pub fn with_policies(mut self, policies: impl IntoIterator<Item = PolicyDocument>) -> Self {
        self.policies.extend(policies);
        self
    }

    pub fn with_policy(mut self, policy: PolicyDocument) -> Self {
        self.policies.push(policy);
        self
    }

    /// Sets the subject attribute resolver.
    pub fn with_subject(mut self, subject: impl SubjectAttributeResolver + 'static) -> Self {
        self.subject = Arc::new(subject);
        self
    }

    /// Sets a resolver that is shared with other contexts.
    pub fn with_shared_subject(mut self, subject: Arc<dyn SubjectAttributeResolver>) -> Self {
        self.subject = subject;
        self
    }

    /// Replaces the predicate registry.
    pub fn with_predicates(mut self, predicates: PredicateRegistry) -> Self {
        self.predicates = predicates;
        self
    }

    /// Registers a single predicate.
    pub fn with_predicate<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str, &str) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.predicates.register(name, function);
        self
    }

    /// Hands every decision to `validation_override`.
    pub fn with_override(mut self, validation_override: impl ValidationOverride + 'static) -> Self {
        self.validation_override = Some(Arc::new(validation_override));
        self
    }

    /// Poisons the context: every evaluation returns this error.
    ///
    /// Hosts use this to carry a setup failure (for example a policy file
    /// that did not load) through to the point of decision.
    pub fn with_error(mut self, error: impl Into<BoxError>) -> Self {
        self.error = Some(EvaluationError::misconfigured(error));
        self
    }

    /// Disables decision audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn policies(&self) -> &[PolicyDocument] {
        &self.policies
    }

    pub fn subject(&self) -> &dyn SubjectAttributeResolver {
        self.subject.as_ref()
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn has_override(&self) -> bool {
        self.validation_override.is_some()
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Identifies a statement that survived filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRef {
    pub policy_id: String,
    /// Position of the statement within its policy document.
    pub index: usize,
    pub effect: Effect,
}

/// The result of evaluating a request, with the statements behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub effect: ResultEffect,
    /// Statements that applied to the request, in merge order. Empty when
    /// the override decided.
    pub matched: Vec<StatementRef>,
    /// Human-readable explanation of why this decision was made.
    pub reason: String,
}

impl Decision {
    fn from_matched(matched: Vec<StatementRef>) -> Self {
        if matched.is_empty() {
            return Self {
                effect: ResultEffect::Denied,
                matched,
                reason: "No statement applies; denying by default".to_string(),
            };
        }

        if let Some(deny) = matched.iter().find(|s| s.effect == Effect::Deny) {
            let reason = format!(
                "Explicit deny in policy '{}' statement {}",
                deny.policy_id, deny.index
            );
            return Self {
                effect: ResultEffect::Denied,
                matched,
                reason,
            };
        }

        let reason = format!("Allowed by {} statement(s)", matched.len());
        Self {
            effect: ResultEffect::Allowed,
            matched,
            reason,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Evaluates `request` against the context.
///
/// `Err` always means the request is denied.
pub fn evaluate(context: &EvaluationContext, request: &ResourceRequest) -> Result<ResultEffect> {
    decide(context, request).map(|decision| decision.effect)
}

/// Evaluates `request` and reports which statements produced the decision.
pub fn decide(context: &EvaluationContext, request: &ResourceRequest) -> Result<Decision> {
    let outcome = resolve(context, request);
    if context.audit_enabled {
        audit(request, &outcome);
    }
    outcome
}

fn resolve(context: &EvaluationContext, request: &ResourceRequest) -> Result<Decision> {
    if let Some(error) = &context.error {
        return Err(error.clone());
    }

    if let Some(validation_override) = &context.validation_override {
        let effect = validation_override
            .override_validation(&context.policies, context.subject(), request)
            .map_err(EvaluationError::from_override)?;
        return Ok(Decision {
            effect,
            matched: Vec::new(),
            reason: "Decided by validation override".to_string(),
        });
    }

    let merged = merge(&context.policies);
    let effects = validate_effects(&merged)?;

    let matcher = Matcher::new(request, context.subject(), &context.predicates);
    let mut matched = Vec::new();
    for (entry, effect) in merged.iter().zip(effects) {
        if !entry.statement.applies_to(&request.resource, &request.action) {
            continue;
        }
        if let Some(condition) = &entry.statement.condition
            && !matcher.matches_condition(condition)?
        {
            debug!(
                policy_id = %entry.policy_id,
                index = entry.index,
                "Statement condition did not match"
            );
            continue;
        }
        debug!(
            policy_id = %entry.policy_id,
            index = entry.index,
            %effect,
            "Statement applies"
        );
        matched.push(StatementRef {
            policy_id: entry.policy_id.to_string(),
            index: entry.index,
            effect,
        });
    }

    Ok(Decision::from_matched(matched))
}

// ============================================================================
// Helpers
// ============================================================================

/// A statement together with where it came from.
struct MergedStatement<'a> {
    policy_id: &'a str,
    index: usize,
    statement: &'a Statement,
}

/// Flattens all policies into one statement sequence in declaration order.
fn merge(policies: &[PolicyDocument]) -> Vec<MergedStatement<'_>> {
    policies
        .iter()
        .flat_map(|policy| {
            policy
                .statements
                .iter()
                .enumerate()
                .map(move |(index, statement)| MergedStatement {
                    policy_id: &policy.policy_id,
                    index,
                    statement,
                })
        })
        .collect()
}

/// Parses every effect up front. One bad effect fails the whole set.
fn validate_effects(merged: &[MergedStatement<'_>]) -> Result<Vec<Effect>> {
    merged
        .iter()
        .map(|entry| entry.statement.effect())
        .collect()
}

fn audit(request: &ResourceRequest, outcome: &Result<Decision>) {
    match outcome {
        Ok(decision) if decision.effect.is_allowed() => info!(
            resource = %request.resource,
            action = %request.action,
            matched = decision.matched.len(),
            "Access granted"
        ),
        Ok(decision) => warn!(
            resource = %request.resource,
            action = %request.action,
            reason = %decision.reason,
            "Access denied"
        ),
        Err(error) => warn!(
            resource = %request.resource,
            action = %request.action,
            %error,
            "Access denied: evaluation failed"
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
