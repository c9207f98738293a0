//! Kani proofs for policy decision logic
//!
//! These proofs verify the combination rules of the decision point using
//! bounded model checking.
//!
//! **Proof Count**: 4 proofs
//!
//! Run with: `cargo kani --tests --harness verify_*`

#[cfg(kani)]
use crate::attributes::ResourceRequest;
#[cfg(kani)]
use crate::condition::Quantifier;
#[cfg(kani)]
use crate::evaluator::{self, EvaluationContext, ResultEffect};
#[cfg(kani)]
use crate::policy::{Effect, PolicyDocument, Statement};

/// Proof: Quantifier semantics
///
/// **Property**: An empty group holds; otherwise `AtLeastOne` needs one match
/// and `MustHaveAll` needs every match.
#[cfg(kani)]
#[kani::proof]
fn verify_quantifier_semantics() {
    let total: usize = kani::any();
    let matched: usize = kani::any();
    kani::assume(total <= 64);
    kani::assume(matched <= total);

    let at_least_one = Quantifier::AtLeastOne.holds(matched, total);
    let must_have_all = Quantifier::MustHaveAll.holds(matched, total);

    if total == 0 {
        assert!(at_least_one && must_have_all);
    } else {
        assert_eq!(at_least_one, matched > 0);
        assert_eq!(must_have_all, matched == total);
    }

    // MustHaveAll implies AtLeastOne
    if must_have_all {
        assert!(at_least_one);
    }
}

/// Proof: Effect parsing accepts exactly two literals
///
/// **Property**: Case and padding variants of the literals are rejected.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_effect_parsing_is_exact() {
    let bytes: [u8; 4] = kani::any();
    let Ok(text) = std::str::from_utf8(&bytes) else {
        return;
    };
    // "Deny" is the only four-byte literal.
    if text != "Deny" {
        assert!(text.parse::<Effect>().is_err());
    }
}

/// Proof: Explicit deny wins
///
/// **Property**: With an unconditional Deny for the request, the result is
/// DENIED regardless of how many Allow statements also apply.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_explicit_deny_wins() {
    let allows: usize = kani::any();
    kani::assume(allows <= 3);

    let mut policy = PolicyDocument::new("p");
    for _ in 0..allows {
        policy = policy.with_statement(Statement::allow("r", ["a"]));
    }
    policy = policy.with_statement(Statement::deny("r", ["a"]));

    let ctx = EvaluationContext::new().with_policy(policy).without_audit();
    let result = evaluator::evaluate(&ctx, &ResourceRequest::new("r", "a"));

    assert_eq!(result.ok(), Some(ResultEffect::Denied));
}

/// Proof: Default deny
///
/// **Property**: A request no statement applies to is DENIED without error.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(6)]
fn verify_default_deny() {
    let deny: bool = kani::any();
    let statement = if deny {
        Statement::deny("r", ["a"])
    } else {
        Statement::allow("r", ["a"])
    };
    let ctx = EvaluationContext::new()
        .with_policy(PolicyDocument::new("p").with_statement(statement))
        .without_audit();

    let result = evaluator::evaluate(&ctx, &ResourceRequest::new("r", "other"));

    assert_eq!(result.ok(), Some(ResultEffect::Denied));
}
