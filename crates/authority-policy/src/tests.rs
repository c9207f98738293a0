//! Cross-module tests for authority-policy

use proptest::prelude::*;
use test_case::test_case;

use crate::{
    Comparator, Condition, EvaluationContext, EvaluationError, JsonSubject, PolicyDocument,
    ResourceRequest, ResultEffect, Statement, ValidationFunc, decide, evaluate, parse_policies,
};

const RESOURCE: &str = "res:::leave";
const ACTION: &str = "act:::leave:approve";

fn context(policies: Vec<PolicyDocument>) -> EvaluationContext {
    EvaluationContext::new().with_policies(policies).without_audit()
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

const LEAVE_POLICIES: &str = r#"[
    {
        "Version": 1,
        "PolicyID": "leave-approval",
        "Statement": [
            {
                "Effect": "Allow",
                "Resource": "res:::leave",
                "Action": ["act:::leave:approve", "act:::leave:view"],
                "Condition": {
                    "MustHaveAll": {
                        "prop:::leave:department": { "UserPropEqual": "user:::employee:department" },
                        "prop:::leave:days": { "IntegerIn": [1, 2, 3, 4, 5] }
                    }
                }
            },
            {
                "Effect": "Deny",
                "Resource": "res:::leave",
                "Action": ["act:::leave:approve"],
                "Condition": {
                    "AtLeastOne": {
                        "prop:::leave:owner": { "UserPropEqual": "user:::employee:id" },
                        "prop:::leave:locked": { "BooleanEqual": true }
                    }
                }
            }
        ]
    },
    {
        "Version": 1,
        "PolicyID": "leave-view",
        "Statement": [
            { "Effect": "Allow", "Resource": "res:::leave", "Action": ["act:::leave:view"] }
        ]
    }
]"#;

const MANAGER: &str = r#"{
    "employee": { "id": "e-100", "department": "finance", "title": "Manager" }
}"#;

fn leave_request(action: &str, owner: &str, days: i64, locked: bool) -> ResourceRequest {
    ResourceRequest::builder()
        .resource(RESOURCE)
        .action(action)
        .string("prop:::leave:department", "finance")
        .string("prop:::leave:owner", owner)
        .integer("prop:::leave:days", days)
        .boolean("prop:::leave:locked", locked)
        .build()
}

fn leave_context() -> EvaluationContext {
    let policies = parse_policies(LEAVE_POLICIES.as_bytes()).expect("parse leave policies");
    context(policies).with_subject(JsonSubject::from_json(MANAGER))
}

#[test_case(ACTION, "e-200", 3, false, ResultEffect::Allowed; "manager approves a colleague")]
#[test_case(ACTION, "e-100", 3, false, ResultEffect::Denied; "manager cannot approve own leave")]
#[test_case(ACTION, "e-200", 3, true, ResultEffect::Denied; "locked leave cannot be approved")]
#[test_case(ACTION, "e-200", 9, false, ResultEffect::Denied; "too many days")]
#[test_case("act:::leave:view", "e-100", 9, true, ResultEffect::Allowed; "view allowed by second policy")]
#[test_case("act:::leave:delete", "e-200", 3, false, ResultEffect::Denied; "unknown action")]
fn leave_scenarios(action: &str, owner: &str, days: i64, locked: bool, expected: ResultEffect) {
    let ctx = leave_context();
    let result = evaluate(&ctx, &leave_request(action, owner, days, locked));
    assert_eq!(result.unwrap(), expected);
}

#[test]
fn leave_request_missing_days_is_an_error() {
    let ctx = leave_context();
    let request = ResourceRequest::builder()
        .resource(RESOURCE)
        .action(ACTION)
        .string("prop:::leave:department", "finance")
        .string("prop:::leave:owner", "e-200")
        .boolean("prop:::leave:locked", false)
        .build();

    let err = evaluate(&ctx, &request).unwrap_err();
    assert!(err.to_string().contains("prop:::leave:days"), "{err}");
}

#[test]
fn decision_explains_surviving_statements() {
    let ctx = leave_context();
    let decision = decide(&ctx, &leave_request("act:::leave:view", "e-200", 3, false)).unwrap();

    let sources: Vec<(&str, usize)> = decision
        .matched
        .iter()
        .map(|s| (s.policy_id.as_str(), s.index))
        .collect();
    assert_eq!(sources, [("leave-approval", 0), ("leave-view", 0)]);
    assert_eq!(decision.effect, ResultEffect::Allowed);
}

#[test]
fn custom_predicate_with_prop_operand() {
    let policy = PolicyDocument::new("expense").with_statement(
        Statement::allow("res:::expense", ["act:::expense:submit"]).with_condition(
            Condition::new().with_must_have_all(
                "prop:::expense:currency",
                Comparator::new().with_validation_func(
                    ValidationFunc::new("matches_region_currency")
                        .with_prop_arg("prop:::expense:region_currency"),
                ),
            ),
        ),
    );
    let ctx = context(vec![policy]).with_predicate("matches_region_currency", |a, b| Ok(a == b));

    let request = |currency: &str| {
        ResourceRequest::builder()
            .resource("res:::expense")
            .action("act:::expense:submit")
            .string("prop:::expense:currency", currency)
            .string("prop:::expense:region_currency", "EUR")
            .build()
    };
    assert_eq!(evaluate(&ctx, &request("EUR")).unwrap(), ResultEffect::Allowed);
    assert_eq!(evaluate(&ctx, &request("USD")).unwrap(), ResultEffect::Denied);
}

#[test_case("Allow", true; "allow")]
#[test_case("Deny", true; "deny")]
#[test_case("allow", false; "lowercase allow")]
#[test_case("DENY", false; "uppercase deny")]
#[test_case("", false; "empty")]
#[test_case("Allow ", false; "trailing space")]
fn effect_validation(effect: &str, valid: bool) {
    let policy = PolicyDocument::new("p").with_statement(Statement::new(effect, "elsewhere", ["x"]));
    let result = evaluate(&context(vec![policy]), &ResourceRequest::new(RESOURCE, ACTION));

    if valid {
        assert_eq!(result.unwrap(), ResultEffect::Denied);
    } else {
        assert!(matches!(result, Err(EvaluationError::InvalidEffect { .. })));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn resource_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["res:::a", "res:::b", "res:::c"]).prop_map(String::from)
}

fn action_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["act:::read", "act:::write", "act:::delete"]).prop_map(String::from)
}

fn statement_strategy() -> impl Strategy<Value = Statement> {
    (
        any::<bool>(),
        resource_strategy(),
        prop::collection::vec(action_strategy(), 1..3),
    )
        .prop_map(|(deny, resource, actions)| {
            if deny {
                Statement::deny(resource, actions)
            } else {
                Statement::allow(resource, actions)
            }
        })
}

fn policies_strategy() -> impl Strategy<Value = Vec<PolicyDocument>> {
    prop::collection::vec(prop::collection::vec(statement_strategy(), 0..5), 0..4).prop_map(
        |policies| {
            policies
                .into_iter()
                .enumerate()
                .map(|(i, statements)| PolicyDocument {
                    version: 1,
                    policy_id: format!("policy-{i}"),
                    statements,
                })
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The decision equals the explicit-deny-wins resolution of applicable statements.
    #[test]
    fn prop_decision_matches_reference(
        policies in policies_strategy(),
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let applicable: Vec<&Statement> = policies
            .iter()
            .flat_map(|p| &p.statements)
            .filter(|s| s.resource == resource && s.actions.contains(&action))
            .collect();
        let expected = if applicable.is_empty() || applicable.iter().any(|s| s.effect == "Deny") {
            ResultEffect::Denied
        } else {
            ResultEffect::Allowed
        };

        let ctx = context(policies);
        let result = evaluate(&ctx, &ResourceRequest::new(resource, action));
        prop_assert_eq!(result.unwrap(), expected);
    }

    /// A request nothing covers is denied without error.
    #[test]
    fn prop_default_deny(policies in policies_strategy(), action in action_strategy()) {
        let ctx = context(policies);
        let result = evaluate(&ctx, &ResourceRequest::new("res:::uncovered", action));
        prop_assert_eq!(result.unwrap(), ResultEffect::Denied);
    }

    /// One applicable Deny outweighs any number of Allows, in any position.
    #[test]
    fn prop_explicit_deny_wins(allows in 0usize..8, deny_at in 0usize..8) {
        let mut statements = vec![Statement::allow(RESOURCE, [ACTION]); allows];
        statements.insert(deny_at.min(allows), Statement::deny(RESOURCE, [ACTION]));
        let policy = PolicyDocument { version: 1, policy_id: "p".into(), statements };

        let result = evaluate(&context(vec![policy]), &ResourceRequest::new(RESOURCE, ACTION));
        prop_assert_eq!(result.unwrap(), ResultEffect::Denied);
    }

    /// Any non-empty set of applicable Allows is allowed.
    #[test]
    fn prop_all_allow(allows in 1usize..8, policies in 1usize..4) {
        let docs = (0..policies)
            .map(|i| PolicyDocument {
                version: 1,
                policy_id: format!("p{i}"),
                statements: vec![Statement::allow(RESOURCE, [ACTION]); allows],
            })
            .collect();

        let result = evaluate(&context(docs), &ResourceRequest::new(RESOURCE, ACTION));
        prop_assert_eq!(result.unwrap(), ResultEffect::Allowed);
    }

    /// Repeated evaluation with the same context and request agrees.
    #[test]
    fn prop_idempotent(
        policies in policies_strategy(),
        resource in resource_strategy(),
        action in action_strategy(),
    ) {
        let ctx = context(policies);
        let request = ResourceRequest::new(resource, action);
        let first = decide(&ctx, &request).unwrap();
        let second = decide(&ctx, &request).unwrap();
        prop_assert_eq!(first, second);
    }

    /// An integer comparator matches exactly when the value is in the list.
    #[test]
    fn prop_integer_in(value in -20i64..20, list in prop::collection::vec(-20i64..20, 0..6)) {
        let policy = PolicyDocument::new("p").with_statement(
            Statement::allow(RESOURCE, [ACTION]).with_condition(
                Condition::new().with_must_have_all("n", Comparator::new().with_integer_in(list.clone())),
            ),
        );
        let request = ResourceRequest::builder()
            .resource(RESOURCE)
            .action(ACTION)
            .integer("n", value)
            .build();

        let expected = if list.contains(&value) { ResultEffect::Allowed } else { ResultEffect::Denied };
        prop_assert_eq!(evaluate(&context(vec![policy]), &request).unwrap(), expected);
    }
}
