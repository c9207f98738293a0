#![no_main]

use arbitrary::Arbitrary;
use authority_policy::{
    Comparator, Condition, Effect, EvaluationContext, PolicyDocument, ResourceRequest,
    ResultEffect, StaticSubject, Statement, decide, evaluate,
};
use libfuzzer_sys::fuzz_target;

// Small vocabularies so generated statements and requests actually meet.
const RESOURCES: [&str; 3] = ["res:::leave", "res:::payroll", "res:::badge"];
const ACTIONS: [&str; 3] = ["act:::view", "act:::create", "act:::delete"];
const KEYS: [&str; 3] = ["prop:::owner", "prop:::days", "prop:::paid"];
const WORDS: [&str; 3] = ["e-100", "e-200", "hr"];

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzEffect {
    Allow,
    Deny,
    /// Exercises the invalid-effect error path.
    Misspelled,
}

impl FuzzEffect {
    fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
            Self::Misspelled => "allow",
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzComparator {
    StringEqual(u8),
    StringIn(Vec<u8>),
    IntegerEqual(i8),
    IntegerIn(Vec<i8>),
    BooleanEqual(bool),
    UserPropEqual,
}

impl FuzzComparator {
    fn to_comparator(&self) -> Comparator {
        match self {
            Self::StringEqual(w) => Comparator::new().with_string_equal(word(*w)),
            Self::StringIn(ws) => Comparator::new().with_string_in(ws.iter().map(|w| word(*w))),
            Self::IntegerEqual(n) => Comparator::new().with_integer_equal(i64::from(*n)),
            Self::IntegerIn(ns) => {
                Comparator::new().with_integer_in(ns.iter().map(|n| i64::from(*n)))
            }
            Self::BooleanEqual(b) => Comparator::new().with_boolean_equal(*b),
            Self::UserPropEqual => Comparator::new().with_user_prop_equal("user:::uid"),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzStatement {
    effect: FuzzEffect,
    resource: u8,
    actions: Vec<u8>,
    at_least_one: Vec<(u8, FuzzComparator)>,
    must_have_all: Vec<(u8, FuzzComparator)>,
}

impl FuzzStatement {
    fn to_statement(&self) -> Statement {
        let statement = Statement::new(
            self.effect.as_str(),
            pick(&RESOURCES, self.resource),
            self.actions.iter().map(|a| pick(&ACTIONS, *a)),
        );
        if self.at_least_one.is_empty() && self.must_have_all.is_empty() {
            return statement;
        }

        let mut condition = Condition::new();
        for (key, comparator) in &self.at_least_one {
            condition = condition.with_at_least_one(pick(&KEYS, *key), comparator.to_comparator());
        }
        for (key, comparator) in &self.must_have_all {
            condition = condition.with_must_have_all(pick(&KEYS, *key), comparator.to_comparator());
        }
        statement.with_condition(condition)
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzRequest {
    resource: u8,
    action: u8,
    owner: Option<u8>,
    days: Option<i8>,
    paid: Option<bool>,
    uid: Option<u8>,
}

fn pick(vocabulary: &[&'static str; 3], index: u8) -> &'static str {
    vocabulary[usize::from(index) % vocabulary.len()]
}

fn word(index: u8) -> &'static str {
    pick(&WORDS, index)
}

fuzz_target!(|input: (Vec<Vec<FuzzStatement>>, FuzzRequest)| {
    let (fuzz_policies, fuzz_request) = input;

    let policies: Vec<PolicyDocument> = fuzz_policies
        .iter()
        .enumerate()
        .map(|(i, statements)| {
            statements.iter().fold(PolicyDocument::new(format!("p{i}")), |doc, s| {
                doc.with_statement(s.to_statement())
            })
        })
        .collect();

    let mut builder = ResourceRequest::builder()
        .resource(pick(&RESOURCES, fuzz_request.resource))
        .action(pick(&ACTIONS, fuzz_request.action));
    // Absent attributes exercise the missing-attribute error path.
    if let Some(owner) = fuzz_request.owner {
        builder = builder.string(KEYS[0], word(owner));
    }
    if let Some(days) = fuzz_request.days {
        builder = builder.integer(KEYS[1], i64::from(days));
    }
    if let Some(paid) = fuzz_request.paid {
        builder = builder.boolean(KEYS[2], paid);
    }
    let request = builder.build();

    let mut subject = StaticSubject::new();
    if let Some(uid) = fuzz_request.uid {
        subject = subject.with("user:::uid", word(uid));
    }

    let context = EvaluationContext::new()
        .with_policies(policies.clone())
        .with_subject(subject)
        .without_audit();

    // Must never panic, and must be deterministic.
    let first = decide(&context, &request);
    let second = decide(&context, &request);
    assert_eq!(
        first.as_ref().ok(),
        second.as_ref().ok(),
        "evaluation must be deterministic"
    );
    assert_eq!(first.is_err(), second.is_err());

    let effect = evaluate(&context, &request);
    assert_eq!(effect.as_ref().ok(), first.as_ref().ok().map(|d| &d.effect));

    let has_invalid_effect = policies
        .iter()
        .flat_map(|p| &p.statements)
        .any(|s| s.effect().is_err());
    if has_invalid_effect {
        assert!(first.is_err(), "an invalid effect must fail evaluation");
    }

    match &first {
        Ok(decision) => {
            assert!(!decision.reason.is_empty());
            // Default deny.
            if decision.matched.is_empty() {
                assert_eq!(decision.effect, ResultEffect::Denied);
            }
            // Explicit deny wins.
            let any_deny = decision.matched.iter().any(|s| s.effect == Effect::Deny);
            assert_eq!(
                decision.effect == ResultEffect::Allowed,
                !decision.matched.is_empty() && !any_deny
            );
            // Every matched statement applies to the request.
            for matched in &decision.matched {
                let policy = policies
                    .iter()
                    .find(|p| p.policy_id == matched.policy_id)
                    .expect("matched policy exists");
                let statement = &policy.statements[matched.index];
                assert!(statement.applies_to(&request.resource, &request.action));
            }
        }
        Err(_) => assert_eq!(ResultEffect::or_denied(&effect), ResultEffect::Denied),
    }
});
