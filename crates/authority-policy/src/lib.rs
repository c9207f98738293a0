//! # authority-policy: Statement-based access decisions
//!
//! A policy decision point. Given JSON policy documents, a requested
//! resource/action and a typed attribute bag, it computes ALLOWED or DENIED.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ResourceRequest                             │
//! │  (resource + action + typed attribute bag)   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision Resolver                           │
//! │  ├─ Preconfigured error / override           │
//! │  ├─ Merge statements from every policy       │
//! │  ├─ Validate every effect                    │
//! │  ├─ Filter by resource + action              │
//! │  └─ Filter by condition                      │
//! │       ├─ AtLeastOne / MustHaveAll            │
//! │       ├─ Typed comparators                   │
//! │       ├─ Subject attributes                  │
//! │       └─ Named predicates                    │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Decision                                    │
//! │  - nothing applies   -> DENIED               │
//! │  - any Deny applies  -> DENIED               │
//! │  - otherwise         -> ALLOWED              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every error resolves to DENIED. A comparator that references an attribute
//! the request does not carry is an error, not a non-match.
//!
//! ## Examples
//!
//! ```
//! use authority_policy::{
//!     evaluate, parse_policies, EvaluationContext, ResourceRequest, ResultEffect,
//! };
//!
//! let policies = parse_policies(br#"[{
//!     "Version": 1,
//!     "PolicyID": "leave",
//!     "Statement": [
//!         { "Effect": "Allow", "Resource": "res:::leave", "Action": ["act:::leave:approve"] },
//!         {
//!             "Effect": "Deny",
//!             "Resource": "res:::leave",
//!             "Action": ["act:::leave:approve"],
//!             "Condition": { "AtLeastOne": { "status": { "StringEqual": "closed" } } }
//!         }
//!     ]
//! }]"#)
//! .unwrap();
//!
//! let ctx = EvaluationContext::new().with_policies(policies);
//!
//! let open = ResourceRequest::builder()
//!     .resource("res:::leave")
//!     .action("act:::leave:approve")
//!     .string("status", "open")
//!     .build();
//! assert_eq!(evaluate(&ctx, &open).unwrap(), ResultEffect::Allowed);
//!
//! let closed = ResourceRequest::builder()
//!     .resource("res:::leave")
//!     .action("act:::leave:approve")
//!     .string("status", "closed")
//!     .build();
//! assert_eq!(evaluate(&ctx, &closed).unwrap(), ResultEffect::Denied);
//! ```

pub mod attributes;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod parse;
pub mod policy;
pub mod predicate;
pub mod subject;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

#[cfg(test)]
mod tests;

pub use attributes::{AttributeValue, Properties, RequestBuilder, ResourceRequest, ValueKind};
pub use condition::{Matcher, Quantifier};
pub use error::{BoxError, EvaluationError, ParseError};
pub use evaluator::{
    Decision, EvaluationContext, ResultEffect, StatementRef, ValidationOverride, decide, evaluate,
};
pub use parse::{load_policies, parse_policies, parse_policy};
pub use policy::{Comparator, ComparatorMap, Condition, Effect, PolicyDocument, Statement, ValidationFunc};
pub use predicate::{PredicateError, PredicateRegistry, ValidationFunction};
pub use subject::{EmptySubject, JsonSubject, StaticSubject, SubjectAttributeResolver};
