//! Error types for policy parsing and evaluation.
//!
//! Only [`EvaluationError`] aborts a decision. Predicate failures are
//! absorbed by the comparator that raised them (see
//! [`crate::predicate::PredicateError`]).

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::attributes::ValueKind;

/// Boxed error returned by caller-supplied extension points.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal evaluation errors. Every variant resolves to a DENIED decision.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// The context was built with a preconfigured error.
    #[error("evaluation context is misconfigured: {0}")]
    Misconfigured(Arc<dyn std::error::Error + Send + Sync>),

    /// A statement's effect is not exactly `Allow` or `Deny`.
    #[error("invalid effect: {effect}")]
    InvalidEffect { effect: String },

    /// A comparator references an attribute the request does not carry.
    #[error("key {key} not found in {kind} properties of resource")]
    MissingAttribute { key: String, kind: ValueKind },

    /// The validation override returned an error.
    #[error("validation override failed: {0}")]
    Override(Arc<dyn std::error::Error + Send + Sync>),
}

impl EvaluationError {
    /// Wraps an error produced outside the engine as a preconfigured error.
    pub fn misconfigured(err: impl Into<BoxError>) -> Self {
        Self::Misconfigured(Arc::from(err.into()))
    }

    pub(crate) fn from_override(err: BoxError) -> Self {
        Self::Override(Arc::from(err))
    }
}

/// Errors raised while turning policy JSON into documents.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed policy document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read policy file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse policy file at {path}: {source}")]
    File {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, EvaluationError>;
