//! Named custom predicates.
//!
//! A comparator's `ValidationFunc` names a predicate registered on the
//! evaluation context. The predicate receives the request's string attribute
//! as its first operand and one resolved second operand. Anything that goes
//! wrong here only makes that comparator not match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::attributes::Properties;
use crate::error::BoxError;
use crate::policy::ValidationFunc;
use crate::subject::SubjectAttributeResolver;

/// A caller-supplied predicate over two string operands.
pub type ValidationFunction = Arc<dyn Fn(&str, &str) -> Result<bool, BoxError> + Send + Sync>;

/// Non-fatal predicate failures.
#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("validation func {function} has no second operand")]
    NoOperand { function: String },

    #[error("validation func {function} has more than one second operand")]
    AmbiguousOperand { function: String },

    #[error("validation func {function} is not registered")]
    Unregistered { function: String },

    #[error("validation func {function} operand {key} not found in string properties of resource")]
    MissingOperandAttribute { function: String, key: String },

    #[error("validation func {function} failed: {source}")]
    Failed {
        function: String,
        #[source]
        source: BoxError,
    },
}

/// Registry of named predicates, scoped to one evaluation context.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    functions: HashMap<String, ValidationFunction>,
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("PredicateRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&str, &str) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Registers a predicate (builder pattern).
    pub fn with<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&str, &str) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.register(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValidationFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Runs the predicate named by `func` against `first`.
    ///
    /// `first` is the request's string attribute at the comparator's key.
    pub fn call(
        &self,
        func: &ValidationFunc,
        first: &str,
        properties: &Properties,
        subject: &dyn SubjectAttributeResolver,
    ) -> Result<bool, PredicateError> {
        let second = second_operand(func, properties, subject)?;
        let function = self
            .get(&func.function)
            .ok_or_else(|| PredicateError::Unregistered {
                function: func.function.clone(),
            })?;
        function(first, &second).map_err(|source| PredicateError::Failed {
            function: func.function.clone(),
            source,
        })
    }
}

/// Resolves the second operand from exactly one of its three sources.
pub fn second_operand(
    func: &ValidationFunc,
    properties: &Properties,
    subject: &dyn SubjectAttributeResolver,
) -> Result<String, PredicateError> {
    match (&func.string_arg, &func.prop_arg, &func.user_arg) {
        (Some(literal), None, None) => Ok(literal.clone()),
        (None, Some(key), None) => {
            properties
                .string
                .get(key)
                .cloned()
                .ok_or_else(|| PredicateError::MissingOperandAttribute {
                    function: func.function.clone(),
                    key: key.clone(),
                })
        }
        (None, None, Some(key)) => Ok(subject.resolve(key)),
        (None, None, None) => Err(PredicateError::NoOperand {
            function: func.function.clone(),
        }),
        _ => Err(PredicateError::AmbiguousOperand {
            function: func.function.clone(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
