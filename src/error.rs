//! Engine errors
//!
//! Everything in here is a programmer-visible defect: a mis-declared rule, a
//! comparison path that points nowhere, a handler that was never registered. A rule
//! that simply fails is *not* an error; it produces a
//! [`ValidationMessage`](crate::validation::message::ValidationMessage) instead.

use thiserror::Error;

use crate::validation::numeric::NumericWidth;

/// Result type used by every fallible engine operation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failures raised while walking a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("field path is empty")]
    EmptyPath,

    #[error("field path '{path}' contains an empty segment")]
    EmptySegment { path: String },

    #[error("'{segment}' does not exist on {type_name} (path '{path}')")]
    MissingSegment {
        path: String,
        segment: String,
        type_name: String,
    },

    #[error("'{segment}' is null while resolving '{path}'")]
    NullIntermediate { path: String, segment: String },

    #[error("'{segment}' is not an object while resolving '{path}'")]
    NotAnObject { path: String, segment: String },
}

/// Fatal errors surfaced by the registry, the rules and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{rule} rule on {type_name}.{field} is misconfigured: {reason}")]
    Configuration {
        type_name: String,
        field: String,
        rule: &'static str,
        reason: String,
    },

    #[error("field '{field}' holds a {found} value but the rule is bound to {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("cannot convert '{value}' into a {width} bound")]
    Conversion { value: String, width: NumericWidth },

    #[error("missing '{handler}' validation handler for {type_name}")]
    MissingHandler { handler: String, type_name: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("'{field}' is not a registered field of {type_name}")]
    UnknownField { field: String, type_name: String },

    #[error("a field name must be supplied")]
    MissingFieldName,
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Configuration`].
    pub fn configuration(
        type_name: &str,
        field: &str,
        rule: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            type_name: type_name.to_string(),
            field: field.to_string(),
            rule,
            reason: reason.into(),
        }
    }

    /// Whether this error came from resolving a path or a handler name.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::MissingHandler { .. } | Self::Path(_) | Self::UnknownField { .. }
        )
    }
}
