//! Error types shared across the PDP.
//!
//! Two distinct failure channels exist:
//!
//! - [`IndeterminateError`]: an evaluation-time failure that becomes an
//!   Indeterminate decision. Carried as the `Err` arm of [`EvalResult`].
//! - [`PdpError`]: a fatal load-time failure (invalid policy, unknown
//!   function, reference cycle). Never produced during request evaluation.

use crate::attribute::AttributeFqn;
use std::fmt;
use thiserror::Error;

/// XACML status codes surfaced in Indeterminate results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StatusCode {
    /// `urn:oasis:names:tc:xacml:1.0:status:ok`
    Ok,
    /// `urn:oasis:names:tc:xacml:1.0:status:missing-attribute`
    MissingAttribute,
    /// `urn:oasis:names:tc:xacml:1.0:status:syntax-error`
    SyntaxError,
    /// `urn:oasis:names:tc:xacml:1.0:status:processing-error`
    ProcessingError,
}

impl StatusCode {
    /// The standard URN for this status code.
    pub fn uri(self) -> &'static str {
        match self {
            StatusCode::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            StatusCode::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            StatusCode::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            StatusCode::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Evaluation-time failure that maps to an Indeterminate decision.
///
/// Expressions, functions and target matches return this through
/// [`EvalResult`]; rule and policy evaluators convert it into an
/// Indeterminate decision with the appropriate effect flavor.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status}: {message}")]
pub struct IndeterminateError {
    /// Status code reported to the PEP.
    pub status: StatusCode,
    /// Human-readable detail, never shown to the requester verbatim.
    pub message: String,
    /// The attribute that was required but absent, when `status` is
    /// `MissingAttribute`.
    pub missing_attribute: Option<AttributeFqn>,
}

impl IndeterminateError {
    pub fn syntax_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SyntaxError,
            message: message.into(),
            missing_attribute: None,
        }
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::ProcessingError,
            message: message.into(),
            missing_attribute: None,
        }
    }

    pub fn missing_attribute(fqn: AttributeFqn) -> Self {
        Self {
            status: StatusCode::MissingAttribute,
            message: format!("missing required attribute {fqn}"),
            missing_attribute: Some(fqn),
        }
    }

    /// Wraps this error with an outer message, keeping the status code of
    /// the innermost failure (the top-level status is what the PEP sees).
    pub fn context(self, message: impl Into<String>) -> Self {
        Self {
            status: self.status,
            message: format!("{}: {}", message.into(), self.message),
            missing_attribute: self.missing_attribute,
        }
    }
}

/// Result of a value-producing evaluation step.
pub type EvalResult<T> = std::result::Result<T, IndeterminateError>;

/// Fatal initialization error. Policies and functions are validated fully at
/// PDP load; nothing in this enum can occur during request evaluation.
#[derive(Error, Debug)]
pub enum PdpError {
    /// Structurally invalid policy element or function arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Function ID not present in the registry.
    #[error("unsupported function: {0}")]
    UnknownFunction(String),

    /// Combining algorithm ID not present in the registry.
    #[error("unsupported combining algorithm: {0}")]
    UnknownCombiningAlg(String),

    /// Variable reference to an undefined VariableDefinition.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// VariableReference chain longer than the configured maximum.
    #[error("variable reference depth exceeds maximum ({0})")]
    VariableRefDepthExceeded(usize),

    /// Policy(Set) reference that cannot be resolved against the policy map.
    #[error("unresolvable policy reference: {0}")]
    UnresolvedReference(String),

    /// Policy(Set) reference cycle detected during static resolution.
    #[error("policy reference cycle: {0}")]
    ReferenceCycle(String),

    /// Policy reference chain longer than the configured maximum.
    #[error("policy reference depth exceeds maximum ({0})")]
    PolicyRefDepthExceeded(usize),

    /// Configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for load-time operations.
pub type Result<T> = std::result::Result<T, PdpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_uris() {
        assert_eq!(StatusCode::Ok.uri(), "urn:oasis:names:tc:xacml:1.0:status:ok");
        assert!(StatusCode::MissingAttribute.uri().ends_with("missing-attribute"));
        assert!(StatusCode::SyntaxError.uri().ends_with("syntax-error"));
        assert!(StatusCode::ProcessingError.uri().ends_with("processing-error"));
    }

    #[test]
    fn context_keeps_status() {
        let e = IndeterminateError::syntax_error("bad literal").context("arg #1");
        assert_eq!(e.status, StatusCode::SyntaxError);
        assert!(e.message.starts_with("arg #1: "));
    }
}
