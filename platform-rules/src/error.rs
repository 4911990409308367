//! Error types for rule parsing and validation.

use thiserror::Error;

/// Errors raised while parsing verbs, scopes, or validating rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A verb string is not one of GET, POST, PUT, PATCH, DELETE or ALL
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    /// A document type is not a namespaced identifier
    #[error("Invalid doctype: {0}")]
    InvalidDoctype(String),

    /// A scope token could not be parsed with the configured grammar
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// A rule is structurally inconsistent
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

/// Result type for rule operations.
pub type RuleResult<T> = Result<T, RuleError>;
