//! Error types for permission operations
//!
//! This module defines all error types that can occur while resolving a
//! credential, checking a grant, or mutating stored permission documents.

use platform_rules::RuleError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission error types.
///
/// Credential failures are deliberately coarse: a revoked client, an
/// unknown code and a garbage token all surface as [`InvalidToken`].
///
/// [`InvalidToken`]: PermissionError::InvalidToken
#[derive(Debug, Error)]
pub enum PermissionError {
    /// Token is malformed, has a bad signature or an unknown audience, or
    /// names an unknown subject
    #[error("Invalid JWT token")]
    InvalidToken,

    /// OAuth access token is older than the validity window
    #[error("Expired token")]
    TokenExpired,

    /// The grant does not allow the requested action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A derived permission tried to delegate further
    #[error("Delegation depth exceeded: only top-level permissions can be shared")]
    DepthExceeded,

    /// Requested rules are not covered by the acting grant
    #[error("Requested permissions are not a subset of the current ones")]
    NotSubset,

    /// A patch carried neither rules nor codes
    #[error("Patch has no rules or codes to change")]
    NoopPatch,

    /// Only the client that created a document can change it
    #[error("Only the owner of the permission can change it")]
    NotOwner,

    /// Permission document does not exist
    #[error("Permission not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency check failed
    #[error("Conflict on permission {0}")]
    Conflict(String),

    /// Inline scope could not be parsed
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Rules or recipient names in a request are unusable
    #[error("Invalid permissions: {0}")]
    InvalidRules(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

impl PermissionError {
    /// Check if this error should be logged at error level.
    ///
    /// Denials and bad credentials are expected traffic.
    pub fn is_server_error(&self) -> bool {
        matches!(self, PermissionError::Store(_) | PermissionError::Internal(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PermissionError::InvalidToken
            | PermissionError::TokenExpired
            | PermissionError::NoopPatch
            | PermissionError::InvalidScope(_)
            | PermissionError::InvalidRules(_) => 400,

            PermissionError::Forbidden(_)
            | PermissionError::DepthExceeded
            | PermissionError::NotSubset
            | PermissionError::NotOwner => 403,

            PermissionError::NotFound(_) => 404,
            PermissionError::Conflict(_) => 409,

            PermissionError::Store(_) | PermissionError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            PermissionError::InvalidToken => "INVALID_TOKEN",
            PermissionError::TokenExpired => "TOKEN_EXPIRED",
            PermissionError::Forbidden(_) => "FORBIDDEN",
            PermissionError::DepthExceeded => "DEPTH_EXCEEDED",
            PermissionError::NotSubset => "NOT_SUBSET",
            PermissionError::NoopPatch => "NOOP_PATCH",
            PermissionError::NotOwner => "NOT_OWNER",
            PermissionError::NotFound(_) => "NOT_FOUND",
            PermissionError::Conflict(_) => "CONFLICT",
            PermissionError::InvalidScope(_) => "INVALID_SCOPE",
            PermissionError::InvalidRules(_) => "INVALID_RULES",
            PermissionError::Store(_) => "STORE_ERROR",
            PermissionError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Body rendered by the HTTP layer for this error.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            message: self.to_string(),
        }
    }
}

impl From<RuleError> for PermissionError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::InvalidScope(msg) => PermissionError::InvalidScope(msg),
            other => PermissionError::InvalidRules(other.to_string()),
        }
    }
}

/// JSON error body, `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub message: String,
}
