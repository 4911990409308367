//! # Document Types
//!
//! Well-known document types of the platform and validation of the
//! namespaced identifiers rules are written against.

use crate::error::{RuleError, RuleResult};

/// Stored permission documents.
pub const PERMISSIONS: &str = "io.cozy.permissions";
/// Installed applications.
pub const APPS: &str = "io.cozy.apps";
/// Files and directories.
pub const FILES: &str = "io.cozy.files";
/// Address book entries.
pub const CONTACTS: &str = "io.cozy.contacts";
/// Calendar events.
pub const EVENTS: &str = "io.cozy.events";
/// Registered OAuth clients.
pub const OAUTH_CLIENTS: &str = "io.cozy.oauth.clients";
/// Instance settings.
pub const SETTINGS: &str = "io.cozy.settings";

/// Check if a string is a namespaced document type.
///
/// A document type has at least two dot-separated segments, each made of
/// lowercase ASCII letters, digits, `-` or `_`.
///
/// # Example
///
/// ```
/// use platform_rules::doctypes;
///
/// assert!(doctypes::is_valid("io.cozy.files"));
/// assert!(doctypes::is_valid("com.example.my-notes"));
/// assert!(!doctypes::is_valid("files"));
/// assert!(!doctypes::is_valid("io..files"));
/// assert!(!doctypes::is_valid("io.cozy.Files"));
/// ```
pub fn is_valid(doctype: &str) -> bool {
    let segments: Vec<&str> = doctype.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        })
}

/// Validate a document type, returning an error naming it otherwise.
pub fn validate(doctype: &str) -> RuleResult<()> {
    if is_valid(doctype) {
        Ok(())
    } else {
        Err(RuleError::InvalidDoctype(doctype.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_doctypes_are_valid() {
        for doctype in [PERMISSIONS, APPS, FILES, CONTACTS, EVENTS, OAUTH_CLIENTS, SETTINGS] {
            assert!(is_valid(doctype), "{} should be valid", doctype);
        }
    }

    #[test]
    fn test_invalid_doctypes() {
        assert!(!is_valid(""));
        assert!(!is_valid("io"));
        assert!(!is_valid(".io.cozy"));
        assert!(!is_valid("io.cozy."));
        assert!(!is_valid("io.cozy.files:GET"));
        assert!(!is_valid("io cozy files"));
    }

    #[test]
    fn test_validate() {
        assert!(validate("io.cozy.token-cant-do-this").is_ok());
        assert_eq!(
            validate("Files"),
            Err(RuleError::InvalidDoctype("Files".to_string()))
        );
    }
}
