//! Share codes
//!
//! A share code is an opaque random string handed to one recipient of a
//! delegated permission. Codes must be unique across the instance since
//! they resolve to a single document.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

use crate::context::Instance;
use crate::error::{PermissionError, PermissionResult};
use crate::store::PermissionQuery;

/// Generate a random alphanumeric code.
pub fn generate_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Issue one fresh code per recipient name.
///
/// A drawn code already used by a stored document, or by another recipient
/// of the same batch, is redrawn up to `max_code_attempts` times.
pub async fn issue_codes(
    instance: &Instance,
    names: &BTreeSet<String>,
) -> PermissionResult<BTreeMap<String, String>> {
    let config = instance.config();
    let mut issued = BTreeMap::new();
    let mut taken = HashSet::new();

    for name in names {
        let mut attempts = 0;
        let code = loop {
            if attempts >= config.max_code_attempts {
                warn!(
                    instance = %instance.domain(),
                    attempts,
                    "Could not draw an unused share code"
                );
                return Err(PermissionError::Internal(
                    "Could not generate a unique share code".to_string(),
                ));
            }
            attempts += 1;

            let candidate = generate_code(config.code_length);
            if taken.contains(&candidate) {
                continue;
            }
            let existing = instance
                .store()
                .query(instance.domain(), &PermissionQuery::ByCode(candidate.clone()))
                .await?;
            if existing.is_empty() {
                break candidate;
            }
        };

        taken.insert(code.clone());
        issued.insert(name.clone(), code);
    }

    Ok(issued)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code() {
        let code = generate_code(32);
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_code(32), code);
    }

    #[test]
    fn test_generate_empty() {
        assert!(generate_code(0).is_empty());
    }

    #[cfg(feature = "jwt")]
    #[tokio::test]
    async fn test_issue_codes_per_name() {
        let (instance, _, _) = crate::context::memory_instance("alice.example.com");
        let names = BTreeSet::from(["alice".to_string(), "bob".to_string()]);

        let codes = issue_codes(&instance, &names).await.unwrap();
        assert_eq!(codes.len(), 2);
        assert_ne!(codes["alice"], codes["bob"]);
        assert_eq!(codes["alice"].len(), instance.config().code_length);
    }

    #[cfg(feature = "jwt")]
    #[tokio::test]
    async fn test_issue_codes_gives_up() {
        let (instance, _, _) = crate::context::memory_instance("alice.example.com");
        let instance = instance.with_config(
            crate::config::PermissionsConfig::default()
                .with_code_length(1)
                .with_max_code_attempts(2),
        );
        // more names than one-character codes exist
        let names: BTreeSet<String> = (0..100).map(|i| format!("user{}", i)).collect();

        let result = issue_codes(&instance, &names).await;
        assert!(matches!(result, Err(PermissionError::Internal(_))));
    }
}
