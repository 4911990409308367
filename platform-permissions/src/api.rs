//! Exposed permission operations
//!
//! Entry points consumed by the HTTP layer. Each one authenticates the
//! bearer credential, then delegates to the evaluator, the delegation
//! manager or the existence resolver. Errors map to responses through
//! [`PermissionError::status_code`] and [`PermissionError::body`].
//!
//! [`PermissionError::status_code`]: crate::error::PermissionError::status_code
//! [`PermissionError::body`]: crate::error::PermissionError::body

use platform_rules::{DocRef, RuleSet};

use crate::context::Instance;
use crate::delegation::Delegations;
use crate::document::{PermissionDoc, PermissionPatch};
use crate::error::PermissionResult;
use crate::evaluator::Evaluator;
use crate::resolver::{ExistenceResolver, RefAndVerbs};

/// Get the caller's own effective rules.
pub async fn get_self(instance: &Instance, bearer: &str) -> PermissionResult<RuleSet> {
    let grant = Evaluator::new(instance).authenticate(bearer).await?;
    Ok(grant.doc.rules)
}

/// Delegate part of the caller's rules to named recipients.
///
/// The returned document holds the recipient codes.
pub async fn create_sub_permission(
    instance: &Instance,
    bearer: &str,
    requested: RuleSet,
    recipients: &[String],
) -> PermissionResult<PermissionDoc> {
    let grant = Evaluator::new(instance).authenticate(bearer).await?;
    Delegations::new(instance).create(&grant, requested, recipients).await
}

/// Patch a delegated document owned by the caller.
pub async fn patch_permission(
    instance: &Instance,
    id: &str,
    bearer: &str,
    patch: &PermissionPatch,
) -> PermissionResult<PermissionDoc> {
    let grant = Evaluator::new(instance).authenticate(bearer).await?;
    Delegations::new(instance).patch(id, &grant, patch).await
}

/// Revoke a delegated document owned by the caller.
pub async fn revoke_permission(instance: &Instance, id: &str, bearer: &str) -> PermissionResult<()> {
    let grant = Evaluator::new(instance).authenticate(bearer).await?;
    Delegations::new(instance).revoke(id, &grant).await
}

/// Get the verbs stored permissions grant on some documents.
///
/// Any valid credential may ask; the answer covers the whole instance and
/// is not narrowed to the caller's grant.
pub async fn check_existence(
    instance: &Instance,
    bearer: &str,
    refs: &[DocRef],
) -> PermissionResult<Vec<RefAndVerbs>> {
    Evaluator::new(instance).authenticate(bearer).await?;
    ExistenceResolver::new(instance).resolve(refs).await
}

/// Split the comma separated recipient list of a query string.
pub fn recipients_from_query(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
