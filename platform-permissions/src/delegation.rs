//! Delegation manager
//!
//! Creates, patches and revokes the share documents a top-level grant
//! delegates to its recipients. Delegation is capped at one level: a grant
//! resolved from a share document cannot delegate again.
//!
//! Mutations are guarded by the store's revisions. A patch or revoke that
//! loses a race reloads the document and replays its checks against the
//! latest revision, up to `max_conflict_retries` times.

use platform_rules::RuleSet;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::codes;
use crate::context::Instance;
use crate::document::{PermissionDoc, PermissionPatch, PermissionType};
use crate::error::{PermissionError, PermissionResult};
use crate::evaluator::Grant;
use crate::store::PermissionQuery;

/// Manages delegated permission documents of one instance.
#[derive(Debug, Clone, Copy)]
pub struct Delegations<'a> {
    instance: &'a Instance,
}

impl<'a> Delegations<'a> {
    /// Create a manager for an instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Delegate a subset of `parent`'s rules to named recipients.
    ///
    /// The returned document carries the recipient name to code mapping;
    /// this is the only time the codes are disclosed.
    pub async fn create(
        &self,
        parent: &Grant,
        requested: RuleSet,
        recipients: &[String],
    ) -> PermissionResult<PermissionDoc> {
        if !parent.doc.can_delegate() {
            return Err(PermissionError::DepthExceeded);
        }

        requested.validate()?;
        if requested.is_empty() {
            return Err(PermissionError::InvalidRules(
                "At least one rule is required".to_string(),
            ));
        }
        if !requested.is_subset_of(parent.rules()) {
            debug!(owner = %parent.owner_client_id(), "Requested rules exceed the parent grant");
            return Err(PermissionError::NotSubset);
        }

        let names = recipient_names(recipients)?;
        let codes = codes::issue_codes(self.instance, &names).await?;

        let doc = PermissionDoc::share(parent.owner_client_id(), requested, codes, parent.depth())
            .with_owner_type(parent.doc.perm_type);
        let doc = self.instance.store().create(self.instance.domain(), doc).await?;

        info!(
            instance = %self.instance.domain(),
            permission_id = %doc.id,
            owner = %doc.client_id,
            recipients = doc.codes.len(),
            "Created delegated permission"
        );
        Ok(doc)
    }

    /// Add rules to a document and/or replace its codes.
    pub async fn patch(
        &self,
        id: &str,
        acting: &Grant,
        patch: &PermissionPatch,
    ) -> PermissionResult<PermissionDoc> {
        let mut retries = 0;
        loop {
            let mut doc = self.load_managed(id, acting).await?;

            if patch.is_noop() {
                return Err(PermissionError::NoopPatch);
            }

            if let Some(additions) = patch.rules.as_ref().filter(|r| !r.is_empty()) {
                additions.validate()?;
                if !additions.is_subset_of(acting.rules()) {
                    debug!(permission_id = %id, "Patched rules exceed the acting grant");
                    return Err(PermissionError::NotSubset);
                }
                doc.rules.merge(additions);
            }

            if let Some(names) = &patch.codes {
                let names = recipient_names(names)?;
                doc.codes = codes::issue_codes(self.instance, &names).await?;
            }

            match self.instance.store().update(self.instance.domain(), doc).await {
                Ok(updated) => {
                    info!(
                        instance = %self.instance.domain(),
                        permission_id = %updated.id,
                        rules = updated.rules.len(),
                        recipients = updated.codes.len(),
                        "Patched delegated permission"
                    );
                    return Ok(updated);
                }
                Err(PermissionError::Conflict(_)) if retries < self.instance.config().max_conflict_retries => {
                    retries += 1;
                    debug!(permission_id = %id, retries, "Retrying patch after conflict");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete a document, invalidating every code derived from it.
    pub async fn revoke(&self, id: &str, acting: &Grant) -> PermissionResult<()> {
        let mut retries = 0;
        loop {
            let doc = self.load_managed(id, acting).await?;

            match self.instance.store().delete(self.instance.domain(), &doc).await {
                Ok(()) => {
                    info!(
                        instance = %self.instance.domain(),
                        permission_id = %id,
                        "Revoked delegated permission"
                    );
                    return Ok(());
                }
                Err(PermissionError::Conflict(_)) if retries < self.instance.config().max_conflict_retries => {
                    retries += 1;
                    debug!(permission_id = %id, retries, "Retrying revoke after conflict");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete every document an OAuth client delegated, once the client is
    /// unregistered. Returns the number of documents deleted.
    pub async fn revoke_client(&self, client_id: &str) -> PermissionResult<usize> {
        let store = self.instance.store();
        let domain = self.instance.domain();
        let owned = store
            .query(domain, &PermissionQuery::ByClient(client_id.to_string()))
            .await?;

        let mut deleted = 0;
        for doc in owned {
            // same id, other namespace (an app slug or a cli subject)
            if doc.owner_type.map_or(false, |t| t != PermissionType::Oauth) {
                continue;
            }
            match store.delete(domain, &doc).await {
                Ok(()) => deleted += 1,
                Err(PermissionError::NotFound(_)) => {}
                Err(e) => {
                    warn!(
                        instance = %domain,
                        permission_id = %doc.id,
                        error = %e,
                        "Failed to delete permission of removed client"
                    );
                    return Err(e);
                }
            }
        }

        info!(instance = %domain, client_id, deleted, "Revoked permissions of client");
        Ok(deleted)
    }

    async fn load_managed(&self, id: &str, acting: &Grant) -> PermissionResult<PermissionDoc> {
        let doc = self
            .instance
            .store()
            .get(self.instance.domain(), id)
            .await?
            .ok_or_else(|| PermissionError::NotFound(id.to_string()))?;

        if !acting.can_manage(&doc) {
            warn!(
                instance = %self.instance.domain(),
                permission_id = %id,
                audience = %acting.audience,
                "Caller does not own the permission"
            );
            return Err(PermissionError::NotOwner);
        }
        Ok(doc)
    }
}

fn recipient_names<'r, I>(recipients: I) -> PermissionResult<BTreeSet<String>>
where
    I: IntoIterator<Item = &'r String>,
{
    let mut names = BTreeSet::new();
    for name in recipients {
        let name = name.trim();
        if name.is_empty() {
            return Err(PermissionError::InvalidRules(
                "Recipient names cannot be empty".to_string(),
            ));
        }
        names.insert(name.to_string());
    }
    Ok(names)
}
