//! Authorization evaluator
//!
//! Turns a bearer credential into a [`Grant`] (the caller's effective rule
//! set and the document it comes from) and answers allow/deny questions
//! against it. Evaluation never writes to the store.

use chrono::Utc;
use platform_rules::{doctypes, Matchable, RuleSet, Verb};
use tracing::{debug, warn};

use crate::claims::{Audience, Claims, GrantSource, Staleness};
use crate::context::Instance;
use crate::document::{PermissionDoc, PermissionType};
use crate::error::{PermissionError, PermissionResult};
use crate::store::PermissionQuery;

/// Effective permissions of an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// Audience of the credential the grant was resolved from
    pub audience: Audience,
    /// Document holding the rules, ephemeral for inline-scope tokens
    pub doc: PermissionDoc,
}

impl Grant {
    /// Rules granted.
    pub fn rules(&self) -> &RuleSet {
        &self.doc.rules
    }

    /// Delegation depth of the grant.
    pub fn depth(&self) -> u8 {
        self.doc.parent_depth
    }

    /// Client owning the grant's document.
    pub fn owner_client_id(&self) -> &str {
        &self.doc.client_id
    }

    /// Client the caller acts as when managing documents.
    ///
    /// Share recipients act as nobody: a code can never manage the
    /// document it was derived from.
    pub fn acting_client_id(&self) -> Option<&str> {
        match self.audience.grant_source() {
            GrantSource::InlineScope => Some(&self.doc.client_id),
            GrantSource::StoredDocument | GrantSource::Nothing => None,
        }
    }

    /// Check if the caller may patch or revoke a document.
    ///
    /// App slugs, CLI subjects and OAuth client ids live in separate
    /// namespaces, so the kind of grant must match too.
    pub fn can_manage(&self, doc: &PermissionDoc) -> bool {
        self.acting_client_id() == Some(doc.client_id.as_str())
            && doc.owner_type == Some(self.doc.perm_type)
    }
}

/// Resolves credentials and checks grants for one instance.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    instance: &'a Instance,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator for an instance.
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Decode a bearer credential and resolve its grant.
    pub async fn authenticate(&self, bearer: &str) -> PermissionResult<Grant> {
        let claims = self.instance.decode(bearer)?;
        self.resolve(&claims).await
    }

    /// Resolve the grant of decoded claims.
    pub async fn resolve(&self, claims: &Claims) -> PermissionResult<Grant> {
        if claims.iss != self.instance.domain() {
            debug!(issuer = %claims.iss, "Token issued for another instance");
            return Err(PermissionError::InvalidToken);
        }

        if claims.aud.staleness() == Staleness::AccessTokenWindow
            && claims.is_stale(self.instance.config().access_token_max_age, Utc::now())
        {
            debug!(subject = %claims.sub, issued_at = %claims.issued_at(), "Access token is stale");
            return Err(PermissionError::TokenExpired);
        }

        let doc = match claims.aud.grant_source() {
            GrantSource::InlineScope => self.inline_grant(claims).await?,
            GrantSource::StoredDocument => self.stored_grant(&claims.sub).await?,
            GrantSource::Nothing => {
                debug!(audience = %claims.aud, "Token audience grants nothing");
                return Err(PermissionError::InvalidToken);
            }
        };

        Ok(Grant {
            audience: claims.aud,
            doc,
        })
    }

    async fn inline_grant(&self, claims: &Claims) -> PermissionResult<PermissionDoc> {
        if claims.aud.requires_registered_client() {
            let exists = self
                .instance
                .clients()
                .client_exists(self.instance.domain(), &claims.sub)
                .await?;
            if !exists {
                debug!(client_id = %claims.sub, "Access token for an unknown client");
                return Err(PermissionError::InvalidToken);
            }
        }

        let rules = RuleSet::from_scope(&claims.scope, self.instance.config().scope_grammar)
            .map_err(|e| {
                debug!(error = %e, "Token scope does not parse");
                PermissionError::InvalidToken
            })?;

        let perm_type = match claims.aud {
            Audience::App => PermissionType::App,
            Audience::Cli => PermissionType::Cli,
            _ => PermissionType::Oauth,
        };
        Ok(PermissionDoc::ephemeral(perm_type, claims.sub.clone(), rules))
    }

    async fn stored_grant(&self, subject: &str) -> PermissionResult<PermissionDoc> {
        let store = self.instance.store();
        let domain = self.instance.domain();

        let by_code = store
            .query(domain, &PermissionQuery::ByCode(subject.to_string()))
            .await?;
        if let Some(doc) = by_code.into_iter().next() {
            return Ok(doc);
        }

        match store.get(domain, subject).await? {
            Some(doc) => Ok(doc),
            None => {
                debug!("Share token names no stored permission");
                Err(PermissionError::InvalidToken)
            }
        }
    }

    /// Check a verb on a type, optionally for one document id.
    pub fn allow(
        &self,
        grant: &Grant,
        verb: Verb,
        doc_type: &str,
        value: Option<&str>,
    ) -> PermissionResult<()> {
        if grant.rules().allow(verb, doc_type, value) {
            return Ok(());
        }
        self.deny(grant, verb, doc_type)
    }

    /// Check a verb on every document of a type.
    pub fn allow_whole_type(&self, grant: &Grant, verb: Verb, doc_type: &str) -> PermissionResult<()> {
        if grant.rules().allow_whole_type(verb, doc_type) {
            return Ok(());
        }
        self.deny(grant, verb, doc_type)
    }

    /// Check a verb on a loaded document.
    pub fn allow_doc<M: Matchable + ?Sized>(
        &self,
        grant: &Grant,
        verb: Verb,
        doc: &M,
    ) -> PermissionResult<()> {
        if grant.rules().allow_doc(verb, doc) {
            return Ok(());
        }
        self.deny(grant, verb, doc.doc_type())
    }

    /// Check that the caller may install, update (POST) or remove (DELETE)
    /// applications.
    pub fn allow_install_app(&self, grant: &Grant, verb: Verb) -> PermissionResult<()> {
        self.allow_whole_type(grant, verb, doctypes::APPS)
    }

    fn deny(&self, grant: &Grant, verb: Verb, doc_type: &str) -> PermissionResult<()> {
        warn!(
            instance = %self.instance.domain(),
            audience = %grant.audience,
            verb = %verb,
            doc_type,
            "Permission denied"
        );
        Err(PermissionError::Forbidden(format!("{} on {}", verb, doc_type)))
    }
}

#[cfg(all(test, feature = "jwt"))]
mod tests {
    use super::*;
    use crate::context::memory_instance;
    use crate::store::PermissionStore;
    use chrono::Duration;
    use platform_rules::{DocRef, Rule, VerbSet};
    use std::collections::BTreeMap;

    const DOMAIN: &str = "alice.example.com";

    fn access_claims(scope: &str) -> Claims {
        Claims::new(Audience::Access, DOMAIN, "client-1").with_scope(scope)
    }

    #[tokio::test]
    async fn test_resolve_inline_scope() {
        let (instance, _, clients) = memory_instance(DOMAIN);
        clients.register(DOMAIN, "client-1").await;

        let grant = Evaluator::new(&instance)
            .resolve(&access_claims("io.cozy.contacts io.cozy.files:GET"))
            .await
            .unwrap();

        assert_eq!(grant.depth(), 0);
        assert_eq!(grant.owner_client_id(), "client-1");
        assert_eq!(grant.acting_client_id(), Some("client-1"));
        assert_eq!(grant.doc.perm_type, PermissionType::Oauth);
        assert!(grant.rules().get("rule0").unwrap().verbs.is_all());
        assert_eq!(grant.rules().get("rule1").unwrap().verbs, VerbSet::only(Verb::Get));
    }

    #[tokio::test]
    async fn test_unregistered_client() {
        let (instance, _, _) = memory_instance(DOMAIN);
        let result = Evaluator::new(&instance)
            .resolve(&access_claims("io.cozy.contacts"))
            .await;
        assert!(matches!(result, Err(PermissionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_stale_access_token() {
        let (instance, _, clients) = memory_instance(DOMAIN);
        clients.register(DOMAIN, "client-1").await;

        let claims = access_claims("io.cozy.contacts").with_issued_at(Utc::now() - Duration::days(30));
        let result = Evaluator::new(&instance).resolve(&claims).await;
        assert!(matches!(result, Err(PermissionError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_old_cli_token_is_not_stale() {
        let (instance, _, _) = memory_instance(DOMAIN);
        let claims = Claims::new(Audience::Cli, DOMAIN, "cli")
            .with_scope("io.cozy.files")
            .with_issued_at(Utc::now() - Duration::days(365));

        let grant = Evaluator::new(&instance).resolve(&claims).await.unwrap();
        assert_eq!(grant.doc.perm_type, PermissionType::Cli);
    }

    #[tokio::test]
    async fn test_refresh_token_grants_nothing() {
        let (instance, _, clients) = memory_instance(DOMAIN);
        clients.register(DOMAIN, "client-1").await;

        let claims = Claims::new(Audience::Refresh, DOMAIN, "client-1");
        let result = Evaluator::new(&instance).resolve(&claims).await;
        assert!(matches!(result, Err(PermissionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_foreign_issuer() {
        let (instance, _, _) = memory_instance(DOMAIN);
        let claims = Claims::new(Audience::App, "bob.example.com", "mini");
        let result = Evaluator::new(&instance).resolve(&claims).await;
        assert!(matches!(result, Err(PermissionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_share_by_code_then_id() {
        let (instance, store, _) = memory_instance(DOMAIN);
        let mut rules = RuleSet::new();
        rules.insert("contacts", Rule::whole_type("io.cozy.contacts"));
        let codes = BTreeMap::from([("bob".to_string(), "code-bob".to_string())]);
        let doc = store
            .create(DOMAIN, PermissionDoc::share("client-1", rules, codes, 0))
            .await
            .unwrap();

        let evaluator = Evaluator::new(&instance);
        let by_code = evaluator
            .resolve(&Claims::new(Audience::Share, DOMAIN, "code-bob"))
            .await
            .unwrap();
        assert_eq!(by_code.doc.id, doc.id);
        assert_eq!(by_code.depth(), 1);
        assert_eq!(by_code.acting_client_id(), None);
        assert!(!by_code.can_manage(&doc));

        let by_id = evaluator
            .resolve(&Claims::new(Audience::Share, DOMAIN, doc.id.clone()))
            .await
            .unwrap();
        assert_eq!(by_id.doc, doc);

        let unknown = evaluator
            .resolve(&Claims::new(Audience::Share, DOMAIN, "nope"))
            .await;
        assert!(matches!(unknown, Err(PermissionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_allow_checks() {
        let (instance, _, _) = memory_instance(DOMAIN);
        let evaluator = Evaluator::new(&instance);
        let claims = Claims::new(Audience::App, DOMAIN, "mini")
            .with_scope("io.cozy.files:GET io.cozy.apps:POST");
        let grant = evaluator.resolve(&claims).await.unwrap();

        assert!(evaluator.allow(&grant, Verb::Get, "io.cozy.files", Some("f1")).is_ok());
        assert!(evaluator.allow_whole_type(&grant, Verb::Get, "io.cozy.files").is_ok());
        assert!(evaluator
            .allow_doc(&grant, Verb::Get, &DocRef::new("io.cozy.files", "f1"))
            .is_ok());

        let denied = evaluator.allow(&grant, Verb::Delete, "io.cozy.files", None);
        assert!(matches!(denied, Err(PermissionError::Forbidden(_))));
        assert_eq!(denied.unwrap_err().status_code(), 403);

        assert!(evaluator.allow_install_app(&grant, Verb::Post).is_ok());
        assert!(evaluator.allow_install_app(&grant, Verb::Delete).is_err());
    }
}
