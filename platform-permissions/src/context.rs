//! Instance context
//!
//! Every engine call receives the [`Instance`] it runs for: the tenant's
//! domain and secrets, the engine configuration, and the collaborators
//! (permission store, client registry, credential verifier). Nothing is
//! looked up from process-wide state.

#[cfg(feature = "jwt")]
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;

use crate::claims::{Audience, Claims, SecretKind};
use crate::clients::ClientRegistry;
use crate::config::PermissionsConfig;
use crate::error::PermissionResult;
#[cfg(feature = "jwt")]
use crate::jwt::JwtCodec;
use crate::jwt::CredentialVerifier;
use crate::store::PermissionStore;

const SESSION_SECRET_LEN: usize = 64;
const OAUTH_SECRET_LEN: usize = 128;
const CLI_SECRET_LEN: usize = 128;

/// Signing secrets of one instance.
#[derive(Clone)]
pub struct InstanceSecrets {
    session: Vec<u8>,
    oauth: Vec<u8>,
    cli: Vec<u8>,
}

impl std::fmt::Debug for InstanceSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceSecrets")
            .field("session", &"[REDACTED]")
            .field("oauth", &"[REDACTED]")
            .field("cli", &"[REDACTED]")
            .finish()
    }
}

impl InstanceSecrets {
    /// Create from existing secrets.
    pub fn new(session: Vec<u8>, oauth: Vec<u8>, cli: Vec<u8>) -> Self {
        Self { session, oauth, cli }
    }

    /// Draw fresh random secrets.
    pub fn generate() -> Self {
        Self {
            session: random_bytes(SESSION_SECRET_LEN),
            oauth: random_bytes(OAUTH_SECRET_LEN),
            cli: random_bytes(CLI_SECRET_LEN),
        }
    }

    /// Get a secret by kind.
    pub fn pick(&self, kind: SecretKind) -> &[u8] {
        match kind {
            SecretKind::Session => &self.session,
            SecretKind::OAuth => &self.oauth,
            SecretKind::Cli => &self.cli,
        }
    }

    /// Get the secret tokens of an audience are signed with.
    pub fn for_audience(&self, audience: Audience) -> &[u8] {
        self.pick(audience.secret_kind())
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// A tenant of the platform and the collaborators the engine uses for it.
#[derive(Clone)]
pub struct Instance {
    domain: String,
    secrets: InstanceSecrets,
    config: PermissionsConfig,
    store: Arc<dyn PermissionStore>,
    clients: Arc<dyn ClientRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("domain", &self.domain)
            .field("secrets", &self.secrets)
            .field("config", &self.config)
            .finish()
    }
}

impl Instance {
    /// Create an instance context with the default configuration.
    pub fn new(
        domain: impl Into<String>,
        secrets: InstanceSecrets,
        store: Arc<dyn PermissionStore>,
        clients: Arc<dyn ClientRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            domain: domain.into(),
            secrets,
            config: PermissionsConfig::default(),
            store,
            clients,
            verifier,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: PermissionsConfig) -> Self {
        self.config = config;
        self
    }

    /// Domain of the instance, also the issuer of its tokens.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Engine configuration.
    pub fn config(&self) -> &PermissionsConfig {
        &self.config
    }

    /// Signing secrets.
    pub fn secrets(&self) -> &InstanceSecrets {
        &self.secrets
    }

    /// Permission document store.
    pub fn store(&self) -> &dyn PermissionStore {
        self.store.as_ref()
    }

    /// OAuth client registry.
    pub fn clients(&self) -> &dyn ClientRegistry {
        self.clients.as_ref()
    }

    /// Verify and decode a bearer credential.
    pub fn decode(&self, bearer: &str) -> PermissionResult<Claims> {
        self.verifier.decode(bearer, &self.domain, &self.secrets)
    }

    /// Mint a token for this instance, signed with the audience's secret.
    #[cfg(feature = "jwt")]
    pub fn make_jwt(
        &self,
        audience: Audience,
        subject: &str,
        scope: &str,
        issued_at: DateTime<Utc>,
    ) -> PermissionResult<String> {
        let claims = Claims::new(audience, self.domain.clone(), subject)
            .with_scope(scope)
            .with_issued_at(issued_at);
        JwtCodec::new().encode(&claims, self.secrets.for_audience(audience))
    }

    /// Mint the token an installed application uses. App tokens carry no
    /// scope.
    #[cfg(feature = "jwt")]
    pub fn app_token(&self, slug: &str) -> PermissionResult<String> {
        self.make_jwt(Audience::App, slug, "", Utc::now())
    }

    /// Mint the bearer token a share recipient presents for a code.
    #[cfg(feature = "jwt")]
    pub fn share_token(&self, code: &str) -> PermissionResult<String> {
        self.make_jwt(Audience::Share, code, "", Utc::now())
    }
}

/// Build an instance backed by in-memory collaborators, returning handles
/// on the store and registry it shares.
#[cfg(all(test, feature = "jwt"))]
pub(crate) fn memory_instance(
    domain: &str,
) -> (
    Instance,
    crate::store::MemoryPermissionStore,
    crate::clients::MemoryClientRegistry,
) {
    let store = crate::store::MemoryPermissionStore::new();
    let clients = crate::clients::MemoryClientRegistry::new();
    let instance = Instance::new(
        domain,
        InstanceSecrets::generate(),
        Arc::new(store.clone()),
        Arc::new(clients.clone()),
        Arc::new(JwtCodec::new()),
    );
    (instance, store, clients)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secrets() {
        let a = InstanceSecrets::generate();
        let b = InstanceSecrets::generate();
        assert_eq!(a.pick(SecretKind::Session).len(), SESSION_SECRET_LEN);
        assert_eq!(a.pick(SecretKind::OAuth).len(), OAUTH_SECRET_LEN);
        assert_eq!(a.pick(SecretKind::Cli).len(), CLI_SECRET_LEN);
        assert_ne!(a.pick(SecretKind::OAuth), b.pick(SecretKind::OAuth));
    }

    #[test]
    fn test_secret_per_audience() {
        let secrets = InstanceSecrets::new(b"s".to_vec(), b"o".to_vec(), b"c".to_vec());
        assert_eq!(secrets.for_audience(Audience::App), b"s");
        assert_eq!(secrets.for_audience(Audience::Access), b"o");
        assert_eq!(secrets.for_audience(Audience::Refresh), b"o");
        assert_eq!(secrets.for_audience(Audience::Share), b"o");
        assert_eq!(secrets.for_audience(Audience::Cli), b"c");
    }

    #[test]
    fn test_debug_is_redacted() {
        let secrets = InstanceSecrets::new(b"session".to_vec(), b"oauth".to_vec(), b"cli".to_vec());
        let rendered = format!("{:?}", secrets);
        assert_eq!(rendered.matches("[REDACTED]").count(), 3);
    }

    #[cfg(feature = "jwt")]
    #[test]
    fn test_app_token_decodes() {
        let (instance, _, _) = memory_instance("alice.example.com");
        let token = instance.app_token("mini").unwrap();
        let claims = instance.decode(&token).unwrap();

        assert_eq!(claims.aud, Audience::App);
        assert_eq!(claims.sub, "mini");
        assert_eq!(claims.iss, "alice.example.com");
        assert!(claims.scope.is_empty());
    }

    #[cfg(feature = "jwt")]
    #[test]
    fn test_other_instance_rejects_token() {
        let (alice, _, _) = memory_instance("alice.example.com");
        let (bob, _, _) = memory_instance("bob.example.com");
        let token = alice.share_token("some-code").unwrap();
        assert!(bob.decode(&token).is_err());
    }
}
