//! Capability token claims
//!
//! This module defines the decoded content of a bearer credential and the
//! closed set of audiences a credential can be issued for. Each audience
//! carries a fixed policy: which instance secret signs it, where its grants
//! come from, and whether it goes stale.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Audience of a capability token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Token given to an installed application
    App,
    /// OAuth access token of an external client
    Access,
    /// OAuth refresh token, only good for getting a new access token
    Refresh,
    /// Token of a share recipient, naming a stored permission or code
    Share,
    /// Token of the command line tool
    Cli,
}

/// Instance secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Session secret, also used for app tokens
    Session,
    /// OAuth secret, for access, refresh and share tokens
    OAuth,
    /// Command line secret
    Cli,
}

/// Where the rule set of a token comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantSource {
    /// Parsed from the token's own `scope` claim
    InlineScope,
    /// Loaded from a stored permission document
    StoredDocument,
    /// The token grants nothing by itself
    Nothing,
}

/// Validity policy applied on top of the signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Token is valid regardless of its age
    Never,
    /// Token expires once older than the configured access token window
    AccessTokenWindow,
}

impl Audience {
    /// Get the string representation, as found in the `aud` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::App => "app",
            Audience::Access => "access",
            Audience::Refresh => "refresh",
            Audience::Share => "share",
            Audience::Cli => "cli",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "app" => Some(Audience::App),
            "access" => Some(Audience::Access),
            "refresh" => Some(Audience::Refresh),
            "share" => Some(Audience::Share),
            "cli" => Some(Audience::Cli),
            _ => None,
        }
    }

    /// Secret the token must be signed with.
    pub fn secret_kind(&self) -> SecretKind {
        match self {
            Audience::App => SecretKind::Session,
            Audience::Access | Audience::Refresh | Audience::Share => SecretKind::OAuth,
            Audience::Cli => SecretKind::Cli,
        }
    }

    /// Where the token's grants come from.
    pub fn grant_source(&self) -> GrantSource {
        match self {
            Audience::App | Audience::Access | Audience::Cli => GrantSource::InlineScope,
            Audience::Share => GrantSource::StoredDocument,
            Audience::Refresh => GrantSource::Nothing,
        }
    }

    /// Age policy of the token.
    pub fn staleness(&self) -> Staleness {
        match self {
            Audience::Access => Staleness::AccessTokenWindow,
            _ => Staleness::Never,
        }
    }

    /// Check if the subject must be a registered OAuth client.
    pub fn requires_registered_client(&self) -> bool {
        matches!(self, Audience::Access)
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded capability token.
///
/// # Example
///
/// ```rust
/// use platform_permissions::claims::{Audience, Claims};
///
/// let claims = Claims::new(Audience::Access, "alice.example.com", "client-1")
///     .with_scope("io.cozy.contacts io.cozy.files:GET");
/// assert_eq!(claims.aud, Audience::Access);
/// assert!(!claims.is_stale(chrono::Duration::days(7), chrono::Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Audience
    pub aud: Audience,

    /// Issuer: the domain of the instance
    pub iss: String,

    /// Subject: client id, app slug, permission id or share code
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Inline rules, space separated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

impl Claims {
    /// Create claims issued now, with an empty scope.
    pub fn new(aud: Audience, issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            aud,
            iss: issuer.into(),
            sub: subject.into(),
            iat: Utc::now().timestamp(),
            scope: String::new(),
        }
    }

    /// Set the inline scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Set the issue time.
    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.iat = issued_at.timestamp();
        self
    }

    /// Get issue time as DateTime.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    /// Check if the token is older than `max_age` at `now`.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.issued_at()) > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_round_trip() {
        for aud in [
            Audience::App,
            Audience::Access,
            Audience::Refresh,
            Audience::Share,
            Audience::Cli,
        ] {
            assert_eq!(Audience::parse(aud.as_str()), Some(aud));
            let json = serde_json::to_string(&aud).unwrap();
            assert_eq!(json, format!("\"{}\"", aud.as_str()));
        }
        assert_eq!(Audience::parse("admin"), None);
    }

    #[test]
    fn test_audience_policies() {
        assert_eq!(Audience::App.secret_kind(), SecretKind::Session);
        assert_eq!(Audience::Access.secret_kind(), SecretKind::OAuth);
        assert_eq!(Audience::Refresh.secret_kind(), SecretKind::OAuth);
        assert_eq!(Audience::Share.secret_kind(), SecretKind::OAuth);
        assert_eq!(Audience::Cli.secret_kind(), SecretKind::Cli);

        assert_eq!(Audience::Access.staleness(), Staleness::AccessTokenWindow);
        assert_eq!(Audience::Share.staleness(), Staleness::Never);
        assert_eq!(Audience::App.staleness(), Staleness::Never);

        assert_eq!(Audience::Share.grant_source(), GrantSource::StoredDocument);
        assert_eq!(Audience::Cli.grant_source(), GrantSource::InlineScope);
        assert_eq!(Audience::Refresh.grant_source(), GrantSource::Nothing);
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let fresh = Claims::new(Audience::Access, "example.com", "c1");
        assert!(!fresh.is_stale(Duration::days(7), now));

        let old = Claims::new(Audience::Access, "example.com", "c1")
            .with_issued_at(now - Duration::days(30));
        assert!(old.is_stale(Duration::days(7), now));
        assert_eq!(old.issued_at().timestamp(), (now - Duration::days(30)).timestamp());
    }

    #[test]
    fn test_empty_scope_is_omitted() {
        let claims = Claims::new(Audience::App, "example.com", "mini");
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("scope").is_none());
        assert_eq!(json["aud"], "app");
    }
}
