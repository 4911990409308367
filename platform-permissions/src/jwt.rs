//! JWT credential encoding and verification
//!
//! Bearer credentials are HS256 JWTs signed with the instance secret picked
//! by their audience. Verification first reads the `aud` claim without
//! trusting it, picks the matching secret, then checks the signature, the
//! audience and the issuer for real.

#[cfg(feature = "jwt")]
use jsonwebtoken::errors::ErrorKind;
#[cfg(feature = "jwt")]
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
#[cfg(feature = "jwt")]
use serde::Deserialize;
#[cfg(feature = "jwt")]
use tracing::debug;

use crate::claims::Claims;
#[cfg(feature = "jwt")]
use crate::claims::Audience;
use crate::context::InstanceSecrets;
#[cfg(feature = "jwt")]
use crate::error::PermissionError;
use crate::error::PermissionResult;

/// Decodes bearer strings into verified claims.
pub trait CredentialVerifier: Send + Sync {
    /// Verify `bearer` against the instance `issuer` and its secrets.
    fn decode(&self, bearer: &str, issuer: &str, secrets: &InstanceSecrets) -> PermissionResult<Claims>;
}

/// HS256 codec backed by the jsonwebtoken crate.
#[cfg(feature = "jwt")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtCodec;

#[cfg(feature = "jwt")]
#[derive(Deserialize)]
struct UntrustedAudience {
    aud: String,
}

#[cfg(feature = "jwt")]
impl JwtCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }

    /// Sign claims with a secret.
    pub fn encode(&self, claims: &Claims, secret: &[u8]) -> PermissionResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret))
            .map_err(|e| PermissionError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Read the audience without checking the signature.
    fn peek_audience(&self, bearer: &str) -> PermissionResult<Audience> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data: TokenData<UntrustedAudience> =
            decode(bearer, &DecodingKey::from_secret(&[]), &validation).map_err(|e| {
                debug!(error = %e, "Bearer credential is not a JWT");
                PermissionError::InvalidToken
            })?;

        Audience::parse(&token_data.claims.aud).ok_or_else(|| {
            debug!(audience = %token_data.claims.aud, "Bearer credential has an unknown audience");
            PermissionError::InvalidToken
        })
    }
}

#[cfg(feature = "jwt")]
impl CredentialVerifier for JwtCodec {
    fn decode(&self, bearer: &str, issuer: &str, secrets: &InstanceSecrets) -> PermissionResult<Claims> {
        let audience = self.peek_audience(bearer)?;
        let secret = secrets.for_audience(audience);
        if secret.is_empty() {
            debug!(audience = %audience, "Instance has no secret for audience");
            return Err(PermissionError::InvalidToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.set_audience(&[audience.as_str()]);
        validation.set_issuer(&[issuer]);

        let token_data: TokenData<Claims> = decode(bearer, &DecodingKey::from_secret(secret), &validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidToken => "malformed token",
                    ErrorKind::InvalidSignature => "invalid signature",
                    ErrorKind::InvalidIssuer => "invalid issuer",
                    ErrorKind::InvalidAudience => "invalid audience",
                    _ => "undecodable claims",
                };
                debug!(reason, audience = %audience, "Rejected bearer credential");
                PermissionError::InvalidToken
            })?;

        Ok(token_data.claims)
    }
}
