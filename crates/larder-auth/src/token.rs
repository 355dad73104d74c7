//! Bearer token issuance and verification.
//!
//! Tokens are HS256-signed JWTs carrying the subject's login email and
//! a summary of the authority kinds held at issuance time. Verification
//! is purely stateless — no session store exists, so any worker can
//! validate any token from the shared secret alone.

use std::collections::BTreeSet;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use larder_core::models::authority::AuthorityKind;
use larder_core::models::user::Identity;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject — the identity's login email.
    pub sub: String,
    /// Comma-joined authority kinds known at issuance time.
    pub role: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp), exactly one lifetime after `iat`.
    pub exp: i64,
}

impl AccessTokenClaims {
    /// Parse the role claim back into the authority-kind set.
    ///
    /// An empty claim is a valid empty set; an unknown kind name means
    /// the token was not minted by us.
    pub fn authority_kinds(&self) -> Result<BTreeSet<AuthorityKind>, AuthError> {
        let mut kinds = BTreeSet::new();
        for part in self.role.split(',').filter(|p| !p.is_empty()) {
            let kind = AuthorityKind::parse(part)
                .ok_or_else(|| AuthError::TokenInvalid(format!("unknown authority: {part}")))?;
            kinds.insert(kind);
        }
        Ok(kinds)
    }
}

fn join_kinds(kinds: &BTreeSet<AuthorityKind>) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Issue a signed HS256 access token for an authenticated identity.
pub fn issue_access_token(
    identity: &Identity,
    kinds: &BTreeSet<AuthorityKind>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: identity.email.clone(),
        role: join_kinds(kinds),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
    };

    let key = EncodingKey::from_secret(config.token_secret.as_bytes());
    let header = Header::new(Algorithm::HS256);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an HS256 access token.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(config.token_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["sub", "exp", "iat"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Validated JWT claims — a newtype proving the token was verified.
#[derive(Debug, Clone)]
pub struct ValidatedClaims(pub AccessTokenClaims);

/// Validate an access token (signature, expiry) and return the
/// verified claims.
///
/// This is the entry point for request-level authentication. It is
/// purely stateless — no database lookup is performed.
pub fn validate_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<ValidatedClaims, AuthError> {
    decode_access_token(token, config).map(ValidatedClaims)
}

/// Pull the raw token out of an `Authorization: Bearer <token>` value.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
