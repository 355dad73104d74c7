//! Authentication configuration.

/// Configuration for the authentication service.
///
/// Injected once at startup and read-only thereafter; the signing
/// secret is never rotated at runtime.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for HMAC (HS256) token signing and verification.
    pub token_secret: String,
    /// Access token lifetime in seconds (default: 3600 = 1 hour).
    pub access_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            access_token_lifetime_secs: 3600,
            pepper: None,
            min_password_length: 8,
        }
    }
}
