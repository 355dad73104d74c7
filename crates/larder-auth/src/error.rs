//! Authentication error types.

use larder_core::error::LarderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for LarderError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::MalformedHeader => LarderError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => LarderError::Crypto(msg),
        }
    }
}
