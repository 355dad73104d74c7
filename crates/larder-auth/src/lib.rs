//! Larder Auth — password authentication, HMAC token
//! issuance/validation, and per-group access guarding.

pub mod config;
pub mod error;
pub mod guard;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::{AccessGuard, require_identity};
pub use service::{AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
