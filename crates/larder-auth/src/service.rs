//! Authentication service: registration, login, and per-request
//! identity resolution.

use larder_core::error::{LarderError, LarderResult};
use larder_core::models::user::{CreateUser, Identity, User};
use larder_core::repository::{AuthorityRepository, UserRepository};
use larder_core::validate::validate_registration;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password::verify_password;
use crate::token::{extract_bearer, issue_access_token, validate_access_token};

/// Login request. The login key may be the account's email or its
/// username.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub login: String,
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Clone)]
pub struct LoginOutput {
    pub access_token: String,
    /// Seconds until the token expires.
    pub expires_in: u64,
    pub identity: Identity,
}

/// Authentication orchestration over the user and grant stores.
pub struct AuthService<U: UserRepository, A: AuthorityRepository> {
    users: U,
    authorities: A,
    config: AuthConfig,
}

impl<U: UserRepository, A: AuthorityRepository> AuthService<U, A> {
    pub fn new(users: U, authorities: A, config: AuthConfig) -> Self {
        Self {
            users,
            authorities,
            config,
        }
    }

    /// Register a new account. One of the two routes exempt from token
    /// validation.
    pub async fn register(&self, input: CreateUser) -> LarderResult<User> {
        // 1. Validate the input shape, reporting every violation.
        validate_registration(&input, self.config.min_password_length)?;

        // 2. Reject duplicate login keys with a conflict, not a DB error.
        match self.users.get_by_email(&input.email).await {
            Ok(_) => {
                return Err(LarderError::AlreadyExists {
                    entity: "user".into(),
                });
            }
            Err(LarderError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        match self.users.get_by_username(&input.username).await {
            Ok(_) => {
                return Err(LarderError::AlreadyExists {
                    entity: "user".into(),
                });
            }
            Err(LarderError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        // 3. Persist; the repository hashes the password.
        self.users.create(input).await
    }

    /// Authenticate by login key + password and issue a bearer token.
    pub async fn login(&self, input: LoginInput) -> LarderResult<LoginOutput> {
        // 1. Look up the user, by email first and username second.
        //    Unknown accounts get the same error as a wrong password.
        let user = match self.find_account(&input.login).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials.into()),
        };

        // 2. Verify the password.
        let ok = verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !ok {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Summarize the authority kinds held across all groups into
        //    the token's role claim.
        let kinds = self.authorities.kinds_for_user(user.id).await?;

        // 4. Issue the token.
        let identity = Identity::of(&user);
        let access_token = issue_access_token(&identity, &kinds, &self.config)?;

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            identity,
        })
    }

    async fn find_account(&self, login: &str) -> LarderResult<Option<User>> {
        match self.users.get_by_email(login).await {
            Ok(user) => return Ok(Some(user)),
            Err(LarderError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        match self.users.get_by_username(login).await {
            Ok(user) => Ok(Some(user)),
            Err(LarderError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Resolve the caller for one request from an optional
    /// `Authorization` header value.
    ///
    /// No header means an anonymous request, which is not an error by
    /// itself — operations that need authority reject it later. A
    /// header that is present but unusable always fails.
    pub async fn authenticate(&self, header: Option<&str>) -> LarderResult<Option<Identity>> {
        let Some(header) = header else {
            return Ok(None);
        };

        let token = extract_bearer(header).ok_or(AuthError::MalformedHeader)?;
        let claims = validate_access_token(token, &self.config)?.0;

        // The subject is the login email; resolve it to the current
        // account so downstream sees a stable user id.
        let user = match self.users.get_by_email(&claims.sub).await {
            Ok(user) => user,
            Err(LarderError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("unknown subject".into()).into());
            }
            Err(e) => return Err(e),
        };

        Ok(Some(Identity::of(&user)))
    }
}
