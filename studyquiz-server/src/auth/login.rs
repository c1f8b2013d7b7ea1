//! Login flows: native password accounts and remote identity providers
//!
//! Both create the user on first login and return a fresh token pair.

use serde::Deserialize;
use sqlx::PgPool;

use super::password::{hash_password, verify_password, DEFAULT_COST};
use super::providers::{IdentityProviders, NATIVE_PROVIDER};
use super::tokens::{TokenPair, TokenService, TokenSettings};
use super::AuthError;
use crate::db::{DbError, NewUser, User, UserRepo};
use crate::models::ValidationError;

const MAX_IDENTIFIER_LEN: usize = 150;

/// Login request body; which fields apply depends on the provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub identifier: Option<String>,
    pub password: Option<String>,
    pub id_token: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<DbError> for LoginError {
    fn from(e: DbError) -> Self {
        Self::Auth(AuthError::from(e))
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
    /// First login for this identity
    pub created: bool,
}

/// Log in through `provider`, registering the user on first contact.
pub async fn login(
    pool: &PgPool,
    providers: &IdentityProviders,
    settings: TokenSettings,
    provider: &str,
    req: LoginRequest,
) -> Result<LoginOutcome, LoginError> {
    let provider = provider.trim().to_lowercase();
    let (user, created) = if provider == NATIVE_PROVIDER {
        native_user(pool, &req).await?
    } else {
        remote_user(pool, providers, &provider, &req).await?
    };

    if !user.is_active {
        return Err(AuthError::UserInactive.into());
    }

    let tokens = TokenService::new(pool, settings).issue_pair(user.id).await?;
    if let Err(e) = crate::db::TokenRepo::new(pool).purge_stale(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "failed to purge stale tokens");
    }

    tracing::info!(user_id = user.id, provider = %provider, created, "login");
    Ok(LoginOutcome {
        user,
        tokens,
        created,
    })
}

async fn native_user(pool: &PgPool, req: &LoginRequest) -> Result<(User, bool), LoginError> {
    let login_name = required(req.identifier.as_deref(), "identifier")?;
    if login_name.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: "identifier",
            max: MAX_IDENTIFIER_LEN,
        }
        .into());
    }
    let password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::Missing { field: "password" })?;

    let identifier = scoped_identifier(NATIVE_PROVIDER, login_name);
    let repo = UserRepo::new(pool);

    if let Some(user) = repo.find_by_identifier(&identifier).await? {
        check_password(pool, &user, password).await?;
        return Ok((user, false));
    }

    let digest = hash_password(password, DEFAULT_COST)?;
    let created = repo
        .create(NewUser {
            identifier: &identifier,
            username: req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).unwrap_or(login_name),
            email: None,
            provider: NATIVE_PROVIDER,
            password_digest: Some(&digest),
        })
        .await?;

    match created {
        Some(user) => Ok((user, true)),
        // registered concurrently; treat as a normal login
        None => {
            let user = repo
                .find_by_identifier(&identifier)
                .await?
                .ok_or(AuthError::CredentialsRejected)?;
            check_password(pool, &user, password).await?;
            Ok((user, false))
        }
    }
}

async fn check_password(pool: &PgPool, user: &User, password: &str) -> Result<(), LoginError> {
    let creds = UserRepo::new(pool).credentials(user.id).await?;
    match creds.password_digest {
        Some(digest) if verify_password(password, &digest) => Ok(()),
        _ => Err(AuthError::CredentialsRejected.into()),
    }
}

async fn remote_user(
    pool: &PgPool,
    providers: &IdentityProviders,
    provider: &str,
    req: &LoginRequest,
) -> Result<(User, bool), LoginError> {
    let verifier = providers.get(provider)?;
    let id_token = required(req.id_token.as_deref(), "id_token")?;
    let identity = verifier.verify(id_token).await?;

    let identifier = scoped_identifier(provider, &identity.subject);
    let repo = UserRepo::new(pool);
    let existed = repo.find_by_identifier(&identifier).await?.is_some();

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or(identity.name.as_deref())
        .unwrap_or("");

    let user = repo
        .upsert_remote(NewUser {
            identifier: &identifier,
            username: name,
            email: identity.email.as_deref(),
            provider,
            password_digest: None,
        })
        .await?;

    Ok((user, !existed))
}

/// Identifiers are unique across providers: `{provider}:{subject}`.
pub fn scoped_identifier(provider: &str, subject: &str) -> String {
    format!("{}:{}", provider, subject.trim())
}

fn required<'r>(value: Option<&'r str>, field: &'static str) -> Result<&'r str, ValidationError> {
    match value.map(str::trim) {
        None => Err(ValidationError::Missing { field }),
        Some("") => Err(ValidationError::Empty { field }),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_provider_scoped() {
        assert_eq!(scoped_identifier("native", " alice "), "native:alice");
        assert_ne!(
            scoped_identifier("native", "abc"),
            scoped_identifier("firebase", "abc")
        );
    }

    #[test]
    fn database_errors_surface_through_auth() {
        let err = LoginError::from(DbError::not_found("user", 7));
        assert!(matches!(
            err,
            LoginError::Auth(AuthError::Database(DbError::NotFound { resource: "user", .. }))
        ));
    }

    #[test]
    fn required_fields() {
        assert!(matches!(
            required(None, "id_token"),
            Err(ValidationError::Missing { field: "id_token" })
        ));
        assert!(matches!(
            required(Some("  "), "identifier"),
            Err(ValidationError::Empty { .. })
        ));
        assert_eq!(required(Some(" bob "), "identifier").unwrap(), "bob");
    }
}
