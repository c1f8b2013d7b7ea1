//! Opaque bearer tokens
//!
//! Tokens are 32 random bytes, base64url encoded. The database keeps only
//! their md5 digest. Refresh tokens are single use: refreshing revokes the
//! presented token and issues a new pair.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sqlx::PgPool;

use super::AuthError;
use crate::db::{TokenKind, TokenLookup, TokenRepo, User, UserRepo};

const TOKEN_BYTES: usize = 32;

/// Token lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(60 * 60),
            refresh_ttl: Duration::from_secs(14 * 24 * 60 * 60),
        }
    }
}

/// Tokens handed to a client after login or refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    format!("{:x}", md5::compute(token.as_bytes()))
}

/// Token issuing and verification
pub struct TokenService<'a> {
    pool: &'a PgPool,
    settings: TokenSettings,
}

impl<'a> TokenService<'a> {
    pub fn new(pool: &'a PgPool, settings: TokenSettings) -> Self {
        Self { pool, settings }
    }

    pub async fn issue_pair(&self, user_id: i64) -> Result<TokenPair, AuthError> {
        let repo = TokenRepo::new(self.pool);
        let now = Utc::now();

        let access_token = generate_token();
        let refresh_token = generate_token();

        repo.insert(
            &token_digest(&access_token),
            user_id,
            TokenKind::Access,
            expiry(now, self.settings.access_ttl),
        )
        .await?;
        repo.insert(
            &token_digest(&refresh_token),
            user_id,
            TokenKind::Refresh,
            expiry(now, self.settings.refresh_ttl),
        )
        .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.settings.access_ttl.as_secs(),
        })
    }

    /// Resolve an access token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let lookup = TokenRepo::new(self.pool)
            .lookup_access(&token_digest(token))
            .await?;

        let user_id = match lookup {
            TokenLookup::Valid { user_id } => user_id,
            TokenLookup::Expired => return Err(AuthError::ExpiredToken),
            TokenLookup::Reused | TokenLookup::Unknown => return Err(AuthError::InvalidToken),
        };

        active_user(self.pool, user_id, AuthError::UserNotFound).await
    }

    /// Trade a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AuthError> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::RefreshMissing);
        }

        let lookup = TokenRepo::new(self.pool)
            .consume_refresh(&token_digest(refresh_token.trim()))
            .await?;

        let user_id = match lookup {
            TokenLookup::Valid { user_id } => user_id,
            TokenLookup::Expired => return Err(AuthError::RefreshExpired),
            TokenLookup::Reused => {
                tracing::warn!("refresh token reuse detected");
                return Err(AuthError::RefreshReused);
            }
            TokenLookup::Unknown => return Err(AuthError::RefreshInvalid),
        };

        let user = active_user(self.pool, user_id, AuthError::RefreshInvalid).await?;
        let pair = self.issue_pair(user.id).await?;
        tracing::debug!(user_id = user.id, "token pair rotated");
        Ok((user, pair))
    }
}

async fn active_user(pool: &PgPool, user_id: i64, missing: AuthError) -> Result<User, AuthError> {
    let user = match UserRepo::new(pool).get(user_id).await {
        Ok(user) => user,
        Err(crate::db::DbError::NotFound { .. }) => return Err(missing),
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(AuthError::UserInactive);
    }
    Ok(user)
}

/// `now + ttl`, saturating at the latest representable time.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn digest_is_md5_hex() {
        assert_eq!(token_digest("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn expiry_saturates() {
        let now = Utc::now();
        assert_eq!(expiry(now, Duration::from_secs(60)), now + chrono::Duration::seconds(60));
        assert_eq!(expiry(now, Duration::from_secs(u64::MAX)), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn default_lifetimes() {
        let settings = TokenSettings::default();
        assert!(settings.access_ttl < settings.refresh_ttl);
    }
}
