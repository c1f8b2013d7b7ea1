//! Issued bearer and refresh tokens
//!
//! Only digests are stored; the opaque token itself is returned to the
//! client once and never persisted.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Outcome of looking up (and consuming) a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    /// Token was live; for refresh tokens it is now revoked
    Valid { user_id: i64 },
    Expired,
    /// Refresh token was already rotated once
    Reused,
    Unknown,
}

const PURGE_STALE_SQL: &str = r#"
    DELETE FROM user_tokens
    WHERE user_id = $1
      AND revoked_at IS NOT NULL
      AND (kind = 'access' OR expires_at <= NOW())
"#;

/// Token repository
pub struct TokenRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        digest: &str,
        user_id: i64,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (token_digest, user_id, kind, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(digest)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Resolve an access token digest without consuming it.
    pub async fn lookup_access(&self, digest: &str) -> Result<TokenLookup, DbError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, expires_at, revoked_at
            FROM user_tokens
            WHERE token_digest = $1 AND kind = 'access'
            "#,
        )
        .bind(digest)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(TokenLookup::Unknown);
        };

        let revoked_at: Option<DateTime<Utc>> = row.get("revoked_at");
        let expires_at: DateTime<Utc> = row.get("expires_at");
        if revoked_at.is_some() {
            return Ok(TokenLookup::Unknown);
        }
        if expires_at <= Utc::now() {
            return Ok(TokenLookup::Expired);
        }
        Ok(TokenLookup::Valid {
            user_id: row.get("user_id"),
        })
    }

    /// Consume a refresh token.
    ///
    /// The revoke is a single conditional UPDATE, so two concurrent refreshes
    /// with the same token cannot both succeed.
    pub async fn consume_refresh(&self, digest: &str) -> Result<TokenLookup, DbError> {
        let consumed = sqlx::query(
            r#"
            UPDATE user_tokens SET revoked_at = NOW()
            WHERE token_digest = $1 AND kind = 'refresh' AND revoked_at IS NULL
            RETURNING user_id, expires_at
            "#,
        )
        .bind(digest)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = consumed {
            let expires_at: DateTime<Utc> = row.get("expires_at");
            if expires_at <= Utc::now() {
                return Ok(TokenLookup::Expired);
            }
            return Ok(TokenLookup::Valid {
                user_id: row.get("user_id"),
            });
        }

        let known = sqlx::query(
            "SELECT 1 AS present FROM user_tokens WHERE token_digest = $1 AND kind = 'refresh'",
        )
        .bind(digest)
        .fetch_optional(self.pool)
        .await?;

        Ok(if known.is_some() {
            TokenLookup::Reused
        } else {
            TokenLookup::Unknown
        })
    }

    /// Drop a user's tokens that can no longer be used.
    ///
    /// Expired tokens that were never revoked stay, so presenting one still
    /// reports `Expired` instead of `Unknown`. Consuming an expired refresh
    /// token revokes it, which makes it eligible on the next purge.
    pub async fn purge_stale(&self, user_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query(PURGE_STALE_SQL)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn purge_never_touches_unrevoked_tokens() {
        let sql = PURGE_STALE_SQL.to_ascii_lowercase();
        assert!(sql.contains("and revoked_at is not null\n"));
        assert!(!sql.contains("expires_at <= now() or"));
    }

    // Run with: DATABASE_URL=postgres://... cargo test -p studyquiz-server -- --ignored
    #[tokio::test]
    #[ignore = "requires database"]
    async fn expired_refresh_survives_purge() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::migrations::run(&pool).await.expect("migrations");

        let identifier = format!("purge-{}", uuid::Uuid::new_v4());
        let user = crate::db::UserRepo::new(&pool)
            .create(crate::db::NewUser {
                identifier: &identifier,
                username: "purge",
                email: None,
                provider: "native",
                password_digest: None,
            })
            .await
            .expect("insert user")
            .expect("fresh identifier");

        let repo = TokenRepo::new(&pool);
        let digest = format!("expired-{}", uuid::Uuid::new_v4());
        repo.insert(&digest, user.id, TokenKind::Refresh, Utc::now() - Duration::hours(1))
            .await
            .expect("insert");

        repo.purge_stale(user.id).await.expect("purge");
        assert_eq!(
            repo.consume_refresh(&digest).await.expect("consume"),
            TokenLookup::Expired
        );

        // consumed and expired: now eligible
        assert_eq!(repo.purge_stale(user.id).await.expect("purge"), 1);
        assert_eq!(
            repo.consume_refresh(&digest).await.expect("consume"),
            TokenLookup::Unknown
        );
    }
}
