//! User repository
//!
//! Users are keyed by `identifier`: the provider subject for remote logins,
//! the login name for native accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use super::DbError;

/// User record from database (secrets excluded)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub identifier: String,
    pub username: String,
    pub email: Option<String>,
    pub provider: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored password material of a native account
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    /// bcrypt string, `None` for remote accounts
    pub password_digest: Option<String>,
}

/// Fields for creating or refreshing a user at login
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub identifier: &'a str,
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub provider: &'a str,
    pub password_digest: Option<&'a str>,
}

const USER_COLUMNS: &str =
    "id, identifier, username, email, provider, is_active, created_at, updated_at";

/// User repository
pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE identifier = $1"
        ))
        .bind(identifier)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    pub async fn credentials(&self, id: i64) -> Result<UserCredentials, DbError> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_digest FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Insert a user unless the identifier is taken.
    ///
    /// Returns `None` when another request registered the identifier first.
    pub async fn create(&self, new: NewUser<'_>) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (identifier, username, email, provider, password_digest)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (identifier) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.identifier)
        .bind(new.username)
        .bind(new.email)
        .bind(new.provider)
        .bind(new.password_digest)
        .fetch_optional(self.pool)
        .await?;

        if let Some(user) = &user {
            tracing::info!(user_id = user.id, provider = %user.provider, "user registered");
        }
        Ok(user)
    }

    /// Create or refresh a user verified by a remote identity provider.
    ///
    /// Profile fields the provider omits keep their stored values.
    pub async fn upsert_remote(&self, new: NewUser<'_>) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (identifier, username, email, provider)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identifier) DO UPDATE SET
                username = CASE WHEN EXCLUDED.username = '' THEN users.username
                                ELSE EXCLUDED.username END,
                email = COALESCE(EXCLUDED.email, users.email),
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.identifier)
        .bind(new.username)
        .bind(new.email)
        .bind(new.provider)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Delete a user. Projects, tokens and answers go with it via cascade.
    pub async fn delete(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        tracing::info!(user_id = id, "user withdrawn");
        Ok(())
    }
}
