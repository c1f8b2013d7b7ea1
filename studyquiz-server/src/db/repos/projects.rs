//! Project repository
//!
//! Handles project CRUD scoped to the owning user:
//! - list/get: LEFT JOIN with material count and last activity (no N+1)
//! - update: CTE + COALESCE so PUT and PATCH share one statement
//! - delete: returns stored object keys of the cascaded materials

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use sqlx::postgres::PgRow;

use super::DbError;
use crate::models::{ProjectColor, ProjectName};

/// Project with its material aggregate, as every endpoint returns it
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub material_count: i64,
    /// Newest material creation time, or the project's own update time
    pub last_activity_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    fn from_row(r: &PgRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            name: r.get("name"),
            color: r.get("color"),
            material_count: r.get("material_count"),
            last_activity_date: r.get("last_activity_date"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// Requested changes; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<ProjectName>,
    pub color: Option<ProjectColor>,
}

/// Project repository
pub struct ProjectRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's projects, most recently updated first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Project>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.id, p.user_id, p.name, p.color, p.created_at, p.updated_at,
                COUNT(m.id) AS material_count,
                COALESCE(MAX(m.created_at), p.updated_at) AS last_activity_date
            FROM projects p
            LEFT JOIN materials m ON m.project_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id
            ORDER BY p.updated_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.iter().map(Project::from_row).collect())
    }

    pub async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Project, DbError> {
        let row = sqlx::query(
            r#"
            SELECT
                p.id, p.user_id, p.name, p.color, p.created_at, p.updated_at,
                COUNT(m.id) AS material_count,
                COALESCE(MAX(m.created_at), p.updated_at) AS last_activity_date
            FROM projects p
            LEFT JOIN materials m ON m.project_id = p.id
            WHERE p.id = $1 AND p.user_id = $2
            GROUP BY p.id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("project", id))?;

        Ok(Project::from_row(&row))
    }

    /// Fail with not-found unless the project belongs to the user.
    pub async fn ensure_owned(&self, id: i64, user_id: i64) -> Result<(), DbError> {
        let owned = sqlx::query("SELECT 1 AS owned FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        match owned {
            Some(_) => Ok(()),
            None => Err(DbError::not_found("project", id)),
        }
    }

    pub async fn create(
        &self,
        user_id: i64,
        name: ProjectName,
        color: ProjectColor,
    ) -> Result<Project, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO projects (user_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, color, created_at, updated_at,
                      0::BIGINT AS material_count, updated_at AS last_activity_date
            "#,
        )
        .bind(user_id)
        .bind(name.as_str())
        .bind(color.as_str())
        .fetch_one(self.pool)
        .await?;

        let project = Project::from_row(&row);
        tracing::info!(project_id = project.id, user_id, "project created");
        Ok(project)
    }

    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        changes: ProjectChanges,
    ) -> Result<Project, DbError> {
        let row = sqlx::query(
            r#"
            WITH updated AS (
                UPDATE projects SET
                    name = COALESCE($3, name),
                    color = COALESCE($4, color),
                    updated_at = NOW()
                WHERE id = $1 AND user_id = $2
                RETURNING id, user_id, name, color, created_at, updated_at
            )
            SELECT
                u.id, u.user_id, u.name, u.color, u.created_at, u.updated_at,
                COUNT(m.id) AS material_count,
                COALESCE(MAX(m.created_at), u.updated_at) AS last_activity_date
            FROM updated u
            LEFT JOIN materials m ON m.project_id = u.id
            GROUP BY u.id, u.user_id, u.name, u.color, u.created_at, u.updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.name.as_ref().map(ProjectName::as_str))
        .bind(changes.color.as_ref().map(ProjectColor::as_str))
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("project", id))?;

        Ok(Project::from_row(&row))
    }

    /// Delete a project and everything under it.
    ///
    /// Returns the object-storage keys held by its materials so the caller
    /// can remove the stored files after the rows are gone.
    pub async fn delete(&self, id: i64, user_id: i64) -> Result<Vec<String>, DbError> {
        let mut tx = self.pool.begin().await?;

        let keys: Vec<String> = sqlx::query(
            r#"
            SELECT k.key
            FROM materials m
            JOIN projects p ON p.id = m.project_id
            CROSS JOIN LATERAL (
                VALUES (m.metadata->>'storage_key'), (m.metadata->>'thumbnail_key')
            ) AS k(key)
            WHERE p.id = $1 AND p.user_id = $2 AND k.key IS NOT NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|r| r.get("key"))
        .collect();

        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("project", id));
        }

        tx.commit().await?;
        tracing::info!(project_id = id, user_id, stored_objects = keys.len(), "project deleted");
        Ok(keys)
    }
}
