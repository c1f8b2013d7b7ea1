//! Material repository
//!
//! Materials are reached through their project, so every query joins
//! `projects` to check ownership.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DbError;
use crate::models::{MaterialTitle, MaterialType};

/// Material record from database
#[derive(Debug, Clone, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub project_id: i64,
    pub title: String,
    pub material_type: String,
    pub url: Option<String>,
    pub page_count: i32,
    pub thumbnail_url: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    /// Object-storage keys owned by this material.
    pub fn storage_keys(&self) -> Vec<String> {
        ["storage_key", "thumbnail_key"]
            .iter()
            .filter_map(|k| self.metadata.get(*k).and_then(Value::as_str))
            .map(str::to_owned)
            .collect()
    }
}

/// Fields for a new material
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub project_id: i64,
    pub title: MaterialTitle,
    pub material_type: MaterialType,
    pub url: Option<String>,
    pub page_count: i32,
    pub thumbnail_url: Option<String>,
    pub metadata: Value,
}

/// Requested changes; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct MaterialChanges {
    pub title: Option<MaterialTitle>,
    pub page_count: Option<i32>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
}

const MATERIAL_COLUMNS: &str = "m.id, m.project_id, m.title, m.material_type, m.url, \
     m.page_count, m.thumbnail_url, m.metadata, m.created_at, m.updated_at";

/// Material repository
pub struct MaterialRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MaterialRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List materials of a project, newest first. Caller checks ownership.
    pub async fn list_for_project(&self, project_id: i64) -> Result<Vec<Material>, DbError> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            r#"
            SELECT {MATERIAL_COLUMNS}
            FROM materials m
            WHERE m.project_id = $1
            ORDER BY m.created_at DESC, m.id
            "#
        ))
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;
        Ok(materials)
    }

    pub async fn get_for_user(&self, id: Uuid, user_id: i64) -> Result<Material, DbError> {
        sqlx::query_as::<_, Material>(&format!(
            r#"
            SELECT {MATERIAL_COLUMNS}
            FROM materials m
            JOIN projects p ON p.id = m.project_id
            WHERE m.id = $1 AND p.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("material", id))
    }

    pub async fn create(&self, new: NewMaterial) -> Result<Material, DbError> {
        let material = sqlx::query_as::<_, Material>(
            r#"
            INSERT INTO materials AS m
                (project_id, title, material_type, url, page_count, thumbnail_url, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING m.id, m.project_id, m.title, m.material_type, m.url,
                      m.page_count, m.thumbnail_url, m.metadata, m.created_at, m.updated_at
            "#,
        )
        .bind(new.project_id)
        .bind(new.title.as_str())
        .bind(new.material_type.as_str())
        .bind(new.url)
        .bind(new.page_count)
        .bind(new.thumbnail_url)
        .bind(new.metadata)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(
            material_id = %material.id,
            project_id = material.project_id,
            material_type = %material.material_type,
            "material created"
        );
        Ok(material)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: i64,
        changes: MaterialChanges,
    ) -> Result<Material, DbError> {
        sqlx::query_as::<_, Material>(
            r#"
            UPDATE materials AS m SET
                title = COALESCE($3, m.title),
                page_count = COALESCE($4, m.page_count),
                thumbnail_url = COALESCE($5, m.thumbnail_url),
                url = COALESCE($6, m.url),
                updated_at = NOW()
            FROM projects p
            WHERE m.id = $1 AND p.id = m.project_id AND p.user_id = $2
            RETURNING m.id, m.project_id, m.title, m.material_type, m.url,
                      m.page_count, m.thumbnail_url, m.metadata, m.created_at, m.updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(changes.title.as_ref().map(MaterialTitle::as_str))
        .bind(changes.page_count)
        .bind(changes.thumbnail_url)
        .bind(changes.url)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("material", id))
    }

    /// Delete a material, returning the removed row so its stored objects
    /// can be cleaned up.
    pub async fn delete(&self, id: Uuid, user_id: i64) -> Result<Material, DbError> {
        let material = sqlx::query_as::<_, Material>(
            r#"
            DELETE FROM materials AS m
            USING projects p
            WHERE m.id = $1 AND p.id = m.project_id AND p.user_id = $2
            RETURNING m.id, m.project_id, m.title, m.material_type, m.url,
                      m.page_count, m.thumbnail_url, m.metadata, m.created_at, m.updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("material", id))?;

        tracing::info!(material_id = %id, "material deleted");
        Ok(material)
    }

    /// Storage keys of every material the user owns.
    pub async fn storage_keys_for_user(&self, user_id: i64) -> Result<Vec<String>, DbError> {
        let keys: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT k.key
            FROM materials m
            JOIN projects p ON p.id = m.project_id
            CROSS JOIN LATERAL (
                VALUES (m.metadata->>'storage_key'), (m.metadata->>'thumbnail_key')
            ) AS k(key)
            WHERE p.user_id = $1 AND k.key IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(keys.into_iter().map(|(k,)| k).collect())
    }

    /// Materials among `ids` that belong to the project.
    pub async fn find_in_project(
        &self,
        project_id: i64,
        ids: &[Uuid],
    ) -> Result<Vec<Material>, DbError> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            r#"
            SELECT {MATERIAL_COLUMNS}
            FROM materials m
            WHERE m.project_id = $1 AND m.id = ANY($2)
            ORDER BY m.created_at, m.id
            "#
        ))
        .bind(project_id)
        .bind(ids)
        .fetch_all(self.pool)
        .await?;
        Ok(materials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material(metadata: Value) -> Material {
        Material {
            id: Uuid::new_v4(),
            project_id: 1,
            title: "notes.pdf".into(),
            material_type: "file".into(),
            url: None,
            page_count: 0,
            thumbnail_url: None,
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn storage_keys_from_metadata() {
        let m = material(json!({
            "storage_key": "materials/a/notes.pdf",
            "thumbnail_key": "thumbnails/b/shot.png",
            "file_size": 10
        }));
        assert_eq!(
            m.storage_keys(),
            vec!["materials/a/notes.pdf", "thumbnails/b/shot.png"]
        );

        assert!(material(json!({})).storage_keys().is_empty());
    }
}
