//! Project endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::{Deserialize, Serialize};

use crate::db::{Project, ProjectChanges, ProjectRepo};
use crate::http::envelope::ApiResponse;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, PathId, ValidJson};
use crate::http::state::AppState;
use crate::models::{ProjectColor, ProjectName, ValidationError};

/// Create / full update request
#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Project response
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub material_count: i64,
    pub last_activity_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            color: p.color,
            material_count: p.material_count,
            last_activity_date: p.last_activity_date.to_rfc3339(),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

fn required_name(name: Option<&str>) -> Result<ProjectName, ValidationError> {
    ProjectName::new(name.ok_or(ValidationError::Missing { field: "name" })?)
}

impl ProjectRequest {
    /// Changes for PATCH: only fields present in the body.
    fn partial(&self) -> Result<ProjectChanges, ValidationError> {
        Ok(ProjectChanges {
            name: self.name.as_deref().map(ProjectName::new).transpose()?,
            color: self.color.as_deref().map(ProjectColor::new).transpose()?,
        })
    }

    /// Changes for PUT: name required, omitted color resets to the default.
    fn full(&self) -> Result<ProjectChanges, ValidationError> {
        Ok(ProjectChanges {
            name: Some(required_name(self.name.as_deref())?),
            color: Some(
                self.color
                    .as_deref()
                    .map(ProjectColor::new)
                    .transpose()?
                    .unwrap_or_default(),
            ),
        })
    }
}

/// GET /projects - list own projects
async fn list_projects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<ProjectResponse>>, ApiError> {
    let projects = ProjectRepo::new(&state.pool).list_for_user(user.id()).await?;
    Ok(ApiResponse::ok(
        projects.into_iter().map(ProjectResponse::from).collect(),
    ))
}

/// POST /projects - create a project
async fn create_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(req): ValidJson<ProjectRequest>,
) -> Result<ApiResponse<ProjectResponse>, ApiError> {
    let name = required_name(req.name.as_deref())?;
    let color = req
        .color
        .as_deref()
        .map(ProjectColor::new)
        .transpose()?
        .unwrap_or_default();

    let project = ProjectRepo::new(&state.pool)
        .create(user.id(), name, color)
        .await?;
    Ok(ApiResponse::created(ProjectResponse::from(project)).with_message("project created"))
}

/// GET /projects/{id}
async fn get_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<i64>,
) -> Result<ApiResponse<ProjectResponse>, ApiError> {
    let project = ProjectRepo::new(&state.pool).get_for_user(id, user.id()).await?;
    Ok(ApiResponse::ok(ProjectResponse::from(project)))
}

/// PUT /projects/{id}
async fn replace_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<i64>,
    ValidJson(req): ValidJson<ProjectRequest>,
) -> Result<ApiResponse<ProjectResponse>, ApiError> {
    let project = ProjectRepo::new(&state.pool)
        .update(id, user.id(), req.full()?)
        .await?;
    Ok(ApiResponse::ok(ProjectResponse::from(project)).with_message("project updated"))
}

/// PATCH /projects/{id}
async fn patch_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<i64>,
    ValidJson(req): ValidJson<ProjectRequest>,
) -> Result<ApiResponse<ProjectResponse>, ApiError> {
    let project = ProjectRepo::new(&state.pool)
        .update(id, user.id(), req.partial()?)
        .await?;
    Ok(ApiResponse::ok(ProjectResponse::from(project)).with_message("project updated"))
}

/// DELETE /projects/{id} - cascades to materials, quizzes and questions
async fn delete_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<i64>,
) -> Result<StatusCode, ApiError> {
    let keys = ProjectRepo::new(&state.pool).delete(id, user.id()).await?;
    state.storage.delete_quietly(&keys).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Project routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project)
                .put(replace_project)
                .patch(patch_project)
                .delete(delete_project),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: Option<&str>, color: Option<&str>) -> ProjectRequest {
        ProjectRequest {
            name: name.map(str::to_owned),
            color: color.map(str::to_owned),
        }
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let changes = req(None, Some("#112233")).partial().unwrap();
        assert!(changes.name.is_none());
        assert_eq!(changes.color.unwrap().as_str(), "#112233");
    }

    #[test]
    fn put_requires_name_and_defaults_color() {
        assert!(matches!(
            req(None, None).full(),
            Err(ValidationError::Missing { field: "name" })
        ));

        let changes = req(Some("Biology"), None).full().unwrap();
        assert_eq!(changes.name.unwrap().as_str(), "Biology");
        assert_eq!(changes.color.unwrap().as_str(), "#3B82F6");
    }

    #[test]
    fn invalid_fields_are_rejected() {
        assert!(req(Some(""), None).partial().is_err());
        assert!(req(None, Some("blue")).partial().is_err());
    }
}
