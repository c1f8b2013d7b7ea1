//! Material endpoints
//!
//! A material is created from either:
//! - JSON `{"material_type": "url", "url": "..."}`: the page title becomes
//!   the material title and an optional screenshot becomes the thumbnail
//! - multipart with `material_type=file` and a `file` part: the file is
//!   stored and PDFs get their page count

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    routing::get,
    Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Material, MaterialChanges, MaterialRepo, NewMaterial, ProjectRepo};
use crate::http::envelope::ApiResponse;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, PathId, ValidJson};
use crate::http::state::AppState;
use crate::integrations::page_info::screenshot_file_name;
use crate::integrations::pdf::{count_pdf_pages, is_pdf};
use crate::integrations::storage::{MATERIALS_PREFIX, THUMBNAILS_PREFIX};
use crate::models::{MaterialTitle, MaterialType, ValidationError, WebUrl};

/// JSON create request (URL materials)
#[derive(Debug, Deserialize)]
pub struct CreateMaterialRequest {
    pub material_type: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Update request; PUT requires `title`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMaterialRequest {
    pub title: Option<String>,
    pub page_count: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
}

/// Material response
#[derive(Debug, Serialize)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub project_id: i64,
    pub title: String,
    pub material_type: String,
    pub url: Option<String>,
    pub page_count: i32,
    pub thumbnail_url: Option<String>,
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Material> for MaterialResponse {
    fn from(m: Material) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            title: m.title,
            material_type: m.material_type,
            url: m.url,
            page_count: m.page_count,
            thumbnail_url: m.thumbnail_url,
            metadata: m.metadata,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

impl UpdateMaterialRequest {
    fn changes(&self, require_title: bool) -> Result<MaterialChanges, ValidationError> {
        let title = match (&self.title, require_title) {
            (Some(t), _) => Some(MaterialTitle::new(t)?),
            (None, true) => return Err(ValidationError::Missing { field: "title" }),
            (None, false) => None,
        };

        let page_count = self
            .page_count
            .map(|n| {
                i32::try_from(n)
                    .ok()
                    .filter(|n| *n >= 0)
                    .ok_or(ValidationError::OutOfRange {
                        field: "page_count",
                        min: 0,
                        max: i32::MAX as i64,
                    })
            })
            .transpose()?;

        Ok(MaterialChanges {
            title,
            page_count,
            thumbnail_url: self
                .thumbnail_url
                .as_deref()
                .map(|u| WebUrl::for_field(u, "thumbnail_url").map(|u| u.as_str().to_owned()))
                .transpose()?,
            url: self
                .url
                .as_deref()
                .map(|u| WebUrl::new(u).map(|u| u.as_str().to_owned()))
                .transpose()?,
        })
    }
}

/// GET /projects/{id}/materials - list materials of an own project
async fn list_materials(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(project_id): PathId<i64>,
) -> Result<ApiResponse<Vec<MaterialResponse>>, ApiError> {
    ProjectRepo::new(&state.pool)
        .ensure_owned(project_id, user.id())
        .await?;
    let materials = MaterialRepo::new(&state.pool)
        .list_for_project(project_id)
        .await?;
    Ok(ApiResponse::ok(
        materials.into_iter().map(MaterialResponse::from).collect(),
    ))
}

/// POST /projects/{id}/materials - JSON for URLs, multipart for files
async fn create_material(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(project_id): PathId<i64>,
    request: Request,
) -> Result<ApiResponse<MaterialResponse>, ApiError> {
    ProjectRepo::new(&state.pool)
        .ensure_owned(project_id, user.id())
        .await?;

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false);

    let material = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ValidationError::InvalidBody {
                reason: e.body_text(),
            })?;
        create_file_material(&state, project_id, read_upload(multipart).await?).await?
    } else {
        let ValidJson(req) = ValidJson::<CreateMaterialRequest>::from_request(request, &state).await?;
        create_url_material(&state, project_id, req).await?
    };

    Ok(ApiResponse::created(MaterialResponse::from(material)).with_message("material created"))
}

/// Fields pulled out of a multipart upload
#[derive(Debug, Default)]
struct Upload {
    material_type: Option<String>,
    title: Option<String>,
    file: Option<(String, Option<String>, Bytes)>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ValidationError> {
    let bad_body = |e: axum::extract::multipart::MultipartError| ValidationError::InvalidBody {
        reason: e.body_text(),
    };

    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        match field.name().unwrap_or_default() {
            "material_type" => upload.material_type = Some(field.text().await.map_err(bad_body)?),
            "title" => upload.title = Some(field.text().await.map_err(bad_body)?),
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(bad_body)?;
                upload.file = Some((file_name, content_type, data));
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }
    Ok(upload)
}

async fn create_file_material(
    state: &AppState,
    project_id: i64,
    upload: Upload,
) -> Result<Material, ApiError> {
    let material_type = MaterialType::parse(upload.material_type.as_deref().unwrap_or("file"))?;
    if material_type != MaterialType::File {
        return Err(ValidationError::InvalidFormat {
            field: "material_type",
            reason: "multipart uploads must use material_type=file",
        }
        .into());
    }

    let (file_name, content_type, data) =
        upload.file.ok_or(ValidationError::Missing { field: "file" })?;
    if data.is_empty() {
        return Err(ValidationError::Empty { field: "file" }.into());
    }

    let title = match upload.title.as_deref() {
        Some(t) if !t.trim().is_empty() => MaterialTitle::new(t)?,
        _ => MaterialTitle::truncated(&file_name, "upload"),
    };
    let page_count = if is_pdf(&file_name) {
        count_pdf_pages(&data)
    } else {
        0
    };
    let file_size = data.len();

    let stored = state.storage.store(MATERIALS_PREFIX, &file_name, data).await?;

    let created = MaterialRepo::new(&state.pool)
        .create(NewMaterial {
            project_id,
            title,
            material_type: MaterialType::File,
            url: Some(stored.url.clone()),
            page_count,
            thumbnail_url: None,
            metadata: json!({
                "file_name": file_name,
                "file_size": file_size,
                "content_type": content_type,
                "storage_key": stored.key,
            }),
        })
        .await;

    match created {
        Ok(material) => Ok(material),
        Err(e) => {
            state.storage.delete_quietly(&[stored.key]).await;
            Err(e.into())
        }
    }
}

async fn create_url_material(
    state: &AppState,
    project_id: i64,
    req: CreateMaterialRequest,
) -> Result<Material, ApiError> {
    let material_type = MaterialType::parse(req.material_type.as_deref().unwrap_or("url"))?;
    if material_type != MaterialType::Url {
        return Err(ValidationError::InvalidFormat {
            field: "file",
            reason: "file uploads must use multipart/form-data",
        }
        .into());
    }

    let url = WebUrl::new(req.url.as_deref().ok_or(ValidationError::Missing { field: "url" })?)?;
    let info = state.page_info.fetch_page_info(url.as_str()).await;

    let title = match req.title.as_deref() {
        Some(t) if !t.trim().is_empty() => MaterialTitle::new(t)?,
        _ => MaterialTitle::truncated(&info.title, url.as_str()),
    };

    let mut metadata = json!({ "source_url": url.as_str() });
    let mut thumbnail_url = None;
    if let Some(png) = info.screenshot {
        match state
            .storage
            .store(THUMBNAILS_PREFIX, &screenshot_file_name(title.as_str()), png)
            .await
        {
            Ok(stored) => {
                metadata["thumbnail_key"] = json!(stored.key);
                thumbnail_url = Some(stored.url);
            }
            Err(e) => tracing::warn!(error = %e, "failed to store page screenshot"),
        }
    }

    let material = MaterialRepo::new(&state.pool)
        .create(NewMaterial {
            project_id,
            title,
            material_type: MaterialType::Url,
            url: Some(url.as_str().to_owned()),
            page_count: 0,
            thumbnail_url,
            metadata,
        })
        .await?;
    Ok(material)
}

/// GET /materials/{id}
async fn get_material(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
) -> Result<ApiResponse<MaterialResponse>, ApiError> {
    let material = MaterialRepo::new(&state.pool).get_for_user(id, user.id()).await?;
    Ok(ApiResponse::ok(MaterialResponse::from(material)))
}

/// PUT /materials/{id}
async fn replace_material(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
    ValidJson(req): ValidJson<UpdateMaterialRequest>,
) -> Result<ApiResponse<MaterialResponse>, ApiError> {
    let material = MaterialRepo::new(&state.pool)
        .update(id, user.id(), req.changes(true)?)
        .await?;
    Ok(ApiResponse::ok(MaterialResponse::from(material)).with_message("material updated"))
}

/// PATCH /materials/{id}
async fn patch_material(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
    ValidJson(req): ValidJson<UpdateMaterialRequest>,
) -> Result<ApiResponse<MaterialResponse>, ApiError> {
    let material = MaterialRepo::new(&state.pool)
        .update(id, user.id(), req.changes(false)?)
        .await?;
    Ok(ApiResponse::ok(MaterialResponse::from(material)).with_message("material updated"))
}

/// DELETE /materials/{id} - removes the row and its stored objects
async fn delete_material(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
) -> Result<StatusCode, ApiError> {
    let material = MaterialRepo::new(&state.pool).delete(id, user.id()).await?;
    state.storage.delete_quietly(&material.storage_keys()).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Material routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{id}/materials",
            get(list_materials).post(create_material),
        )
        .route(
            "/materials/{id}",
            get(get_material)
                .put(replace_material)
                .patch(patch_material)
                .delete(delete_material),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_requires_title() {
        let req = UpdateMaterialRequest::default();
        assert!(matches!(
            req.changes(true),
            Err(ValidationError::Missing { field: "title" })
        ));
        assert!(req.changes(false).is_ok());
    }

    #[test]
    fn update_fields_are_validated() {
        let negative = UpdateMaterialRequest {
            page_count: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            negative.changes(false),
            Err(ValidationError::OutOfRange { field: "page_count", .. })
        ));

        let bad_thumb = UpdateMaterialRequest {
            thumbnail_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(bad_thumb.changes(false).is_err());

        let ok = UpdateMaterialRequest {
            title: Some(" Chapter 2 ".into()),
            page_count: Some(12),
            url: Some("https://example.com/ch2".into()),
            ..Default::default()
        };
        let changes = ok.changes(true).unwrap();
        assert_eq!(changes.title.unwrap().as_str(), "Chapter 2");
        assert_eq!(changes.page_count, Some(12));
        assert_eq!(changes.url.as_deref(), Some("https://example.com/ch2"));
    }
}
