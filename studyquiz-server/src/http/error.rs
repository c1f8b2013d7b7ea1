//! API error types with IntoResponse
//!
//! Every error renders as the standard envelope with a stable `code`:
//! `{"status": 404, "code": "PRJ001", "message": "...", "data": null}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::{AuthError, LoginError};
use crate::db::DbError;
use crate::integrations::StorageError;
use crate::models::ValidationError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Authentication failed (mostly 401)
    Auth(AuthError),

    /// Resource missing or owned by someone else (404)
    NotFound { resource: &'static str, id: String },

    /// Quiz detail requested before generation finished (400)
    QuizNotCompleted { status: String },

    /// Quiz requested with materials outside the project (400)
    InvalidMaterialSelection { missing: usize },

    /// Storage backend failed (502, logged)
    Upstream { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VAL001",
            Self::Auth(e) => e.code(),
            Self::NotFound { resource, .. } => not_found_code(resource),
            Self::QuizNotCompleted { .. } => "QUZ002",
            Self::InvalidMaterialSelection { .. } => "QUZ003",
            Self::Upstream { .. } => "SRV002",
            Self::Database(_) | Self::Internal { .. } => "SRV001",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::QuizNotCompleted { .. }
            | Self::InvalidMaterialSelection { .. } => StatusCode::BAD_REQUEST,
            Self::Auth(e) => e.status(),
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Auth(AuthError::Database(e)) => {
                tracing::error!("Database error during auth: {}", e);
                "an internal error occurred".to_owned()
            }
            Self::Auth(AuthError::ProviderUnavailable(reason)) => {
                tracing::error!("Identity provider error: {}", reason);
                "identity provider unavailable".to_owned()
            }
            Self::Auth(e) => e.to_string(),
            Self::NotFound { resource, id } => format!("{} '{}' not found", resource, id),
            Self::QuizNotCompleted { status } => {
                format!("quiz generation is not completed (status: {})", status)
            }
            Self::InvalidMaterialSelection { missing } => format!(
                "{} selected material(s) do not exist in this project",
                missing
            ),
            Self::Upstream { message } => {
                tracing::error!("Storage error: {}", message);
                "file storage is unavailable".to_owned()
            }
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                "an internal error occurred".to_owned()
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                "an internal error occurred".to_owned()
            }
        }
    }
}

fn not_found_code(resource: &str) -> &'static str {
    match resource {
        "project" => "PRJ001",
        "material" => "MAT001",
        "quiz" => "QUZ001",
        "question" => "QUZ004",
        "user" => "AUTH005",
        _ => "NOT_FOUND",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "status": status.as_u16(),
            "code": self.code(),
            "message": self.message(),
            "data": null,
        });

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Database(db) => Self::from(db),
            AuthError::PasswordHash(e) => Self::Internal {
                message: format!("password hashing failed: {}", e),
            },
            other => Self::Auth(other),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Validation(v) => Self::Validation(v),
            LoginError::Auth(a) => Self::from(a),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            _ => Self::Database(e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::Upstream {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let (status, body) =
            body_json(ApiError::Validation(ValidationError::Empty { field: "name" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VAL001");
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "name cannot be empty");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn not_found_codes_follow_resource() {
        for (resource, code) in [
            ("project", "PRJ001"),
            ("material", "MAT001"),
            ("quiz", "QUZ001"),
            ("question", "QUZ004"),
        ] {
            let (status, body) = body_json(ApiError::from(DbError::NotFound {
                resource,
                id: "1".into(),
            }))
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["code"], code);
        }
    }

    #[tokio::test]
    async fn auth_errors_keep_their_codes() {
        let (status, body) = body_json(AuthError::ExpiredToken.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "AUTH003");

        let (status, body) = body_json(AuthError::RefreshReused.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "RT004");
    }

    #[tokio::test]
    async fn quiz_state_errors_are_400() {
        let (status, body) = body_json(ApiError::QuizNotCompleted {
            status: "processing".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "QUZ002");

        let (_, body) = body_json(ApiError::InvalidMaterialSelection { missing: 2 }).await;
        assert_eq!(body["code"], "QUZ003");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = body_json(ApiError::Internal {
            message: "secret stack trace".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "SRV001");
        assert_eq!(body["message"], "an internal error occurred");

        let (status, body) = body_json(ApiError::Upstream {
            message: "bucket gone".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "SRV002");
    }

    #[tokio::test]
    async fn password_hash_failure_is_internal() {
        let bcrypt_err = bcrypt::hash("hunter22", 99).unwrap_err();
        let (status, body) = body_json(AuthError::PasswordHash(bcrypt_err).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "SRV001");
        assert_eq!(body["message"], "an internal error occurred");
    }
}
