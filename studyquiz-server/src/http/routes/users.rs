//! Current user profile

use std::sync::Arc;

use axum::{routing::get, Router};
use serde::Serialize;

use crate::http::envelope::ApiResponse;
use crate::http::extractors::AuthUser;
use crate::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub provider: String,
    pub created_at: String,
}

/// GET /users/me
async fn me(AuthUser(user): AuthUser) -> ApiResponse<UserResponse> {
    ApiResponse::ok(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        provider: user.provider,
        created_at: user.created_at.to_rfc3339(),
    })
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users/me", get(me))
}
