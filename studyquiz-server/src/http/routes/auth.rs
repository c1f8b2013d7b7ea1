//! Login, token refresh and account withdrawal

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{self, LoginRequest, TokenService};
use crate::db::{MaterialRepo, UserRepo};
use crate::http::envelope::ApiResponse;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson};
use crate::http::state::AppState;

/// Login / refresh response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl TokenResponse {
    fn new(user_id: i64, pair: auth::TokenPair) -> Self {
        Self {
            user_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /auth/{provider}/login
async fn login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let outcome = auth::login(&state.pool, &state.identity, state.tokens, &provider, req).await?;

    let body = TokenResponse::new(outcome.user.id, outcome.tokens);
    Ok(if outcome.created {
        ApiResponse::created(body).with_message("account created")
    } else {
        ApiResponse::ok(body).with_message("login successful")
    })
}

/// POST /auth/refresh
async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> Result<ApiResponse<TokenResponse>, ApiError> {
    let token = req.refresh_token.unwrap_or_default();
    let (user, pair) = TokenService::new(&state.pool, state.tokens)
        .refresh(&token)
        .await?;

    Ok(ApiResponse::ok(TokenResponse::new(user.id, pair)).with_message("token refreshed"))
}

/// DELETE /auth/withdraw - delete the caller and everything they own
async fn withdraw(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    // collect stored files before the cascade removes the rows pointing at them
    let keys = MaterialRepo::new(&state.pool)
        .storage_keys_for_user(user.id())
        .await?;

    UserRepo::new(&state.pool).delete(user.id()).await?;
    state.storage.delete_quietly(&keys).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/{provider}/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/withdraw", delete(withdraw))
}
