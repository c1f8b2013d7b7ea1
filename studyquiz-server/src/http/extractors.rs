//! Custom Axum extractors

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::{AuthError, TokenService};
use crate::db::User;
use crate::models::ValidationError;

/// Authenticated caller, resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts.headers.get(AUTHORIZATION).map(|v| v.to_str()))?;
        let user = TokenService::new(&state.pool, state.tokens)
            .authenticate(token)
            .await?;
        Ok(Self(user))
    }
}

/// Pull the token out of an Authorization header value.
fn bearer_token<E>(header: Option<Result<&str, E>>) -> Result<&str, AuthError> {
    let value = match header {
        None => return Err(AuthError::MissingToken),
        Some(Err(_)) => return Err(AuthError::MalformedHeader),
        Some(Ok(v)) => v.trim(),
    };

    let mut parts = value.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().map(str::trim).unwrap_or_default();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Path id parsed into `T` (i64 project ids, UUIDs), 400 on garbage
pub struct PathId<T>(pub T);

impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: FromStr + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Validation(ValidationError::Missing { field: "id" }))?;

        let id = raw.parse::<T>().map_err(|_| {
            ApiError::Validation(ValidationError::InvalidFormat {
                field: "id",
                reason: "malformed identifier",
            })
        })?;
        Ok(Self(id))
    }
}

/// JSON body whose decode failures render as validation errors
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

pub(crate) fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(ValidationError::InvalidBody {
        reason: rejection.body_text(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(v: &str) -> Option<Result<&str, ()>> {
        Some(Ok(v))
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(header("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(header("bearer   abc ")).unwrap(), "abc");
        assert!(matches!(
            bearer_token::<()>(None),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(header("Token abc")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            bearer_token(header("Bearer")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            bearer_token(header("Bearer a b")),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            bearer_token::<()>(Some(Err(()))),
            Err(AuthError::MalformedHeader)
        ));
    }
}
