//! Authentication failures and their wire codes

use axum::http::StatusCode;

use crate::db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authentication token is missing")]
    MissingToken,

    #[error("authentication token is invalid")]
    InvalidToken,

    #[error("authentication token has expired")]
    ExpiredToken,

    #[error("authorization header must be 'Bearer <token>'")]
    MalformedHeader,

    #[error("user for this token no longer exists")]
    UserNotFound,

    #[error("user account is inactive")]
    UserInactive,

    #[error("login credentials were rejected")]
    CredentialsRejected,

    #[error("unsupported login provider '{0}'")]
    UnsupportedProvider(String),

    #[error("refresh token is missing")]
    RefreshMissing,

    #[error("refresh token is invalid")]
    RefreshInvalid,

    #[error("refresh token has expired")]
    RefreshExpired,

    #[error("refresh token was already used")]
    RefreshReused,

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "AUTH001",
            Self::InvalidToken => "AUTH002",
            Self::ExpiredToken => "AUTH003",
            Self::MalformedHeader => "AUTH004",
            Self::UserNotFound => "AUTH005",
            Self::UserInactive => "AUTH006",
            Self::CredentialsRejected => "AUTH007",
            Self::UnsupportedProvider(_) => "AUTH008",
            Self::RefreshMissing => "RT001",
            Self::RefreshInvalid => "RT002",
            Self::RefreshExpired => "RT003",
            Self::RefreshReused => "RT004",
            Self::ProviderUnavailable(_) => "SRV002",
            Self::PasswordHash(_) | Self::Database(_) => "SRV001",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedProvider(_) => StatusCode::BAD_REQUEST,
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::PasswordHash(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_401() {
        for err in [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::ExpiredToken,
            AuthError::MalformedHeader,
            AuthError::RefreshReused,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{}", err.code());
        }
    }

    #[test]
    fn provider_errors() {
        let err = AuthError::UnsupportedProvider("kakao".into());
        assert_eq!(err.code(), "AUTH008");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::ProviderUnavailable("timeout".into()).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
