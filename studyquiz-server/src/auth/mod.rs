//! Authentication: token issuing, login flows and identity providers

pub mod error;
pub mod login;
pub mod password;
pub mod providers;
pub mod tokens;

pub use error::AuthError;
pub use login::{login, LoginError, LoginOutcome, LoginRequest};
pub use providers::{
    IdentityProvider, IdentityProviders, RemoteIdentityProvider, StaticIdentityProvider,
    VerifiedIdentity, NATIVE_PROVIDER,
};
pub use tokens::{TokenPair, TokenService, TokenSettings};
