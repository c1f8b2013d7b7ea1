//! Identity providers for social login
//!
//! A remote provider hands the client an id token; we ask a verification
//! endpoint who it belongs to. Provider names map to implementations in
//! `IdentityProviders`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::AuthError;

/// Provider name of password accounts
pub const NATIVE_PROVIDER: &str = "native";

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity confirmed by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-unique subject id
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Trait for id-token verification (testable)
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Verifies id tokens against an HTTP endpoint
///
/// POSTs `{"provider": ..., "id_token": ...}` and expects
/// `{"uid" | "sub": ..., "email"?: ..., "name"?: ...}` on success.
pub struct RemoteIdentityProvider {
    http: reqwest::Client,
    verify_url: String,
    provider: String,
}

impl RemoteIdentityProvider {
    pub fn new(verify_url: &str, provider: &str) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?,
            verify_url: verify_url.to_owned(),
            provider: provider.to_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    uid: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

impl VerifyResponse {
    fn into_identity(self) -> Option<VerifiedIdentity> {
        let subject = self.uid.or(self.sub).filter(|s| !s.trim().is_empty())?;
        Some(VerifiedIdentity {
            subject,
            email: self.email.filter(|e| !e.is_empty()),
            name: self.name.filter(|n| !n.is_empty()),
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    #[tracing::instrument(skip(self, id_token), fields(provider = %self.provider))]
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AuthError> {
        let resp = self
            .http
            .post(&self.verify_url)
            .json(&serde_json::json!({
                "provider": self.provider,
                "id_token": id_token,
            }))
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() {
            tracing::info!(%status, "id token rejected");
            return Err(AuthError::CredentialsRejected);
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnavailable(format!("verifier returned {}", status)));
        }

        let body: VerifyResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
        body.into_identity().ok_or(AuthError::CredentialsRejected)
    }
}

/// Fixed token table, for tests and local development
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    identities: HashMap<String, VerifiedIdentity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, id_token: &str, identity: VerifiedIdentity) -> Self {
        self.identities.insert(id_token.to_owned(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.identities
            .get(id_token)
            .cloned()
            .ok_or(AuthError::CredentialsRejected)
    }
}

/// Registry of remote providers by name
#[derive(Clone, Default)]
pub struct IdentityProviders {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl IdentityProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(name.to_lowercase(), provider);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        self.providers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| AuthError::UnsupportedProvider(name.to_owned()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for IdentityProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProviders")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(subject: &str) -> VerifiedIdentity {
        VerifiedIdentity {
            subject: subject.into(),
            email: Some(format!("{}@example.com", subject)),
            name: None,
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let providers = IdentityProviders::new().register(
            "Firebase",
            Arc::new(StaticIdentityProvider::new().with_identity("tok", identity("u1"))),
        );

        let provider = providers.get("firebase").unwrap();
        assert_eq!(provider.verify("tok").await.unwrap().subject, "u1");
        assert!(matches!(
            provider.verify("other").await,
            Err(AuthError::CredentialsRejected)
        ));
        assert!(matches!(
            providers.get("kakao"),
            Err(AuthError::UnsupportedProvider(name)) if name == "kakao"
        ));
    }

    #[test]
    fn verify_response_prefers_uid() {
        let body: VerifyResponse =
            serde_json::from_str(r#"{"uid": "a", "sub": "b", "email": ""}"#).unwrap();
        let identity = body.into_identity().unwrap();
        assert_eq!(identity.subject, "a");
        assert_eq!(identity.email, None);

        let body: VerifyResponse = serde_json::from_str(r#"{"email": "x@y.z"}"#).unwrap();
        assert!(body.into_identity().is_none());
    }

    #[tokio::test]
    async fn unreachable_verifier_is_upstream_failure() {
        let provider = RemoteIdentityProvider::new("http://127.0.0.1:9/verify", "firebase").unwrap();
        assert!(matches!(
            provider.verify("tok").await,
            Err(AuthError::ProviderUnavailable(_))
        ));
    }
}
