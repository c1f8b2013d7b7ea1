//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use super::server::ServerError;
use crate::auth::{IdentityProviders, RemoteIdentityProvider, TokenSettings};
use crate::config::{GeneratorBackend, StorageBackend, StudyquizConfig};
use crate::integrations::{
    ChatQuestionGenerator, HttpPageInfoFetcher, MaterialStorage, MockQuestionGenerator,
    PageInfoFetcher, QuestionGenerator,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: MaterialStorage,
    pub page_info: Arc<dyn PageInfoFetcher>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub identity: IdentityProviders,
    pub tokens: TokenSettings,
}

impl AppState {
    /// Wire real collaborators from configuration.
    pub fn from_config(pool: PgPool, config: &StudyquizConfig) -> Result<Self, ServerError> {
        let storage = match config.storage.backend {
            StorageBackend::Local => {
                MaterialStorage::local(&config.storage.root, &config.storage.public_base_url)?
            }
            StorageBackend::Memory => {
                tracing::warn!("in-memory storage: uploaded files are lost on restart");
                MaterialStorage::in_memory(&config.storage.public_base_url)
            }
            StorageBackend::S3 => MaterialStorage::s3(
                config.storage.bucket.as_deref().unwrap_or_default(),
                config.storage.region.as_deref(),
                &config.storage.public_base_url,
            )?,
        };

        let generator: Arc<dyn QuestionGenerator> = match config.generator.backend {
            GeneratorBackend::Mock => Arc::new(MockQuestionGenerator::new(Duration::from_millis(
                config.generator.mock_delay_ms,
            ))),
            GeneratorBackend::OpenAi => {
                let key = config
                    .generator
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| ServerError::Config("openai generator requires OPENAI_API_KEY".into()))?;
                Arc::new(ChatQuestionGenerator::new(
                    &config.generator.openai_base_url,
                    key,
                    &config.generator.openai_model,
                ))
            }
        };

        let page_info = Arc::new(HttpPageInfoFetcher::new(config.page_info.screenshot_url.clone())?);

        let mut identity = IdentityProviders::new();
        match &config.auth.identity_verify_url {
            Some(url) => {
                for name in &config.auth.remote_providers {
                    identity = identity.register(name, Arc::new(RemoteIdentityProvider::new(url, name)?));
                }
            }
            None => tracing::info!("no identity verify URL configured, only native login enabled"),
        }

        tracing::info!(
            storage = ?config.storage.backend,
            generator = ?config.generator.backend,
            providers = ?identity.names(),
            "application state ready"
        );

        Ok(Self {
            pool,
            storage,
            page_info,
            generator,
            identity,
            tokens: TokenSettings {
                access_ttl: config.auth.access_ttl(),
                refresh_ttl: config.auth.refresh_ttl(),
            },
        })
    }
}
