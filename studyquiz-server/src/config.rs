//! Service configuration
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `~/.studyquiz/config.toml` (or the path given with `--config`)
//! 3. environment variables (`DATABASE_URL`, `STUDYQUIZ_*`, `OPENAI_API_KEY`, ...)
//!
//! String values in the TOML file may reference `${VAR}` environment variables.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyquizConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub storage: StorageSection,
    pub generator: GeneratorSection,
    pub page_info: PageInfoSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Allow any CORS origin (default: localhost only)
    pub cors_permissive: bool,
    /// Extra allowed origins in non-permissive mode
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_permissive: false,
            cors_origins: Vec::new(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
    /// Run schema migrations when the server starts
    pub migrate_on_start: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/studyquiz".to_owned(),
            max_connections: crate::db::pool::DEFAULT_MAX_CONNECTIONS,
            migrate_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    /// Endpoint that verifies remote provider id tokens
    pub identity_verify_url: Option<String>,
    /// Provider names accepted by the remote verifier
    pub remote_providers: Vec<String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            access_ttl_secs: 60 * 60,
            refresh_ttl_secs: 14 * 24 * 60 * 60,
            identity_verify_url: None,
            remote_providers: vec!["firebase".to_owned()],
        }
    }
}

impl AuthSection {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
    S3,
}

impl StorageBackend {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            "s3" => Ok(Self::S3),
            other => Err(ConfigError::Invalid {
                key: "storage.backend",
                reason: format!("unknown backend '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub root: PathBuf,
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Prefix for URLs handed to clients
    pub public_base_url: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: StudyquizConfig::home_dir().join("media"),
            bucket: None,
            region: None,
            public_base_url: "http://127.0.0.1:8000/media".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    Mock,
    OpenAi,
}

impl GeneratorBackend {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Invalid {
                key: "generator.backend",
                reason: format!("unknown generator '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub backend: GeneratorBackend,
    /// Per-question delay of the mock generator
    pub mock_delay_ms: u64,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Mock,
            mock_delay_ms: 2000,
            openai_base_url: "https://api.openai.com/v1".to_owned(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageInfoSection {
    /// Screenshot service called as `GET {url}?url=<page>`, returning PNG
    pub screenshot_url: Option<String>,
}

impl StudyquizConfig {
    /// Load from an explicit file (must exist) or the default location
    /// (optional), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_owned())),
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Parse TOML text, expanding `${VAR}` references from the environment.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let expanded = expand_vars(content, |key| std::env::var(key).ok());
        toml::from_str(&expanded)
    }

    /// Directory holding config and local data: `~/.studyquiz`
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".studyquiz")
    }

    /// Get config file path: ~/.studyquiz/config.toml
    pub fn config_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source (the process environment in
    /// production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(bind) = get("STUDYQUIZ_BIND") {
            self.server.bind = bind.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "STUDYQUIZ_BIND",
                reason: format!("{}", e),
            })?;
        }
        if let Some(flag) = get("STUDYQUIZ_CORS_PERMISSIVE") {
            self.server.cors_permissive = parse_bool("STUDYQUIZ_CORS_PERMISSIVE", &flag)?;
        }
        if let Some(backend) = get("STUDYQUIZ_STORAGE_BACKEND") {
            self.storage.backend = StorageBackend::parse(&backend)?;
        }
        if let Some(root) = get("STUDYQUIZ_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(bucket) = get("STUDYQUIZ_S3_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        if let Some(region) = get("AWS_REGION") {
            self.storage.region = Some(region);
        }
        if let Some(base) = get("STUDYQUIZ_PUBLIC_BASE_URL") {
            self.storage.public_base_url = base;
        }
        if let Some(generator) = get("STUDYQUIZ_GENERATOR") {
            self.generator.backend = GeneratorBackend::parse(&generator)?;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.generator.openai_api_key = Some(key);
        }
        if let Some(model) = get("STUDYQUIZ_OPENAI_MODEL") {
            self.generator.openai_model = model;
        }
        if let Some(url) = get("STUDYQUIZ_IDENTITY_VERIFY_URL") {
            self.auth.identity_verify_url = Some(url);
        }
        if let Some(url) = get("STUDYQUIZ_SCREENSHOT_URL") {
            self.page_info.screenshot_url = Some(url);
        }
        Ok(())
    }

    /// Copy safe to print: secrets and database credentials masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.generator.openai_api_key.is_some() {
            copy.generator.openai_api_key = Some("********".to_owned());
        }
        copy.database.url = redact_url_password(&copy.database.url);
        copy
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

/// Replace `${VAR}` with its value; unknown variables become empty.
fn expand_vars<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn redact_url_password(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("********"));
            parsed.to_string()
        }
        _ => url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = StudyquizConfig::default();
        assert_eq!(config.server.bind.port(), 8000);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.generator.backend, GeneratorBackend::Mock);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = StudyquizConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.auth.access_ttl_secs, 3600);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = StudyquizConfig::default();
        config
            .apply_overrides(env(&[
                ("DATABASE_URL", "postgres://db/quiz"),
                ("STUDYQUIZ_BIND", "0.0.0.0:8080"),
                ("STUDYQUIZ_CORS_PERMISSIVE", "yes"),
                ("STUDYQUIZ_GENERATOR", "openai"),
                ("OPENAI_API_KEY", "sk-test"),
                ("STUDYQUIZ_S3_BUCKET", ""),
            ]))
            .unwrap();

        assert_eq!(config.database.url, "postgres://db/quiz");
        assert_eq!(config.server.bind.port(), 8080);
        assert!(config.server.cors_permissive);
        assert_eq!(config.generator.backend, GeneratorBackend::OpenAi);
        assert_eq!(config.generator.openai_api_key.as_deref(), Some("sk-test"));
        // blank values are ignored
        assert!(config.storage.bucket.is_none());
    }

    #[test]
    fn bad_override_is_reported() {
        let mut config = StudyquizConfig::default();
        let err = config
            .apply_overrides(env(&[("STUDYQUIZ_STORAGE_BACKEND", "ftp")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "storage.backend", .. }));
    }

    #[test]
    fn variable_expansion() {
        let lookup = env(&[("HOME", "/home/me")]);
        assert_eq!(expand_vars("root = \"${HOME}/media\"", &lookup), "root = \"/home/me/media\"");
        assert_eq!(expand_vars("${MISSING}x", &lookup), "x");
        assert_eq!(expand_vars("open ${brace", &lookup), "open ${brace");
    }

    #[test]
    fn redaction_masks_secrets() {
        let mut config = StudyquizConfig::default();
        config.database.url = "postgres://quiz:hunter2@db:5432/quiz".into();
        config.generator.openai_api_key = Some("sk-live".into());

        let shown = config.redacted().to_toml().unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("sk-live"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            StudyquizConfig::load(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }
}
