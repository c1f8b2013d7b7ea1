//! Command implementations for the studyquiz CLI

pub mod config;
pub mod migrate;
pub mod serve;

pub use config::run_config;
pub use migrate::run_migrate;
pub use serve::run_serve;

use std::path::Path;

use anyhow::{Context, Result};
use studyquiz_server::StudyquizConfig;

/// Load `.env` from the working directory, then `~/.studyquiz/.env`.
///
/// dotenvy never overwrites variables that are already set, so the
/// process environment wins, then the local file, then the global one.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let global = StudyquizConfig::home_dir().join(".env");
    if global.exists() {
        match dotenvy::from_path(&global) {
            Ok(()) => tracing::debug!(path = %global.display(), "loaded .env"),
            Err(e) => tracing::warn!(path = %global.display(), error = %e, "failed to load .env"),
        }
    }
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<StudyquizConfig> {
    StudyquizConfig::load(path).context("Failed to load configuration")
}
