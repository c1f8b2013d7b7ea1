//! studyquiz-server: REST backend for study materials and generated quizzes
//!
//! Users own projects, projects hold materials (uploaded files or web
//! links), and quizzes are generated in the background from a selection
//! of a project's materials. Answers are graded on submission.

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod integrations;
pub mod jobs;
pub mod models;

pub use config::{ConfigError, StudyquizConfig};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
