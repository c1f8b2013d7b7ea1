//! HTTP server layer
//!
//! Axum server with:
//! - CORS (localhost only by default)
//! - Request tracing
//! - Graceful shutdown
//! - Enveloped JSON responses with stable error codes

pub mod envelope;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;
pub mod state;

pub use envelope::ApiResponse;
pub use error::ApiError;
pub use server::{build_router, run_server, ServerConfig, ServerError, API_PREFIX};
pub use state::AppState;
