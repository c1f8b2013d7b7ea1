//! Database layer - connection pool, schema and repositories
//!
//! # Design Principles
//!
//! - Connection pool (default 5 connections) shared through `AppState`
//! - Every lookup is scoped by owner, so foreign rows read as missing
//! - List operations use JOINs or correlated counts in a single query
//! - Transactions for multi-step writes

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
