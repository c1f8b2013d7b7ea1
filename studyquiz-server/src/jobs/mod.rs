//! Background work spawned by request handlers

pub mod quiz_generation;

pub use quiz_generation::{progress_percentage, run_generation, spawn_generation, JobError};
