//! Route handlers organized by resource

pub mod auth;
pub mod health;
pub mod materials;
pub mod projects;
pub mod quizzes;
pub mod users;
