//! Repository implementations for database access
//!
//! Each repository borrows the pool and follows these patterns:
//! - Ownership is part of the WHERE clause, never checked afterwards
//! - Upserts via ON CONFLICT (no check-then-insert)
//! - Transactions for multi-step operations

pub mod users;
pub mod tokens;
pub mod projects;
pub mod materials;
pub mod quizzes;
pub mod questions;
pub mod answers;

pub use users::{NewUser, User, UserCredentials, UserRepo};
pub use tokens::{TokenLookup, TokenKind, TokenRepo};
pub use projects::{Project, ProjectChanges, ProjectRepo};
pub use materials::{Material, MaterialChanges, MaterialRepo, NewMaterial};
pub use quizzes::{MaterialRef, NewQuiz, Quiz, QuizRepo, QuizSummary};
pub use questions::{AnsweredQuestion, NewQuestion, Question, QuestionRepo};
pub use answers::{AnswerRepo, AnswerSubmission, GradedAnswer};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}
