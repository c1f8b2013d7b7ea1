//! Quiz question reads
//!
//! Questions are written only by the generation job (see `QuizRepo::complete`).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DbError;

/// Question record from database
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub position: i32,
    pub question: String,
    pub answers: Value,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated question ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub answers: Value,
    pub metadata: Value,
}

/// A user's stored answer joined with its question
#[derive(Debug, Clone, FromRow)]
pub struct AnsweredQuestion {
    pub history_id: i64,
    #[sqlx(flatten)]
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Question repository
pub struct QuestionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> QuestionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Questions in generation order.
    pub async fn list_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<Question>, DbError> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, position, question, answers, metadata, created_at, updated_at
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn count_for_quiz(&self, quiz_id: Uuid) -> Result<i64, DbError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM quiz_questions WHERE quiz_id = $1")
                .bind(quiz_id)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// The user's answers for a quiz, in question order.
    pub async fn answered_by_user(
        &self,
        quiz_id: Uuid,
        user_id: i64,
    ) -> Result<Vec<AnsweredQuestion>, DbError> {
        let answered = sqlx::query_as::<_, AnsweredQuestion>(
            r#"
            SELECT
                h.id AS history_id,
                q.id, q.quiz_id, q.position, q.question, q.answers, q.metadata,
                q.created_at, q.updated_at,
                h.answer AS user_answer,
                h.is_correct,
                h.created_at AS answered_at
            FROM quiz_answer_histories h
            JOIN quiz_questions q ON q.id = h.question_id
            WHERE q.quiz_id = $1 AND h.user_id = $2
            ORDER BY q.position
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(answered)
    }
}
