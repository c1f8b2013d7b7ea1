//! Answer submission and grading
//!
//! Answers are graded at write time and upserted per (user, question), so
//! resubmitting replaces the previous attempt.

use serde_json::Value;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::DbError;
use crate::models::question;

/// One submitted answer
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub is_correct: bool,
}

/// Answer repository
pub struct AnswerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> AnswerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Grade and store a batch of answers in one transaction.
    ///
    /// A question outside `quiz_id` aborts the whole batch with not-found.
    pub async fn submit(
        &self,
        user_id: i64,
        quiz_id: Uuid,
        submissions: &[AnswerSubmission],
    ) -> Result<Vec<GradedAnswer>, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut graded = Vec::with_capacity(submissions.len());

        for submission in submissions {
            graded.push(grade_and_store(&mut tx, user_id, quiz_id, submission).await?);
        }

        tx.commit().await?;

        tracing::info!(
            user_id,
            quiz_id = %quiz_id,
            submitted = graded.len(),
            correct = graded.iter().filter(|g| g.is_correct).count(),
            "answers submitted"
        );
        Ok(graded)
    }
}

async fn grade_and_store(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    quiz_id: Uuid,
    submission: &AnswerSubmission,
) -> Result<GradedAnswer, DbError> {
    let row = sqlx::query("SELECT answers FROM quiz_questions WHERE id = $1 AND quiz_id = $2")
        .bind(submission.question_id)
        .bind(quiz_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DbError::not_found("question", submission.question_id))?;

    let answers: Value = row.get("answers");
    let is_correct = question::is_correct(&submission.answer, &answers);

    sqlx::query(
        r#"
        INSERT INTO quiz_answer_histories (user_id, question_id, answer, is_correct)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, question_id) DO UPDATE SET
            answer = EXCLUDED.answer,
            is_correct = EXCLUDED.is_correct,
            updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(submission.question_id)
    .bind(&submission.answer)
    .bind(is_correct)
    .execute(&mut **tx)
    .await?;

    Ok(GradedAnswer {
        question_id: submission.question_id,
        is_correct,
    })
}
