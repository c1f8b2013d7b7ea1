//! Quiz repository
//!
//! Besides CRUD this owns the generation state writes:
//! `pending -> processing -> completed | failed`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::{DbError, NewQuestion};
use crate::models::{Difficulty, QuestionCount, QuestionType};

/// Titles shown per quiz in list responses
const LIST_TITLE_LIMIT: usize = 3;

/// Quiz record from database
#[derive(Debug, Clone, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub project_id: i64,
    pub question_type: String,
    pub question_count: i32,
    pub difficulty: String,
    pub status: String,
    pub error_message: Option<String>,
    pub progress_percentage: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Settings for a new quiz
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub project_id: i64,
    pub question_type: QuestionType,
    pub question_count: QuestionCount,
    pub difficulty: Difficulty,
}

/// Material used to build a quiz
#[derive(Debug, Clone, FromRow)]
pub struct MaterialRef {
    pub id: Uuid,
    pub title: String,
}

/// Completed quiz as listed under a project
#[derive(Debug, Clone)]
pub struct QuizSummary {
    pub quiz: Quiz,
    pub material_count: i64,
    /// Up to three titles, followed by `"..."` when more were used
    pub material_titles: Vec<String>,
    pub total_questions: i64,
}

const QUIZ_COLUMNS: &str = "q.id, q.project_id, q.question_type, q.question_count, q.difficulty, \
     q.status, q.error_message, q.progress_percentage, q.created_at, q.updated_at, \
     q.started_at, q.completed_at";

/// Quiz repository
pub struct QuizRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> QuizRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending quiz and link its materials in one transaction.
    pub async fn create_with_materials(
        &self,
        new: NewQuiz,
        material_ids: &[Uuid],
    ) -> Result<Quiz, DbError> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            r#"
            INSERT INTO quizzes AS q (project_id, question_type, question_count, difficulty, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(new.project_id)
        .bind(new.question_type.as_str())
        .bind(new.question_count.get() as i32)
        .bind(new.difficulty.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO quiz_materials (quiz_id, material_id)
            SELECT $1, UNNEST($2::UUID[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(quiz.id)
        .bind(material_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            quiz_id = %quiz.id,
            project_id = quiz.project_id,
            materials = material_ids.len(),
            question_count = quiz.question_count,
            "quiz requested"
        );
        Ok(quiz)
    }

    pub async fn get_for_user(&self, id: Uuid, user_id: i64) -> Result<Quiz, DbError> {
        sqlx::query_as::<_, Quiz>(&format!(
            r#"
            SELECT {QUIZ_COLUMNS}
            FROM quizzes q
            JOIN projects p ON p.id = q.project_id
            WHERE q.id = $1 AND p.user_id = $2
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("quiz", id))
    }

    /// Materials linked to a quiz, oldest first.
    pub async fn material_refs(&self, quiz_id: Uuid) -> Result<Vec<MaterialRef>, DbError> {
        let refs = sqlx::query_as::<_, MaterialRef>(
            r#"
            SELECT m.id, m.title
            FROM quiz_materials qm
            JOIN materials m ON m.id = qm.material_id
            WHERE qm.quiz_id = $1
            ORDER BY m.created_at, m.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(self.pool)
        .await?;
        Ok(refs)
    }

    /// Completed quizzes of a project, newest first. Caller checks ownership.
    pub async fn list_completed(&self, project_id: i64) -> Result<Vec<QuizSummary>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT
                {QUIZ_COLUMNS},
                (SELECT COUNT(*) FROM quiz_materials qm WHERE qm.quiz_id = q.id) AS material_count,
                COALESCE(
                    (SELECT ARRAY_AGG(m.title ORDER BY m.created_at, m.id)
                     FROM quiz_materials qm JOIN materials m ON m.id = qm.material_id
                     WHERE qm.quiz_id = q.id),
                    ARRAY[]::TEXT[]
                ) AS titles,
                (SELECT COUNT(*) FROM quiz_questions qq WHERE qq.quiz_id = q.id) AS total_questions
            FROM quizzes q
            WHERE q.project_id = $1 AND q.status = 'completed'
            ORDER BY q.created_at DESC, q.id
            "#
        ))
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                let titles: Vec<String> = r.get("titles");
                Ok(QuizSummary {
                    quiz: Quiz::from_row(r)?,
                    material_count: r.get("material_count"),
                    material_titles: abbreviate_titles(titles),
                    total_questions: r.get("total_questions"),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(DbError::from)
    }

    /// Worker picked the job up.
    pub async fn mark_processing(&self, id: Uuid) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE quizzes SET
                status = 'processing',
                progress_percentage = 0,
                started_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_progress(&self, id: Uuid, percentage: i32) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE quizzes SET progress_percentage = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(percentage.clamp(0, 100))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Store every generated question and mark the quiz completed, atomically.
    pub async fn complete(&self, id: Uuid, questions: &[NewQuestion]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        for (position, q) in questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions (quiz_id, position, question, answers, metadata)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(id)
            .bind(position as i32)
            .bind(&q.question)
            .bind(&q.answers)
            .bind(&q.metadata)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE quizzes SET
                status = 'completed',
                progress_percentage = 100,
                error_message = NULL,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE quizzes SET
                status = 'failed',
                error_message = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// Keep the first titles and mark the rest with `"..."`.
fn abbreviate_titles(mut titles: Vec<String>) -> Vec<String> {
    if titles.len() > LIST_TITLE_LIMIT {
        titles.truncate(LIST_TITLE_LIMIT);
        titles.push("...".to_owned());
    }
    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("material {}", i)).collect()
    }

    #[test]
    fn short_title_lists_are_untouched() {
        assert!(abbreviate_titles(vec![]).is_empty());
        assert_eq!(abbreviate_titles(titles(3)), titles(3));
    }

    #[test]
    fn long_title_lists_are_cut_with_ellipsis() {
        let cut = abbreviate_titles(titles(5));
        assert_eq!(cut.len(), 4);
        assert_eq!(cut[2], "material 3");
        assert_eq!(cut[3], "...");
    }

    // Run with: DATABASE_URL=postgres://... cargo test -p studyquiz-server -- --ignored
    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_quiz_is_not_found() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::migrations::run(&pool).await.expect("migrations");

        let err = QuizRepo::new(&pool)
            .get_for_user(Uuid::new_v4(), -1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { resource: "quiz", .. }));
    }
}
