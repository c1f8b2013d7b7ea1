//! Quiz generation job
//!
//! One detached task per quiz. The quiz row is the only shared state:
//! handlers poll it while the task writes status and progress.
//!
//! ```text
//! pending -> processing -> completed
//!                 \-------> failed
//! ```

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::{DbError, NewQuestion, QuizRepo};
use crate::integrations::{GenerationError, GenerationRequest, QuestionGenerator};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Progress after `done` of `total` questions, in whole percent.
pub fn progress_percentage(done: u32, total: u32) -> i32 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) as u64 * 100) / total as u64) as i32
}

/// Start generation in the background and return immediately.
pub fn spawn_generation(
    pool: PgPool,
    generator: Arc<dyn QuestionGenerator>,
    quiz_id: Uuid,
    request: GenerationRequest,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_generation(&pool, generator.as_ref(), quiz_id, &request).await {
            tracing::error!(quiz_id = %quiz_id, error = %e, "quiz generation failed");
            if let Err(write_err) = QuizRepo::new(&pool).mark_failed(quiz_id, &e.to_string()).await {
                tracing::error!(
                    quiz_id = %quiz_id,
                    error = %write_err,
                    "could not record generation failure"
                );
            }
        }
    })
}

/// Drive one quiz through generation. Failure is left for the caller to record.
#[tracing::instrument(skip(pool, generator, request), fields(count = request.question_count))]
pub async fn run_generation(
    pool: &PgPool,
    generator: &dyn QuestionGenerator,
    quiz_id: Uuid,
    request: &GenerationRequest,
) -> Result<(), JobError> {
    let repo = QuizRepo::new(pool);
    repo.mark_processing(quiz_id).await?;
    tracing::info!("quiz generation started");

    let total = request.question_count;
    let mut questions = Vec::with_capacity(total as usize);

    for index in 0..total {
        let generated = generator.generate_question(request, index).await?;
        questions.push(NewQuestion {
            question: generated.question,
            answers: generated.answers,
            metadata: generated.metadata,
        });

        let progress = progress_percentage(index + 1, total);
        repo.set_progress(quiz_id, progress).await?;
        tracing::debug!(progress, "question generated");
    }

    repo.complete(quiz_id, &questions).await?;
    tracing::info!(questions = questions.len(), "quiz generation completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_uses_integer_division() {
        assert_eq!(progress_percentage(0, 3), 0);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 66);
        assert_eq!(progress_percentage(3, 3), 100);
        assert_eq!(progress_percentage(7, 50), 14);
    }

    #[test]
    fn progress_never_exceeds_100() {
        assert_eq!(progress_percentage(5, 3), 100);
        assert_eq!(progress_percentage(0, 0), 100);
    }

    #[test]
    fn progress_is_monotonic() {
        let total = 17;
        let steps: Vec<i32> = (1..=total).map(|i| progress_percentage(i, total)).collect();
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(steps.last(), Some(&100));
    }
}
