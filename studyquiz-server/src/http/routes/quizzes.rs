//! Quiz endpoints: generation requests, polling, answering and results

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{
    AnswerRepo, AnswerSubmission, AnsweredQuestion, MaterialRepo, NewQuiz, ProjectRepo, Question,
    QuestionRepo, Quiz, QuizRepo, QuizSummary,
};
use crate::http::envelope::ApiResponse;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, PathId, ValidJson};
use crate::http::state::AppState;
use crate::integrations::GenerationRequest;
use crate::jobs::spawn_generation;
use crate::models::{
    question, quiz::estimated_seconds, Difficulty, QuestionCount, QuestionType, QuizStatus,
    ValidationError,
};

/// Generation request body
#[derive(Debug, Deserialize)]
pub struct CreateQuizRequest {
    #[serde(default)]
    pub material_ids: Vec<Uuid>,
    pub question_type: Option<String>,
    pub question_count: Option<i64>,
    pub difficulty: Option<String>,
}

/// Validated generation settings
#[derive(Debug)]
struct QuizSettings {
    material_ids: Vec<Uuid>,
    question_type: QuestionType,
    question_count: QuestionCount,
    difficulty: Difficulty,
}

impl CreateQuizRequest {
    fn validate(self) -> Result<QuizSettings, ValidationError> {
        if self.material_ids.is_empty() {
            return Err(ValidationError::Empty {
                field: "material_ids",
            });
        }

        let mut seen = HashSet::new();
        let material_ids = self
            .material_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        Ok(QuizSettings {
            material_ids,
            question_type: self
                .question_type
                .as_deref()
                .map(QuestionType::parse)
                .transpose()?
                .unwrap_or_default(),
            question_count: self
                .question_count
                .map(QuestionCount::new)
                .transpose()?
                .unwrap_or_default(),
            difficulty: self
                .difficulty
                .as_deref()
                .map(Difficulty::parse)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Polling response
#[derive(Debug, Serialize)]
pub struct QuizStatusResponse {
    pub quiz_id: Uuid,
    pub status: String,
    pub progress_percentage: i32,
    pub error_message: Option<String>,
    /// Expected total generation time in seconds
    pub estimated_time: u32,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<&Quiz> for QuizStatusResponse {
    fn from(q: &Quiz) -> Self {
        Self {
            quiz_id: q.id,
            status: q.status.clone(),
            progress_percentage: q.progress_percentage,
            error_message: q.error_message.clone(),
            estimated_time: estimated_seconds(q.question_count.max(0) as u32),
            created_at: q.created_at.to_rfc3339(),
            started_at: q.started_at.map(|t| t.to_rfc3339()),
            completed_at: q.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Completed quiz in a project listing
#[derive(Debug, Serialize)]
pub struct QuizListItem {
    pub id: Uuid,
    pub material_count: i64,
    pub material_titles: Vec<String>,
    pub question_type: String,
    pub difficulty: String,
    pub total_questions: i64,
    pub status: String,
    pub created_at: String,
}

impl From<QuizSummary> for QuizListItem {
    fn from(s: QuizSummary) -> Self {
        Self {
            id: s.quiz.id,
            material_count: s.material_count,
            material_titles: s.material_titles,
            question_type: s.quiz.question_type,
            difficulty: s.quiz.difficulty,
            total_questions: s.total_questions,
            status: s.quiz.status,
            created_at: s.quiz.created_at.to_rfc3339(),
        }
    }
}

/// Question as shown while taking a quiz (no answer)
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: Uuid,
    pub question: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Map<String, Value>>,
    pub metadata: Value,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        let kind = question::question_kind(&q.metadata);
        Self {
            id: q.id,
            question: q.question.clone(),
            question_type: kind,
            choices: question::choices(&q.answers, kind),
            metadata: q.metadata.clone(),
        }
    }
}

/// Question with its correct answer, shown in results
#[derive(Debug, Serialize)]
pub struct GradedQuestionView {
    #[serde(flatten)]
    pub question: QuestionView,
    pub correct_answer: Option<String>,
    pub explanation: String,
}

/// Quiz detail
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    pub id: Uuid,
    pub project_id: i64,
    pub material_ids: Vec<Uuid>,
    pub material_titles: Vec<String>,
    pub question_type: String,
    pub difficulty: String,
    pub total_questions: usize,
    pub questions: Vec<QuestionView>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    pub answer: String,
}

impl SubmitAnswerRequest {
    fn into_submission(self) -> Result<AnswerSubmission, ValidationError> {
        if self.answer.trim().is_empty() {
            return Err(ValidationError::Empty { field: "answer" });
        }
        Ok(AnswerSubmission {
            question_id: self.question_id,
            answer: self.answer,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    #[serde(default)]
    pub answers: Vec<SubmitAnswerRequest>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub message: &'static str,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswersResponse {
    pub message: &'static str,
    pub submitted_count: usize,
}

/// One answered question in a result
#[derive(Debug, Serialize)]
pub struct AnswerResult {
    pub id: i64,
    pub question: GradedQuestionView,
    pub user_answer: String,
    pub is_correct: bool,
    pub created_at: String,
}

impl From<AnsweredQuestion> for AnswerResult {
    fn from(a: AnsweredQuestion) -> Self {
        Self {
            id: a.history_id,
            question: GradedQuestionView {
                question: QuestionView::from(&a.question),
                correct_answer: question::correct_answer(&a.question.answers),
                explanation: question::explanation(&a.question.metadata),
            },
            user_answer: a.user_answer,
            is_correct: a.is_correct,
            created_at: a.answered_at.to_rfc3339(),
        }
    }
}

/// Graded result
#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub quiz_id: Uuid,
    pub total_questions: i64,
    pub correct_count: i64,
    pub wrong_count: i64,
    pub score: f64,
    pub answers: Vec<AnswerResult>,
}

impl QuizResult {
    fn new(quiz_id: Uuid, total_questions: i64, answered: Vec<AnsweredQuestion>) -> Self {
        let correct_count = answered.iter().filter(|a| a.is_correct).count() as i64;
        Self {
            quiz_id,
            total_questions,
            correct_count,
            wrong_count: total_questions - correct_count,
            score: question::score(correct_count, total_questions),
            answers: answered.into_iter().map(AnswerResult::from).collect(),
        }
    }
}

/// GET /projects/{id}/quizzes - completed quizzes of an own project
async fn list_quizzes(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(project_id): PathId<i64>,
) -> Result<ApiResponse<Vec<QuizListItem>>, ApiError> {
    ProjectRepo::new(&state.pool)
        .ensure_owned(project_id, user.id())
        .await?;
    let quizzes = QuizRepo::new(&state.pool).list_completed(project_id).await?;
    Ok(ApiResponse::ok(
        quizzes.into_iter().map(QuizListItem::from).collect(),
    ))
}

/// POST /projects/{id}/quizzes - request generation, returns immediately
async fn create_quiz(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(project_id): PathId<i64>,
    ValidJson(req): ValidJson<CreateQuizRequest>,
) -> Result<ApiResponse<QuizStatusResponse>, ApiError> {
    let settings = req.validate()?;

    ProjectRepo::new(&state.pool)
        .ensure_owned(project_id, user.id())
        .await?;

    let materials = MaterialRepo::new(&state.pool)
        .find_in_project(project_id, &settings.material_ids)
        .await?;
    if materials.len() != settings.material_ids.len() {
        return Err(ApiError::InvalidMaterialSelection {
            missing: settings.material_ids.len() - materials.len(),
        });
    }

    let quiz = QuizRepo::new(&state.pool)
        .create_with_materials(
            NewQuiz {
                project_id,
                question_type: settings.question_type,
                question_count: settings.question_count,
                difficulty: settings.difficulty,
            },
            &settings.material_ids,
        )
        .await?;

    let request = GenerationRequest {
        material_titles: materials.into_iter().map(|m| m.title).collect(),
        question_type: settings.question_type,
        question_count: settings.question_count.get(),
        difficulty: settings.difficulty,
    };
    spawn_generation(state.pool.clone(), state.generator.clone(), quiz.id, request);

    Ok(ApiResponse::created(QuizStatusResponse::from(&quiz)).with_message("quiz generation started"))
}

/// GET /quizzes/{id} - detail with questions, completed quizzes only
async fn get_quiz(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
) -> Result<ApiResponse<QuizDetail>, ApiError> {
    let repo = QuizRepo::new(&state.pool);
    let quiz = repo.get_for_user(id, user.id()).await?;
    if QuizStatus::parse(&quiz.status)? != QuizStatus::Completed {
        return Err(ApiError::QuizNotCompleted {
            status: quiz.status,
        });
    }

    let materials = repo.material_refs(id).await?;
    let questions = QuestionRepo::new(&state.pool).list_for_quiz(id).await?;

    Ok(ApiResponse::ok(QuizDetail {
        id: quiz.id,
        project_id: quiz.project_id,
        material_ids: materials.iter().map(|m| m.id).collect(),
        material_titles: materials.into_iter().map(|m| m.title).collect(),
        question_type: quiz.question_type,
        difficulty: quiz.difficulty,
        total_questions: questions.len(),
        questions: questions.iter().map(QuestionView::from).collect(),
        status: quiz.status,
        created_at: quiz.created_at.to_rfc3339(),
        updated_at: quiz.updated_at.to_rfc3339(),
    }))
}

/// GET /quizzes/{id}/status - polling endpoint
async fn quiz_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
) -> Result<ApiResponse<QuizStatusResponse>, ApiError> {
    let quiz = QuizRepo::new(&state.pool).get_for_user(id, user.id()).await?;
    Ok(ApiResponse::ok(QuizStatusResponse::from(&quiz)))
}

/// POST /quizzes/{id}/submit-answer
async fn submit_answer(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
    ValidJson(req): ValidJson<SubmitAnswerRequest>,
) -> Result<ApiResponse<SubmitAnswerResponse>, ApiError> {
    let submission = req.into_submission()?;
    QuizRepo::new(&state.pool).get_for_user(id, user.id()).await?;

    let graded = AnswerRepo::new(&state.pool)
        .submit(user.id(), id, &[submission])
        .await?;
    let is_correct = graded.first().map(|g| g.is_correct).unwrap_or(false);

    Ok(ApiResponse::ok(SubmitAnswerResponse {
        message: "answer submitted",
        is_correct,
    })
    .with_message("answer submitted"))
}

/// POST /quizzes/{id}/submit-answers - all or nothing
async fn submit_answers(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
    ValidJson(req): ValidJson<SubmitAnswersRequest>,
) -> Result<ApiResponse<SubmitAnswersResponse>, ApiError> {
    if req.answers.is_empty() {
        return Err(ValidationError::Empty { field: "answers" }.into());
    }
    let submissions = req
        .answers
        .into_iter()
        .map(SubmitAnswerRequest::into_submission)
        .collect::<Result<Vec<_>, _>>()?;

    QuizRepo::new(&state.pool).get_for_user(id, user.id()).await?;
    let graded = AnswerRepo::new(&state.pool)
        .submit(user.id(), id, &submissions)
        .await?;

    Ok(ApiResponse::ok(SubmitAnswersResponse {
        message: "answers submitted",
        submitted_count: graded.len(),
    })
    .with_message("answers submitted"))
}

/// GET /quizzes/{id}/result
async fn quiz_result(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    PathId(id): PathId<Uuid>,
) -> Result<ApiResponse<QuizResult>, ApiError> {
    QuizRepo::new(&state.pool).get_for_user(id, user.id()).await?;

    let questions = QuestionRepo::new(&state.pool);
    let total = questions.count_for_quiz(id).await?;
    let answered = questions.answered_by_user(id, user.id()).await?;

    Ok(ApiResponse::ok(QuizResult::new(id, total, answered)))
}

/// Quiz routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{id}/quizzes",
            get(list_quizzes).post(create_quiz),
        )
        .route("/quizzes/{id}", get(get_quiz))
        .route("/quizzes/{id}/status", get(quiz_status))
        .route("/quizzes/{id}/submit-answer", post(submit_answer))
        .route("/quizzes/{id}/submit-answers", post(submit_answers))
        .route("/quizzes/{id}/result", get(quiz_result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn create_req(ids: Vec<Uuid>) -> CreateQuizRequest {
        CreateQuizRequest {
            material_ids: ids,
            question_type: None,
            question_count: None,
            difficulty: None,
        }
    }

    fn answered(position: i32, is_correct: bool) -> AnsweredQuestion {
        AnsweredQuestion {
            history_id: position as i64,
            question: Question {
                id: Uuid::new_v4(),
                quiz_id: Uuid::nil(),
                position,
                question: format!("Q{}", position),
                answers: json!({"1": "a", "2": "b", "answer": "2"}),
                metadata: json!({"question_type": "multiple_choice", "explanation": "because"}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            user_answer: if is_correct { "2".into() } else { "1".into() },
            is_correct,
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn quiz_request_defaults() {
        let id = Uuid::new_v4();
        let settings = create_req(vec![id, id]).validate().unwrap();
        assert_eq!(settings.material_ids, vec![id]);
        assert_eq!(settings.question_type, QuestionType::MultipleChoice);
        assert_eq!(settings.question_count.get(), 10);
        assert_eq!(settings.difficulty, Difficulty::Medium);
    }

    #[test]
    fn quiz_request_validation() {
        assert!(matches!(
            create_req(vec![]).validate(),
            Err(ValidationError::Empty { field: "material_ids" })
        ));

        let mut req = create_req(vec![Uuid::new_v4()]);
        req.question_count = Some(51);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));

        let mut req = create_req(vec![Uuid::new_v4()]);
        req.difficulty = Some("brutal".into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_answers_are_rejected() {
        let req = SubmitAnswerRequest {
            question_id: Uuid::new_v4(),
            answer: "   ".into(),
        };
        assert!(matches!(
            req.into_submission(),
            Err(ValidationError::Empty { field: "answer" })
        ));
    }

    #[test]
    fn result_counts_unanswered_as_wrong() {
        let result = QuizResult::new(Uuid::nil(), 4, vec![answered(0, true), answered(1, false)]);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.wrong_count, 3);
        assert_eq!(result.score, 25.0);
        assert_eq!(result.answers[0].question.correct_answer.as_deref(), Some("2"));
        assert_eq!(result.answers[0].question.explanation, "because");
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let result = QuizResult::new(Uuid::nil(), 0, vec![]);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.wrong_count, 0);
    }

    #[test]
    fn question_view_hides_answer() {
        let q = answered(0, true).question;
        let view = QuestionView::from(&q);
        let choices = view.choices.unwrap();
        assert_eq!(choices.len(), 2);
        assert!(!choices.contains_key("answer"));
    }

    #[test]
    fn status_response_estimates_two_seconds_per_question() {
        let quiz = Quiz {
            id: Uuid::nil(),
            project_id: 1,
            question_type: "mixed".into(),
            question_count: 12,
            difficulty: "easy".into(),
            status: "pending".into(),
            error_message: None,
            progress_percentage: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let status = QuizStatusResponse::from(&quiz);
        assert_eq!(status.estimated_time, 24);
        assert!(status.started_at.is_none());
    }
}
