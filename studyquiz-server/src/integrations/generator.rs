//! Question generation backends
//!
//! The job asks for one question at a time so it can report progress
//! between calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::models::{question::ANSWER_KEY, Difficulty, QuestionType};

/// Number of options in a multiple choice question
pub const CHOICE_COUNT: usize = 4;

/// Everything a generator needs to know about the quiz
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub material_titles: Vec<String>,
    pub question_type: QuestionType,
    pub question_count: u32,
    pub difficulty: Difficulty,
}

/// One generated question in storage shape
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub answers: Value,
    pub metadata: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator returned an unusable answer: {0}")]
    InvalidResponse(String),
}

/// Trait for question generators (testable)
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce the question at `index` (0-based).
    async fn generate_question(
        &self,
        request: &GenerationRequest,
        index: u32,
    ) -> Result<GeneratedQuestion, GenerationError>;
}

/// Placeholder generator producing deterministic questions
#[derive(Debug, Clone)]
pub struct MockQuestionGenerator {
    delay: Duration,
}

impl MockQuestionGenerator {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No artificial delay, for tests.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl Default for MockQuestionGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl QuestionGenerator for MockQuestionGenerator {
    async fn generate_question(
        &self,
        request: &GenerationRequest,
        index: u32,
    ) -> Result<GeneratedQuestion, GenerationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let kind = request.question_type.kind_at(index);
        let number = index + 1;
        let source = request
            .material_titles
            .first()
            .map(String::as_str)
            .unwrap_or("the material");

        let (question, answers) = match kind {
            QuestionType::ShortAnswer => (
                format!("Question {}: summarize a key idea from {}.", number, source),
                json!({ ANSWER_KEY: format!("Sample answer {}", number) }),
            ),
            _ => {
                let mut answers = Map::new();
                for choice in 1..=CHOICE_COUNT {
                    answers.insert(choice.to_string(), json!(format!("Choice {}", choice)));
                }
                answers.insert(ANSWER_KEY.to_owned(), json!("2"));
                (
                    format!("Question {}: which statement about {} is correct?", number, source),
                    Value::Object(answers),
                )
            }
        };

        Ok(GeneratedQuestion {
            question,
            answers,
            metadata: metadata(kind, request.difficulty, "Placeholder explanation.", number),
        })
    }
}

/// Generator backed by an OpenAI-compatible chat completions endpoint
pub struct ChatQuestionGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatQuestionGenerator {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    fn messages_body(&self, request: &GenerationRequest, kind: QuestionType, index: u32) -> Value {
        json!({
            "model": self.model,
            "temperature": 0.7,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(request, kind, index)}
            ]
        })
    }
}

const SYSTEM_PROMPT: &str = "You write study quiz questions. Reply with one JSON object \
    and nothing else: {\"question\": string, \"choices\": [string] (multiple choice only), \
    \"answer\": string, \"explanation\": string}. For multiple choice the answer is the \
    1-based number of the correct choice.";

fn user_prompt(request: &GenerationRequest, kind: QuestionType, index: u32) -> String {
    let format = match kind {
        QuestionType::ShortAnswer => "short answer".to_owned(),
        _ => format!("multiple choice with {} choices", CHOICE_COUNT),
    };
    format!(
        "Materials: {}\nWrite question {} of {}.\nFormat: {}\nDifficulty: {}",
        request.material_titles.join(", "),
        index + 1,
        request.question_count,
        format,
        request.difficulty.as_str(),
    )
}

#[async_trait]
impl QuestionGenerator for ChatQuestionGenerator {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    async fn generate_question(
        &self,
        request: &GenerationRequest,
        index: u32,
    ) -> Result<GeneratedQuestion, GenerationError> {
        let kind = request.question_type.kind_at(index);
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.messages_body(request, kind, index))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(GenerationError::InvalidResponse(format!("{}: {}", status, txt)));
        }

        #[derive(Deserialize)]
        struct Choices {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Msg,
        }
        #[derive(Deserialize)]
        struct Msg {
            content: String,
        }

        let parsed: Choices = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices".into()))?;

        parse_generated(&content, kind, request.difficulty, index + 1)
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    #[serde(default)]
    choices: Vec<String>,
    answer: Value,
    #[serde(default)]
    explanation: String,
}

/// Normalize a model reply into the stored question shape.
pub fn parse_generated(
    content: &str,
    kind: QuestionType,
    difficulty: Difficulty,
    number: u32,
) -> Result<GeneratedQuestion, GenerationError> {
    let raw: RawQuestion = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

    if raw.question.trim().is_empty() {
        return Err(GenerationError::InvalidResponse("empty question".into()));
    }

    let answer = match raw.answer {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(GenerationError::InvalidResponse(format!(
                "unsupported answer value {}",
                other
            )))
        }
    };

    let mut answers = Map::new();
    if kind == QuestionType::MultipleChoice {
        if raw.choices.len() < 2 {
            return Err(GenerationError::InvalidResponse(
                "multiple choice question without choices".into(),
            ));
        }
        for (i, choice) in raw.choices.iter().enumerate() {
            answers.insert((i + 1).to_string(), json!(choice));
        }
        let valid = answer
            .parse::<usize>()
            .map(|n| (1..=raw.choices.len()).contains(&n))
            .unwrap_or(false);
        if !valid {
            return Err(GenerationError::InvalidResponse(format!(
                "answer '{}' is not a choice number",
                answer
            )));
        }
    }
    answers.insert(ANSWER_KEY.to_owned(), json!(answer));

    Ok(GeneratedQuestion {
        question: raw.question.trim().to_owned(),
        answers: Value::Object(answers),
        metadata: metadata(kind, difficulty, &raw.explanation, number),
    })
}

fn metadata(kind: QuestionType, difficulty: Difficulty, explanation: &str, number: u32) -> Value {
    json!({
        "question_type": kind.as_str(),
        "difficulty": difficulty.as_str(),
        "explanation": explanation,
        "question_number": number,
    })
}

/// Models like to wrap JSON in ```json fences.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question;

    fn request(question_type: QuestionType) -> GenerationRequest {
        GenerationRequest {
            material_titles: vec!["Cell Biology".into()],
            question_type,
            question_count: 4,
            difficulty: Difficulty::Hard,
        }
    }

    #[tokio::test]
    async fn mock_multiple_choice_has_four_choices() {
        let q = MockQuestionGenerator::instant()
            .generate_question(&request(QuestionType::MultipleChoice), 0)
            .await
            .unwrap();

        let choices = question::choices(&q.answers, QuestionType::MultipleChoice).unwrap();
        assert_eq!(choices.len(), CHOICE_COUNT);
        assert_eq!(question::correct_answer(&q.answers).as_deref(), Some("2"));
        assert_eq!(q.metadata["difficulty"], "hard");
        assert_eq!(q.metadata["question_number"], 1);
    }

    #[tokio::test]
    async fn mock_mixed_alternates_kinds() {
        let generator = MockQuestionGenerator::instant();
        let req = request(QuestionType::Mixed);
        let second = generator.generate_question(&req, 1).await.unwrap();
        assert_eq!(second.metadata["question_type"], "short_answer");
        assert!(question::choices(&second.answers, QuestionType::ShortAnswer).is_none());
        assert!(question::correct_answer(&second.answers).is_some());
    }

    #[test]
    fn parses_fenced_multiple_choice_reply() {
        let reply = "```json\n{\"question\": \"2+2?\", \"choices\": [\"3\", \"4\"], \"answer\": 2, \"explanation\": \"math\"}\n```";
        let q = parse_generated(reply, QuestionType::MultipleChoice, Difficulty::Easy, 3).unwrap();
        assert_eq!(q.question, "2+2?");
        assert_eq!(q.answers, json!({"1": "3", "2": "4", "answer": "2"}));
        assert_eq!(q.metadata["explanation"], "math");
        assert_eq!(q.metadata["question_number"], 3);
    }

    #[test]
    fn rejects_out_of_range_choice() {
        let reply = r#"{"question": "q", "choices": ["a", "b"], "answer": "5"}"#;
        assert!(matches!(
            parse_generated(reply, QuestionType::MultipleChoice, Difficulty::Easy, 1),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn short_answer_ignores_choices() {
        let reply = r#"{"question": "Define osmosis", "answer": " diffusion of water "}"#;
        let q = parse_generated(reply, QuestionType::ShortAnswer, Difficulty::Medium, 1).unwrap();
        assert_eq!(q.answers, json!({"answer": "diffusion of water"}));
        assert!(parse_generated("not json", QuestionType::ShortAnswer, Difficulty::Medium, 1).is_err());
    }
}
