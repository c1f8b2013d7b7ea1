//! Quiz settings and generation status

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Lower bound for questions per quiz
pub const MIN_QUESTION_COUNT: u32 = 1;
/// Upper bound for questions per quiz
pub const MAX_QUESTION_COUNT: u32 = 50;
/// Questions requested when the client doesn't say
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Generation lifecycle of a quiz
///
/// `Pending -> Processing -> Completed | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QuizStatus {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(ValidationError::InvalidVariant {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Question format requested for a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    ShortAnswer,
    Mixed,
}

impl QuestionType {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "multiple_choice" => Ok(Self::MultipleChoice),
            "short_answer" => Ok(Self::ShortAnswer),
            "mixed" => Ok(Self::Mixed),
            other => Err(ValidationError::InvalidVariant {
                field: "question_type",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::ShortAnswer => "short_answer",
            Self::Mixed => "mixed",
        }
    }

    /// Concrete format of the question at `index` (0-based).
    ///
    /// Mixed quizzes alternate, starting with multiple choice.
    pub fn kind_at(&self, index: u32) -> QuestionType {
        match self {
            Self::Mixed if index % 2 == 0 => Self::MultipleChoice,
            Self::Mixed => Self::ShortAnswer,
            other => *other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ValidationError::InvalidVariant {
                field: "difficulty",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Validated number of questions (1..=50)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCount(u32);

impl QuestionCount {
    pub fn new(n: i64) -> Result<Self, ValidationError> {
        if n < MIN_QUESTION_COUNT as i64 || n > MAX_QUESTION_COUNT as i64 {
            return Err(ValidationError::OutOfRange {
                field: "question_count",
                min: MIN_QUESTION_COUNT as i64,
                max: MAX_QUESTION_COUNT as i64,
            });
        }
        Ok(Self(n as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Seconds the client should expect generation to take.
    pub fn estimated_seconds(&self) -> u32 {
        estimated_seconds(self.0)
    }
}

impl Default for QuestionCount {
    fn default() -> Self {
        Self(DEFAULT_QUESTION_COUNT)
    }
}

/// Two seconds per question, matching the placeholder generator's pace.
pub fn estimated_seconds(question_count: u32) -> u32 {
    question_count * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            QuizStatus::Pending,
            QuizStatus::Processing,
            QuizStatus::Completed,
            QuizStatus::Failed,
        ] {
            assert_eq!(QuizStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(QuizStatus::parse("done").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(!QuizStatus::Pending.is_terminal());
        assert!(!QuizStatus::Processing.is_terminal());
        assert!(QuizStatus::Completed.is_terminal());
        assert!(QuizStatus::Failed.is_terminal());
    }

    #[test]
    fn mixed_alternates_starting_with_multiple_choice() {
        let kinds: Vec<_> = (0..4).map(|i| QuestionType::Mixed.kind_at(i)).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
            ]
        );
        assert_eq!(QuestionType::ShortAnswer.kind_at(0), QuestionType::ShortAnswer);
        assert_eq!(QuestionType::MultipleChoice.kind_at(7), QuestionType::MultipleChoice);
    }

    #[test]
    fn question_count_bounds() {
        assert!(QuestionCount::new(1).is_ok());
        assert!(QuestionCount::new(50).is_ok());
        assert!(matches!(
            QuestionCount::new(0).unwrap_err(),
            ValidationError::OutOfRange { .. }
        ));
        assert!(QuestionCount::new(51).is_err());
        assert_eq!(QuestionCount::default().get(), 10);
        assert_eq!(QuestionCount::new(7).unwrap().estimated_seconds(), 14);
    }

    #[test]
    fn serde_names_are_snake_case() {
        let json = serde_json::to_string(&QuestionType::MultipleChoice).unwrap();
        assert_eq!(json, "\"multiple_choice\"");
        let parsed: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
    }
}
