//! Question payload helpers and grading
//!
//! Stored answers are a JSON object. Multiple choice questions keep their
//! options under numeric keys plus the correct key under `"answer"`:
//! `{"1": "...", "2": "...", "answer": "2"}`. Short answer questions only
//! carry `{"answer": "..."}`.

use serde_json::{Map, Value};

use super::QuestionType;

/// Key holding the correct answer inside `answers`
pub const ANSWER_KEY: &str = "answer";

/// Question format recorded in a question's metadata.
///
/// Falls back to multiple choice when the metadata doesn't say.
pub fn question_kind(metadata: &Value) -> QuestionType {
    metadata
        .get("question_type")
        .and_then(Value::as_str)
        .and_then(|s| QuestionType::parse(s).ok())
        .unwrap_or(QuestionType::MultipleChoice)
}

/// Selectable options of a multiple choice question (answer key removed).
pub fn choices(answers: &Value, kind: QuestionType) -> Option<Map<String, Value>> {
    if kind != QuestionType::MultipleChoice {
        return None;
    }
    let options = answers
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| k.as_str() != ANSWER_KEY)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    Some(options)
}

/// Correct answer as text, numbers stringified.
pub fn correct_answer(answers: &Value) -> Option<String> {
    match answers.get(ANSWER_KEY)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn explanation(metadata: &Value) -> String {
    metadata
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Grade a submission: exact match after trimming both sides.
///
/// A question without a recorded answer never grades as correct.
pub fn is_correct(submitted: &str, answers: &Value) -> bool {
    match correct_answer(answers) {
        Some(expected) => submitted.trim() == expected.trim(),
        None => false,
    }
}

/// Percentage of correct answers rounded to two decimals, 0 for an empty quiz.
pub fn score(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = correct as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_defaults_to_multiple_choice() {
        assert_eq!(question_kind(&json!({})), QuestionType::MultipleChoice);
        assert_eq!(
            question_kind(&json!({"question_type": "short_answer"})),
            QuestionType::ShortAnswer
        );
        assert_eq!(
            question_kind(&json!({"question_type": "essay"})),
            QuestionType::MultipleChoice
        );
    }

    #[test]
    fn choices_strip_answer_key() {
        let answers = json!({"1": "a", "2": "b", "answer": "2"});
        let options = choices(&answers, QuestionType::MultipleChoice).unwrap();
        assert_eq!(options.len(), 2);
        assert!(!options.contains_key("answer"));

        assert!(choices(&json!({"answer": "x"}), QuestionType::ShortAnswer).is_none());
    }

    #[test]
    fn grading_trims_and_stringifies() {
        let answers = json!({"1": "a", "2": "b", "answer": 2});
        assert!(is_correct(" 2 ", &answers));
        assert!(!is_correct("1", &answers));

        let short = json!({"answer": "  mitochondria "});
        assert!(is_correct("mitochondria", &short));
        assert!(!is_correct("Mitochondria", &short));
    }

    #[test]
    fn missing_answer_never_matches() {
        let answers = json!({"1": "a"});
        assert!(!is_correct("1", &answers));
        assert!(!is_correct("", &answers));
    }

    #[test]
    fn score_rounding() {
        assert_eq!(score(0, 0), 0.0);
        assert_eq!(score(8, 10), 80.0);
        assert_eq!(score(1, 3), 33.33);
        assert_eq!(score(2, 3), 66.67);
    }
}
