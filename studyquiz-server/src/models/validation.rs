//! Validation error types

use std::fmt;

/// Validation error for domain models and request bodies
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., hex color)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Number outside the accepted range (inclusive)
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Required field not provided
    Missing { field: &'static str },

    /// Body could not be decoded at all
    InvalidBody { reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::Missing { field } => write!(f, "{} is required", field),
            Self::InvalidBody { reason } => write!(f, "invalid request body: {}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "name exceeds maximum length of 100 characters"
        );

        let err = ValidationError::OutOfRange {
            field: "question_count",
            min: 1,
            max: 50,
        };
        assert_eq!(err.to_string(), "question_count must be between 1 and 50");
    }
}
