//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod project;
pub mod material;
pub mod quiz;
pub mod question;

pub use validation::ValidationError;
pub use project::{ProjectColor, ProjectName, DEFAULT_PROJECT_COLOR};
pub use material::{MaterialTitle, MaterialType, WebUrl};
pub use quiz::{Difficulty, QuestionCount, QuestionType, QuizStatus};
