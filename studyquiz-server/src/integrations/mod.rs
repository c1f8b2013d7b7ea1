//! External collaborators behind traits
//!
//! Each has a real implementation and an in-process one for tests.

pub mod generator;
pub mod page_info;
pub mod pdf;
pub mod storage;

pub use generator::{
    ChatQuestionGenerator, GeneratedQuestion, GenerationError, GenerationRequest,
    MockQuestionGenerator, QuestionGenerator,
};
pub use page_info::{HttpPageInfoFetcher, PageInfo, PageInfoFetcher, StaticPageInfo};
pub use storage::{MaterialStorage, StorageError, StoredObject};
