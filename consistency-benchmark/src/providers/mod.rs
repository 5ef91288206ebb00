//! Question corpus and response providers

pub mod files;
pub mod traits;

pub use files::{JsonCorpus, JsonResponses};
pub use traits::{ProviderError, ProviderResult, QuestionCorpusProvider, ResponseProvider};
