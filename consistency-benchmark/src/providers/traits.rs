//! Contracts for the collaborators that produce questions and responses
//!
//! Corpus acquisition, prompt generation and model inference happen outside
//! this crate. The analysis only consumes their materialized output through
//! these two traits.

use crate::corpus::{LoadError, PromptBundle, RawQuestionRecord};

/// Error types for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No data for dataset '{dataset}'{}", model_suffix(.model))]
    Unavailable {
        dataset: String,
        model: Option<String>,
    },

    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

fn model_suffix(model: &Option<String>) -> String {
    model
        .as_ref()
        .map(|m| format!(" and model '{}'", m))
        .unwrap_or_default()
}

/// Source of question / ground truth / phrasing-prompt bundles
pub trait QuestionCorpusProvider {
    /// Provider name, for logging
    fn name(&self) -> &str;

    /// All prompt bundles of a dataset, in corpus order
    fn questions(&self, dataset: &str) -> ProviderResult<Vec<PromptBundle>>;
}

/// Source of per-style model responses for a dataset and model
pub trait ResponseProvider {
    /// Provider name, for logging
    fn name(&self) -> &str;

    /// One record per question, in corpus order
    fn responses(&self, dataset: &str, model: &str) -> ProviderResult<Vec<RawQuestionRecord>>;

    /// Whether responses exist without loading them
    fn has_responses(&self, dataset: &str, model: &str) -> bool;
}
