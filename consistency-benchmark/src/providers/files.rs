//! File-backed providers reading the JSON files left by upstream tooling

use std::path::PathBuf;

use super::traits::{ProviderError, ProviderResult, QuestionCorpusProvider, ResponseProvider};
use crate::corpus::{load_prompt_bundles_file, load_raw_results_file, PromptBundle, RawQuestionRecord};

/// Prompt corpora stored as `<dir>/<dataset>_prompts.json`
pub struct JsonCorpus {
    dir: PathBuf,
}

impl JsonCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, dataset: &str) -> PathBuf {
        self.dir.join(format!("{}_prompts.json", dataset))
    }
}

impl QuestionCorpusProvider for JsonCorpus {
    fn name(&self) -> &str {
        "json-corpus"
    }

    fn questions(&self, dataset: &str) -> ProviderResult<Vec<PromptBundle>> {
        let path = self.path_for(dataset);
        if !path.is_file() {
            return Err(ProviderError::Unavailable {
                dataset: dataset.to_string(),
                model: None,
            });
        }
        tracing::debug!("Loading prompts from {}", path.display());
        Ok(load_prompt_bundles_file(&path)?)
    }
}

/// Raw model responses stored as `<dir>/<dataset>_<model>.json`
pub struct JsonResponses {
    dir: PathBuf,
}

impl JsonResponses {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, dataset: &str, model: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.json", dataset, model))
    }
}

impl ResponseProvider for JsonResponses {
    fn name(&self) -> &str {
        "json-responses"
    }

    fn responses(&self, dataset: &str, model: &str) -> ProviderResult<Vec<RawQuestionRecord>> {
        let path = self.path_for(dataset, model);
        if !path.is_file() {
            return Err(ProviderError::Unavailable {
                dataset: dataset.to_string(),
                model: Some(model.to_string()),
            });
        }
        tracing::debug!("Loading responses from {}", path.display());
        Ok(load_raw_results_file(&path)?)
    }

    fn has_responses(&self, dataset: &str, model: &str) -> bool {
        self.path_for(dataset, model).is_file()
    }
}
