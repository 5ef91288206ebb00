//! Loading prompt corpora and raw model responses from JSON files

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{AnswerFamily, AnswerSet, PromptStyle, QuestionId};

/// Error type for corpus loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One question with its phrasing variants, as produced by prompt generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBundle {
    pub id: QuestionId,
    pub question: String,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Prompt text keyed by style name
    #[serde(default)]
    pub prompts: IndexMap<String, String>,
}

impl PromptBundle {
    /// Prompt text for a style, if that style was generated
    pub fn prompt(&self, style: PromptStyle) -> Option<&str> {
        self.prompts.get(style.as_str()).map(String::as_str)
    }
}

/// A single phrasing's model output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub raw: String,
    /// Answer token, when extraction already happened upstream
    #[serde(default)]
    pub extracted: Option<String>,
}

/// One question's responses across phrasing styles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuestionRecord {
    pub id: QuestionId,
    #[serde(default)]
    pub question: String,
    pub correct_answer: String,
    /// Responses keyed by style name; missing keys are absent styles
    #[serde(default)]
    pub responses: IndexMap<String, RawResponse>,
}

impl RawQuestionRecord {
    /// Build the answer set for this record.
    ///
    /// Upstream tokens are case-normalized for the family; responses without
    /// a token are extracted from their raw text. Unknown style keys are
    /// ignored.
    pub fn answer_set(&self, family: AnswerFamily) -> AnswerSet {
        let mut set = AnswerSet::new();

        for (key, response) in &self.responses {
            let style = match key.parse::<PromptStyle>() {
                Ok(style) => style,
                Err(_) => {
                    tracing::debug!("Question {}: ignoring unknown style '{}'", self.id, key);
                    continue;
                }
            };

            let answer = match &response.extracted {
                Some(token) => family.normalize(token),
                None => family.extract(&response.raw),
            };
            set.set(style, answer.into());
        }

        set
    }
}

/// Load raw responses (`<raw_dir>/<dataset>_<model>.json`)
pub fn load_raw_results_file(path: impl AsRef<Path>) -> Result<Vec<RawQuestionRecord>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    load_raw_results_str(&content)
}

pub fn load_raw_results_str(content: &str) -> Result<Vec<RawQuestionRecord>, LoadError> {
    serde_json::from_str(content)
        .map_err(|e| LoadError::Parse(format!("JSON parse error: {}", e)))
}

/// Load a prompt corpus (`<prompts_dir>/<dataset>_prompts.json`)
pub fn load_prompt_bundles_file(path: impl AsRef<Path>) -> Result<Vec<PromptBundle>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    load_prompt_bundles_str(&content)
}

pub fn load_prompt_bundles_str(content: &str) -> Result<Vec<PromptBundle>, LoadError> {
    serde_json::from_str(content)
        .map_err(|e| LoadError::Parse(format!("JSON parse error: {}", e)))
}
