//! Configuration for the consistency study
//!
//! Loads dataset, model and output-path settings from TOML files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::AnswerFamily;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Model key -> backend details, used for labelling only
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}

/// Which datasets, models and model pairs a run covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_datasets")]
    pub datasets: Vec<String>,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Ordered model pairs to test against each other
    #[serde(default = "default_comparisons")]
    pub comparisons: Vec<ComparisonPair>,
    /// Per-dataset answer family overrides
    #[serde(default)]
    pub families: IndexMap<String, AnswerFamily>,
}

/// Two model keys, compared as (model1, model2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair(pub String, pub String);

impl ComparisonPair {
    pub fn new(model1: impl Into<String>, model2: impl Into<String>) -> Self {
        Self(model1.into(), model2.into())
    }
}

/// Input and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_scored_dir")]
    pub scored_dir: PathBuf,
    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,
    #[serde(default = "default_stats_dir")]
    pub stats_dir: PathBuf,
}

/// Backend details for a model key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend model tag, e.g. "phi3:mini"
    pub tag: String,
    #[serde(default)]
    pub display_name: String,
}

// Default value functions
fn default_datasets() -> Vec<String> {
    ["medqa", "medmcqa", "pubmedqa"].map(String::from).to_vec()
}
fn default_models() -> Vec<String> {
    ["phi3_mini", "llama3.2", "gemma2", "mistral"].map(String::from).to_vec()
}
fn default_comparisons() -> Vec<ComparisonPair> {
    vec![
        ComparisonPair::new("llama3.2", "phi3_mini"),
        ComparisonPair::new("gemma2", "phi3_mini"),
        ComparisonPair::new("mistral", "phi3_mini"),
        ComparisonPair::new("llama3.2", "gemma2"),
    ]
}
fn default_prompts_dir() -> PathBuf { PathBuf::from("data/prompts") }
fn default_raw_dir() -> PathBuf { PathBuf::from("results/raw") }
fn default_scored_dir() -> PathBuf { PathBuf::from("results/scored") }
fn default_summary_dir() -> PathBuf { PathBuf::from("results/summary") }
fn default_stats_dir() -> PathBuf { PathBuf::from("results/stats") }

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            datasets: default_datasets(),
            models: default_models(),
            comparisons: default_comparisons(),
            families: IndexMap::new(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            raw_dir: default_raw_dir(),
            scored_dir: default_scored_dir(),
            summary_dir: default_summary_dir(),
            stats_dir: default_stats_dir(),
        }
    }
}

impl PathsConfig {
    /// Resolve every relative path against `base`
    pub fn rooted_at(&self, base: &Path) -> Self {
        Self {
            prompts_dir: base.join(&self.prompts_dir),
            raw_dir: base.join(&self.raw_dir),
            scored_dir: base.join(&self.scored_dir),
            summary_dir: base.join(&self.summary_dir),
            stats_dir: base.join(&self.stats_dir),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = [
            "config/study.toml",
            "../config/study.toml",
            "consistency-benchmark/config/study.toml",
        ];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("Loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Answer family for a dataset, honouring overrides
    pub fn family_for(&self, dataset: &str) -> AnswerFamily {
        self.study
            .families
            .get(dataset)
            .copied()
            .unwrap_or_else(|| AnswerFamily::for_dataset(dataset))
    }

    /// Human-readable label for a model key
    pub fn model_label<'a>(&'a self, model: &'a str) -> &'a str {
        match self.models.get(model) {
            Some(m) if !m.display_name.is_empty() => &m.display_name,
            _ => model,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut models = IndexMap::new();
        for (key, tag, display_name) in [
            ("phi3_mini", "phi3:mini", "Phi-3 Mini (3.8B)"),
            ("llama3.2", "llama3.2:3b", "Llama 3.2 (3B)"),
            ("gemma2", "gemma2:2b", "Gemma 2 (2B)"),
            ("mistral", "mistral:7b", "Mistral (7B)"),
        ] {
            models.insert(key.to_string(), ModelConfig {
                tag: tag.to_string(),
                display_name: display_name.to_string(),
            });
        }

        Self {
            study: StudyConfig::default(),
            paths: PathsConfig::default(),
            models,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
