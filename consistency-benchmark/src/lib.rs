//! Prompt-Phrasing Consistency Benchmark for clinical question answering
//!
//! Each question of a clinical QA dataset is posed to a model in five
//! phrasings. This crate measures how consistently the model answers across
//! those phrasings and whether the differences between models are
//! statistically significant.
//!
//! # Features
//!
//! - Per-question scoring: majority answer, agreement, missing-answer rate
//!   and per-style correctness
//! - Dataset summaries per model
//! - Paired Wilcoxon signed-rank (agreement) and McNemar (accuracy) tests
//! - CSV tables compatible with existing downstream plotting
//!
//! Question generation and model inference are not part of this crate; their
//! output is consumed through [`providers::QuestionCorpusProvider`] and
//! [`providers::ResponseProvider`].
//!
//! # Agreement denominator
//!
//! Agreement and missing-rate divide by the number of styles an answer set
//! actually carries. When upstream collection drops a style for a question,
//! that question is scored over four styles instead of five. Whether dropped
//! styles should count against agreement is still open.
//!
//! # Example
//!
//! ```
//! use consistency_benchmark::prelude::*;
//!
//! let answers: AnswerSet = [
//!     (PromptStyle::Original, "A"),
//!     (PromptStyle::Formal, "B"),
//!     (PromptStyle::Simplified, "B"),
//!     (PromptStyle::Roleplay, "B"),
//!     (PromptStyle::Direct, "A"),
//! ]
//! .into_iter()
//! .map(|(style, token)| (style, Answer::from_token(token)))
//! .collect();
//!
//! let scored = ScoreAggregator::score("q1", &answers, "B");
//! assert_eq!(scored.majority_answer, Answer::from_token("B"));
//! assert!((scored.agreement_score - 0.6).abs() < 1e-12);
//! assert!(scored.is_accurate);
//! ```

pub mod analysis;
pub mod config;
pub mod corpus;
pub mod providers;
pub mod reporting;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::analysis::{
        AnalysisError, AnalysisResult, DatasetSummary, DegenerateInput, Metric,
        PairComparison, ScoreAggregator, ScoredQuestion, SignificanceResult,
        SignificanceTester, SignificanceTier, SummaryBuilder,
    };
    pub use crate::config::{ComparisonPair, Config};
    pub use crate::corpus::{Answer, AnswerFamily, AnswerSet, PromptStyle, QuestionId, StyleSlot};
    pub use crate::providers::{
        JsonCorpus, JsonResponses, ProviderError, QuestionCorpusProvider, ResponseProvider,
    };
    pub use crate::reporting::{ScoredCsv, SignificanceCsv, SummaryCsv};
    pub use crate::runner::{ConsoleProgress, NoOpProgress, StudyRunner};
}
