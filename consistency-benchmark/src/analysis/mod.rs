//! Consistency analysis: per-question scoring, summaries and significance tests

pub mod error;
pub mod scoring;
pub mod significance;
pub mod summary;

pub use error::{AnalysisError, AnalysisResult, DegenerateInput};
pub use scoring::{
    agreement_score, majority_answer, missing_rate, ScoreAggregator, ScoredQuestion,
    StyleOutcome, QUESTION_PREVIEW_CHARS,
};
pub use significance::{
    discordant_pairs, mcnemar, wilcoxon_signed_rank, Metric, PairComparison,
    SignificanceResult, SignificanceTester, SignificanceTier, TestOutcome,
};
pub use summary::{DatasetSummary, SummaryBuilder};
