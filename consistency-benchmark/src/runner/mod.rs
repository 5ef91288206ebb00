//! Study execution

pub mod pipeline;

pub use pipeline::{
    CompareOutcome, ConsoleProgress, NoOpProgress, PipelineError, PipelineResult,
    ProgressCallback, ScoreOutcome, StudyRunner, SIGNIFICANCE_FILE, SUMMARY_FILE,
};
