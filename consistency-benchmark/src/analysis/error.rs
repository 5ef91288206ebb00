//! Analysis error types

use crate::corpus::QuestionId;

/// A statistical test whose input gives it no defined result
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DegenerateInput {
    #[error("all {n} paired differences are zero; the signed-rank test is undefined")]
    IdenticalSamples { n: usize },
}

/// Errors raised by the analysis components
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("cannot summarize an empty collection of scored questions")]
    EmptyCollection,

    #[error("paired collections differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("paired collections misaligned at position {position}: {left} vs {right}")]
    MisalignedQuestion {
        position: usize,
        left: QuestionId,
        right: QuestionId,
    },

    #[error(transparent)]
    Degenerate(#[from] DegenerateInput),

    #[error("distribution error: {0}")]
    Distribution(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
