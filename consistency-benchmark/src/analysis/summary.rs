//! Per dataset/model summary statistics

use serde::{Deserialize, Serialize};

use super::error::{AnalysisError, AnalysisResult};
use super::scoring::ScoredQuestion;
use crate::corpus::PromptStyle;

/// Aggregate statistics for one (dataset, model) pair.
///
/// Percentages are on a 0-100 scale; agreement statistics stay on 0-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub dataset: String,
    pub model: String,
    pub n_questions: usize,
    pub mean_agreement: f64,
    /// Sample standard deviation (n - 1); `None` for a single question
    pub std_agreement: Option<f64>,
    /// Questions with agreement exactly 1.0
    pub fully_consistent: usize,
    pub fully_consistent_pct: f64,
    pub overall_accuracy: f64,
    /// Mean missing-rate as a percentage
    pub unknown_rate: f64,
    /// Correct-answer percentage per style, indexed by [`PromptStyle::index`]
    pub style_accuracy: [f64; PromptStyle::COUNT],
}

impl DatasetSummary {
    pub fn style_accuracy(&self, style: PromptStyle) -> f64 {
        self.style_accuracy[style.index()]
    }
}

/// Reduces scored questions to a [`DatasetSummary`]
pub struct SummaryBuilder;

impl SummaryBuilder {
    /// Summarize a scored collection.
    ///
    /// An empty collection is rejected with [`AnalysisError::EmptyCollection`].
    pub fn summarize(
        scored: &[ScoredQuestion],
        dataset: &str,
        model: &str,
    ) -> AnalysisResult<DatasetSummary> {
        if scored.is_empty() {
            return Err(AnalysisError::EmptyCollection);
        }

        let agreement: Vec<f64> = scored.iter().map(|q| q.agreement_score).collect();
        let fully_consistent = scored.iter().filter(|q| q.is_fully_consistent()).count();
        let missing: Vec<f64> = scored.iter().map(|q| q.missing_rate).collect();

        let style_accuracy = PromptStyle::ALL.map(|style| {
            percentage(scored.iter().filter(|q| q.style(style).is_correct).count(), scored.len())
        });

        Ok(DatasetSummary {
            dataset: dataset.to_string(),
            model: model.to_string(),
            n_questions: scored.len(),
            mean_agreement: mean(&agreement),
            std_agreement: sample_std_dev(&agreement),
            fully_consistent,
            fully_consistent_pct: percentage(fully_consistent, scored.len()),
            overall_accuracy: percentage(
                scored.iter().filter(|q| q.is_accurate).count(),
                scored.len(),
            ),
            unknown_rate: mean(&missing) * 100.0,
            style_accuracy,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}
