//! Paired significance tests between two models on the same question set
//!
//! Agreement scores are compared with the Wilcoxon signed-rank test and
//! accuracy flags with a continuity-corrected McNemar test.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use super::error::{AnalysisError, AnalysisResult, DegenerateInput};
use super::scoring::ScoredQuestion;

/// Largest sample for which the signed-rank null distribution is enumerated
pub const EXACT_WILCOXON_MAX_N: usize = 50;

/// Paired differences closer than this are treated as equal
const TIE_EPSILON: f64 = 1e-9;

/// The quantity a significance test compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Agreement,
    Accuracy,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Agreement => "agreement",
            Metric::Accuracy => "accuracy",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete label for a p-value against the 0.001 / 0.01 / 0.05 thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignificanceTier {
    /// p < 0.001
    #[serde(rename = "***")]
    Highly,
    /// p < 0.01
    #[serde(rename = "**")]
    Very,
    /// p < 0.05
    #[serde(rename = "*")]
    Significant,
    #[serde(rename = "ns")]
    NotSignificant,
}

impl SignificanceTier {
    /// Classify a p-value. Thresholds are strict, so p = 0.001 is `**`.
    pub fn from_p_value(p: f64) -> Self {
        if p < 0.001 {
            Self::Highly
        } else if p < 0.01 {
            Self::Very
        } else if p < 0.05 {
            Self::Significant
        } else {
            Self::NotSignificant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Highly => "***",
            Self::Very => "**",
            Self::Significant => "*",
            Self::NotSignificant => "ns",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "***" => Some(Self::Highly),
            "**" => Some(Self::Very),
            "*" => Some(Self::Significant),
            "ns" => Some(Self::NotSignificant),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignificanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Statistic and p-value of a single test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// One row of the significance table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub dataset: String,
    pub model1: String,
    pub model2: String,
    pub metric: Metric,
    pub statistic: f64,
    pub p_value: f64,
    pub significance: SignificanceTier,
}

/// Both tests for one model pair.
///
/// The agreement test can be undefined on its own (identical scores) while
/// the accuracy test still has a well-defined result.
#[derive(Debug, Clone)]
pub struct PairComparison {
    pub agreement: Result<SignificanceResult, DegenerateInput>,
    pub accuracy: SignificanceResult,
}

impl PairComparison {
    /// Results with a defined outcome, agreement first
    pub fn results(&self) -> Vec<&SignificanceResult> {
        let mut rows = Vec::with_capacity(2);
        if let Ok(agreement) = &self.agreement {
            rows.push(agreement);
        }
        rows.push(&self.accuracy);
        rows
    }
}

/// Compares two models' scored collections for one dataset
pub struct SignificanceTester {
    dataset: String,
}

impl SignificanceTester {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
        }
    }

    /// Run both paired tests.
    ///
    /// The collections must list the same question identifiers in the same
    /// order; they are paired by position and never re-sorted.
    pub fn compare(
        &self,
        model_a: &str,
        scored_a: &[ScoredQuestion],
        model_b: &str,
        scored_b: &[ScoredQuestion],
    ) -> AnalysisResult<PairComparison> {
        check_alignment(scored_a, scored_b)?;

        let agreement_a: Vec<f64> = scored_a.iter().map(|q| q.agreement_score).collect();
        let agreement_b: Vec<f64> = scored_b.iter().map(|q| q.agreement_score).collect();

        let agreement = match wilcoxon_signed_rank(&agreement_a, &agreement_b) {
            Ok(outcome) => Ok(self.result(model_a, model_b, Metric::Agreement, outcome)),
            Err(AnalysisError::Degenerate(degenerate)) => Err(degenerate),
            Err(other) => return Err(other),
        };

        let accurate_a: Vec<bool> = scored_a.iter().map(|q| q.is_accurate).collect();
        let accurate_b: Vec<bool> = scored_b.iter().map(|q| q.is_accurate).collect();
        let (a_only, b_only) = discordant_pairs(&accurate_a, &accurate_b);
        let accuracy = self.result(model_a, model_b, Metric::Accuracy, mcnemar(a_only, b_only)?);

        Ok(PairComparison {
            agreement,
            accuracy,
        })
    }

    fn result(
        &self,
        model_a: &str,
        model_b: &str,
        metric: Metric,
        outcome: TestOutcome,
    ) -> SignificanceResult {
        SignificanceResult {
            dataset: self.dataset.clone(),
            model1: model_a.to_string(),
            model2: model_b.to_string(),
            metric,
            statistic: outcome.statistic,
            p_value: outcome.p_value,
            significance: SignificanceTier::from_p_value(outcome.p_value),
        }
    }
}

fn check_alignment(a: &[ScoredQuestion], b: &[ScoredQuestion]) -> AnalysisResult<()> {
    if a.len() != b.len() {
        return Err(AnalysisError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    if let Some((position, (qa, qb))) = a
        .iter()
        .zip(b)
        .enumerate()
        .find(|(_, (qa, qb))| qa.id != qb.id)
    {
        return Err(AnalysisError::MisalignedQuestion {
            position,
            left: qa.id.clone(),
            right: qb.id.clone(),
        });
    }

    Ok(())
}

/// Count positions where only A is correct and where only B is correct
pub fn discordant_pairs(a: &[bool], b: &[bool]) -> (usize, usize) {
    a.iter().zip(b).fold((0, 0), |(a_only, b_only), (&x, &y)| match (x, y) {
        (true, false) => (a_only + 1, b_only),
        (false, true) => (a_only, b_only + 1),
        _ => (a_only, b_only),
    })
}

/// Continuity-corrected McNemar test on discordant pair counts.
///
/// With no discordant pairs the models agree on every question and the
/// result is defined as statistic 0, p = 1.0.
pub fn mcnemar(a_only: usize, b_only: usize) -> AnalysisResult<TestOutcome> {
    let discordant = a_only + b_only;
    if discordant == 0 {
        return Ok(TestOutcome {
            statistic: 0.0,
            p_value: 1.0,
        });
    }

    let diff = (a_only as f64 - b_only as f64).abs();
    let statistic = (diff - 1.0).powi(2) / discordant as f64;

    let chi2 = ChiSquared::new(1.0).map_err(|e| AnalysisError::Distribution(e.to_string()))?;
    Ok(TestOutcome {
        statistic,
        p_value: chi2.sf(statistic),
    })
}

/// Two-sided Wilcoxon signed-rank test on paired samples.
///
/// Zero differences are dropped and tied magnitudes get average ranks. The
/// statistic is min(W+, W-). The p-value comes from the exact null
/// distribution when at most [`EXACT_WILCOXON_MAX_N`] differences remain and
/// none were zero or tied, otherwise from the normal approximation with tie
/// correction. Fails with [`DegenerateInput::IdenticalSamples`] when every
/// difference is zero.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> AnalysisResult<TestOutcome> {
    if a.len() != b.len() {
        return Err(AnalysisError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| d.abs() > TIE_EPSILON)
        .collect();
    let had_zeros = diffs.len() < a.len();

    let n = diffs.len();
    if n == 0 {
        return Err(DegenerateInput::IdenticalSamples { n: a.len() }.into());
    }

    let (ranks, tie_groups) = average_ranks(&diffs);
    let w_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let total = (n * (n + 1)) as f64 / 2.0;
    let statistic = w_plus.min(total - w_plus);

    let has_ties = tie_groups.iter().any(|&t| t > 1);
    let p_value = if n <= EXACT_WILCOXON_MAX_N && !has_ties && !had_zeros {
        exact_signed_rank_p(n, statistic)
    } else {
        normal_signed_rank_p(n, statistic, &tie_groups)?
    };

    Ok(TestOutcome {
        statistic,
        p_value,
    })
}

/// Average ranks of |d| (1-based) and the size of every tie group
fn average_ranks(diffs: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..diffs.len()).collect();
    order.sort_by(|&i, &j| {
        diffs[i]
            .abs()
            .partial_cmp(&diffs[j].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; diffs.len()];
    let mut tie_groups = Vec::new();
    let mut start = 0;

    while start < order.len() {
        let anchor = diffs[order[start]].abs();
        let mut end = start + 1;
        while end < order.len() && (diffs[order[end]].abs() - anchor).abs() <= TIE_EPSILON {
            end += 1;
        }

        // Ranks start..end (0-based) share the mean of start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        tie_groups.push(end - start);
        start = end;
    }

    (ranks, tie_groups)
}

/// Two-sided p-value from the exact distribution of W+ over all 2^n sign
/// assignments of ranks 1..=n
fn exact_signed_rank_p(n: usize, statistic: f64) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;

    for rank in 1..=n {
        for w in (rank..=max_sum).rev() {
            counts[w] += counts[w - rank];
        }
    }

    let t = statistic.round() as usize;
    let total = 2f64.powi(n as i32);
    let lower_tail: f64 = counts[..=t.min(max_sum)].iter().sum::<f64>() / total;

    (2.0 * lower_tail).min(1.0)
}

fn normal_signed_rank_p(n: usize, statistic: f64, tie_groups: &[usize]) -> AnalysisResult<f64> {
    let n = n as f64;
    let mean = n * (n + 1.0) / 4.0;
    let tie_correction: f64 = tie_groups
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum::<f64>()
        / 48.0;
    let variance = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_correction;
    let z = (statistic - mean) / variance.sqrt();

    let normal = Normal::new(0.0, 1.0).map_err(|e| AnalysisError::Distribution(e.to_string()))?;
    Ok((2.0 * normal.sf(z.abs())).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ScoreAggregator;
    use crate::corpus::{Answer, AnswerSet, PromptStyle, QuestionId};

    fn scored_with(id: &str, agreement_tokens: [&str; 5], truth: &str) -> ScoredQuestion {
        let set: AnswerSet = PromptStyle::ALL
            .iter()
            .zip(agreement_tokens)
            .map(|(&style, t)| (style, Answer::from_token(t)))
            .collect();
        ScoreAggregator::score(id, &set, truth)
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(SignificanceTier::from_p_value(0.0009), SignificanceTier::Highly);
        assert_eq!(SignificanceTier::from_p_value(0.001), SignificanceTier::Very);
        assert_eq!(SignificanceTier::from_p_value(0.0011), SignificanceTier::Very);
        assert_eq!(SignificanceTier::from_p_value(0.01), SignificanceTier::Significant);
        assert_eq!(SignificanceTier::from_p_value(0.049), SignificanceTier::Significant);
        assert_eq!(SignificanceTier::from_p_value(0.05), SignificanceTier::NotSignificant);
        assert_eq!(SignificanceTier::from_p_value(0.051), SignificanceTier::NotSignificant);
        assert_eq!(SignificanceTier::from_p_value(1.0).label(), "ns");
    }

    #[test]
    fn test_mcnemar_known_value() {
        let outcome = mcnemar(5, 1).unwrap();
        assert!((outcome.statistic - 1.5).abs() < 1e-12);
        assert!((outcome.p_value - 0.2207).abs() < 1e-4);
        assert_eq!(
            SignificanceTier::from_p_value(outcome.p_value),
            SignificanceTier::NotSignificant
        );
    }

    #[test]
    fn test_mcnemar_no_discordant_pairs() {
        let outcome = mcnemar(0, 0).unwrap();
        assert_eq!(outcome.statistic, 0.0);
        assert_eq!(outcome.p_value, 1.0);
    }

    #[test]
    fn test_mcnemar_single_discordant_pair() {
        // (|1 - 0| - 1)^2 / 1 = 0 -> survival at 0 is 1
        let outcome = mcnemar(1, 0).unwrap();
        assert_eq!(outcome.statistic, 0.0);
        assert!((outcome.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_discordant_pairs() {
        let a = [true, true, false, false, true];
        let b = [false, true, true, false, false];
        assert_eq!(discordant_pairs(&a, &b), (2, 1));
    }

    #[test]
    fn test_wilcoxon_identical_is_degenerate() {
        let scores = [0.6, 1.0, 0.2];
        let err = wilcoxon_signed_rank(&scores, &scores).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Degenerate(DegenerateInput::IdenticalSamples { n: 3 })
        ));
    }

    #[test]
    fn test_wilcoxon_exact_small_sample() {
        // Differences 1..=5 all positive: W- = 0, P(W <= 0) = 1/32
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [0.0; 5];
        let outcome = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(outcome.statistic, 0.0);
        assert!((outcome.p_value - 2.0 / 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_wilcoxon_exact_mixed_signs() {
        // Differences: +1, -2, +3, +4 -> W+ = 8, W- = 2, T = 2
        // P(W+ <= 2) for n = 4: sums {0, 1, 2} -> 3 of 16
        let a = [1.0, 0.0, 3.0, 4.0];
        let b = [0.0, 2.0, 0.0, 0.0];
        let outcome = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(outcome.statistic, 2.0);
        assert!((outcome.p_value - 6.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_wilcoxon_normal_approximation_with_ties() {
        // Ten differences of +0.2 and two of -0.2: one tie group of 12
        let mut a = vec![0.8; 10];
        a.extend([0.4, 0.4]);
        let mut b = vec![0.6; 10];
        b.extend([0.6, 0.6]);

        let outcome = wilcoxon_signed_rank(&a, &b).unwrap();
        // All ranks average to 6.5; W- = 13
        assert!((outcome.statistic - 13.0).abs() < 1e-9);

        let n = 12.0f64;
        let mean = n * (n + 1.0) / 4.0;
        let var = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - (12.0f64.powi(3) - 12.0) / 48.0;
        let z = (13.0 - mean) / var.sqrt();
        let normal = Normal::new(0.0, 1.0).unwrap();
        let expected = 2.0 * normal.sf(z.abs());
        assert!((outcome.p_value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_average_ranks() {
        let (ranks, groups) = average_ranks(&[-0.4, 0.2, 0.2, 1.0]);
        assert_eq!(ranks, vec![3.0, 1.5, 1.5, 4.0]);
        assert_eq!(groups, vec![2, 1, 1]);
    }

    #[test]
    fn test_compare_rejects_length_mismatch() {
        let a = vec![scored_with("1", ["A"; 5], "A")];
        let b: Vec<ScoredQuestion> = Vec::new();
        let err = SignificanceTester::new("medqa").compare("m1", &a, "m2", &b).unwrap_err();
        assert!(matches!(err, AnalysisError::LengthMismatch { left: 1, right: 0 }));
    }

    #[test]
    fn test_compare_rejects_misaligned_ids() {
        let a = vec![scored_with("1", ["A"; 5], "A"), scored_with("2", ["B"; 5], "B")];
        let b = vec![scored_with("2", ["B"; 5], "B"), scored_with("1", ["A"; 5], "A")];
        let err = SignificanceTester::new("medqa").compare("m1", &a, "m2", &b).unwrap_err();
        match err {
            AnalysisError::MisalignedQuestion { position, left, right } => {
                assert_eq!(position, 0);
                assert_eq!(left, QuestionId::new("1"));
                assert_eq!(right, QuestionId::new("2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compare_identical_models() {
        let a = vec![
            scored_with("1", ["A", "A", "B", "A", "A"], "A"),
            scored_with("2", ["C", "D", "C", "C", "UNKNOWN"], "D"),
        ];
        let comparison = SignificanceTester::new("medqa")
            .compare("llama3.2", &a, "phi3_mini", &a)
            .unwrap();

        assert!(matches!(
            comparison.agreement,
            Err(DegenerateInput::IdenticalSamples { n: 2 })
        ));
        assert_eq!(comparison.accuracy.metric, Metric::Accuracy);
        assert_eq!(comparison.accuracy.statistic, 0.0);
        assert_eq!(comparison.accuracy.p_value, 1.0);
        assert_eq!(comparison.accuracy.significance, SignificanceTier::NotSignificant);
        assert_eq!(comparison.results().len(), 1);
    }

    #[test]
    fn test_compare_produces_both_rows() {
        let a = vec![
            scored_with("1", ["A"; 5], "A"),
            scored_with("2", ["B", "B", "B", "C", "C"], "B"),
            scored_with("3", ["D"; 5], "C"),
        ];
        let b = vec![
            scored_with("1", ["A", "B", "A", "B", "C"], "B"),
            scored_with("2", ["B"; 5], "B"),
            scored_with("3", ["C", "C", "C", "C", "D"], "C"),
        ];

        let comparison = SignificanceTester::new("medmcqa")
            .compare("gemma2", &a, "mistral", &b)
            .unwrap();

        let agreement = comparison.agreement.as_ref().unwrap();
        assert_eq!(agreement.dataset, "medmcqa");
        assert_eq!(agreement.model1, "gemma2");
        assert_eq!(agreement.model2, "mistral");
        assert_eq!(agreement.metric, Metric::Agreement);
        assert!(agreement.p_value > 0.0 && agreement.p_value <= 1.0);

        // a correct on 1, 2; b correct on 2, 3 -> a_only = 1, b_only = 1
        assert_eq!(comparison.accuracy.statistic, 1.0 / 2.0);
        assert_eq!(comparison.results().len(), 2);
    }

    #[test]
    fn test_tier_serializes_as_label() {
        let json = serde_json::to_string(&SignificanceTier::Very).unwrap();
        assert_eq!(json, "\"**\"");
        assert_eq!(SignificanceTier::from_label("*"), Some(SignificanceTier::Significant));
    }
}
