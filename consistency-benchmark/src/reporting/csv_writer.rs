//! CSV tables for scored questions, dataset summaries and significance tests
//!
//! Column names and value formatting follow the tables downstream plotting
//! and reporting already read: `True`/`False` booleans, `UNKNOWN` for a
//! missing answer, and rounding applied only here, on write.

use std::fs;
use std::path::Path;

use crate::analysis::{DatasetSummary, ScoredQuestion, SignificanceResult, StyleOutcome};
use crate::corpus::{Answer, PromptStyle, QuestionId};

/// Decimals for per-question scores
pub const SCORE_DECIMALS: usize = 3;
/// Decimals for summary means and standard deviations
pub const SUMMARY_DECIMALS: usize = 3;
/// Decimals for percentages
pub const PERCENT_DECIMALS: usize = 1;
/// Decimals for test statistics
pub const STATISTIC_DECIMALS: usize = 3;
/// Decimals for p-values
pub const P_VALUE_DECIMALS: usize = 4;

/// Errors raised while writing or reading report tables
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid value in row {row}, column '{column}': '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Per-question table, one file per dataset and model
pub struct ScoredCsv;

impl ScoredCsv {
    pub fn headers() -> Vec<String> {
        let mut headers: Vec<String> = [
            "id",
            "question",
            "correct_answer",
            "majority_answer",
            "is_accurate",
            "consistency_score",
            "unknown_rate",
            "dataset",
            "model",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        for style in PromptStyle::ALL {
            headers.push(format!("ans_{}", style));
            headers.push(format!("correct_{}", style));
        }
        headers
    }

    /// Write scored questions in the order given
    pub fn write(
        path: impl AsRef<Path>,
        dataset: &str,
        model: &str,
        scored: &[ScoredQuestion],
    ) -> ReportResult<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(Self::headers())?;

        for q in scored {
            let mut record = vec![
                q.id.to_string(),
                q.question.clone(),
                q.correct_answer.clone(),
                q.majority_answer.to_string(),
                format_bool(q.is_accurate),
                format_decimal(q.agreement_score, SCORE_DECIMALS),
                format_decimal(q.missing_rate, SCORE_DECIMALS),
                dataset.to_string(),
                model.to_string(),
            ];
            for outcome in &q.styles {
                record.push(outcome.answer.to_string());
                record.push(format_bool(outcome.is_correct));
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        tracing::debug!("Wrote {} scored rows to {}", scored.len(), path.display());
        Ok(())
    }

    /// Read a scored table back, preserving row order.
    ///
    /// Scores come back at the precision they were written with.
    pub fn read(path: impl AsRef<Path>) -> ReportResult<Vec<ScoredQuestion>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let columns = Columns::new(reader.headers()?);

        let id = columns.position("id")?;
        let question = columns.position("question")?;
        let correct_answer = columns.position("correct_answer")?;
        let majority_answer = columns.position("majority_answer")?;
        let is_accurate = columns.position("is_accurate")?;
        let consistency = columns.position("consistency_score")?;
        let unknown_rate = columns.position("unknown_rate")?;

        let mut style_columns = Vec::with_capacity(PromptStyle::COUNT);
        for style in PromptStyle::ALL {
            style_columns.push((
                columns.position(&format!("ans_{}", style))?,
                columns.position(&format!("correct_{}", style))?,
                style,
            ));
        }

        let mut scored = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("");

            let mut styles: [StyleOutcome; PromptStyle::COUNT] = Default::default();
            for &(ans, correct, style) in &style_columns {
                styles[style.index()] = StyleOutcome {
                    answer: Answer::from_token(field(ans)),
                    is_correct: parse_bool(field(correct))
                        .ok_or_else(|| invalid(row, columns.name(correct), field(correct)))?,
                };
            }

            scored.push(ScoredQuestion {
                id: QuestionId::new(field(id)),
                question: field(question).to_string(),
                correct_answer: field(correct_answer).to_string(),
                majority_answer: Answer::from_token(field(majority_answer)),
                is_accurate: parse_bool(field(is_accurate))
                    .ok_or_else(|| invalid(row, "is_accurate", field(is_accurate)))?,
                agreement_score: field(consistency)
                    .trim()
                    .parse()
                    .map_err(|_| invalid(row, "consistency_score", field(consistency)))?,
                missing_rate: field(unknown_rate)
                    .trim()
                    .parse()
                    .map_err(|_| invalid(row, "unknown_rate", field(unknown_rate)))?,
                styles,
            });
        }

        Ok(scored)
    }
}

/// One row per dataset and model
pub struct SummaryCsv;

impl SummaryCsv {
    pub fn headers() -> Vec<String> {
        let mut headers: Vec<String> = [
            "dataset",
            "model",
            "n_questions",
            "mean_consistency",
            "std_consistency",
            "fully_consistent",
            "fully_consistent_pct",
            "overall_accuracy",
            "unknown_rate",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        headers.extend(PromptStyle::ALL.iter().map(|s| format!("acc_{}", s)));
        headers
    }

    pub fn write(path: impl AsRef<Path>, summaries: &[DatasetSummary]) -> ReportResult<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(Self::headers())?;

        for s in summaries {
            let mut record = vec![
                s.dataset.clone(),
                s.model.clone(),
                s.n_questions.to_string(),
                format_decimal(s.mean_agreement, SUMMARY_DECIMALS),
                s.std_agreement
                    .map(|std| format_decimal(std, SUMMARY_DECIMALS))
                    .unwrap_or_default(),
                s.fully_consistent.to_string(),
                format_decimal(s.fully_consistent_pct, PERCENT_DECIMALS),
                format_decimal(s.overall_accuracy, PERCENT_DECIMALS),
                format_decimal(s.unknown_rate, PERCENT_DECIMALS),
            ];
            record.extend(
                s.style_accuracy
                    .iter()
                    .map(|&acc| format_decimal(acc, PERCENT_DECIMALS)),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        tracing::debug!("Wrote {} summary rows to {}", summaries.len(), path.display());
        Ok(())
    }
}

/// One row per (dataset, model pair, metric)
pub struct SignificanceCsv;

impl SignificanceCsv {
    pub const HEADERS: [&'static str; 7] = [
        "dataset",
        "model1",
        "model2",
        "metric",
        "statistic",
        "p_value",
        "significance",
    ];

    pub fn write(path: impl AsRef<Path>, results: &[SignificanceResult]) -> ReportResult<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(Self::HEADERS)?;

        for r in results {
            writer.write_record([
                r.dataset.as_str(),
                r.model1.as_str(),
                r.model2.as_str(),
                r.metric.as_str(),
                format_decimal(r.statistic, STATISTIC_DECIMALS).as_str(),
                format_decimal(r.p_value, P_VALUE_DECIMALS).as_str(),
                r.significance.label(),
            ])?;
        }

        writer.flush()?;
        tracing::debug!("Wrote {} significance rows to {}", results.len(), path.display());
        Ok(())
    }
}

/// Round to `decimals` places and drop trailing zeros, keeping one decimal.
///
/// `0.6` -> `"0.6"`, `1.0` -> `"1.0"`, `2.0 / 3.0` -> `"0.667"` at 3 places.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    let mut s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.push('0');
        }
    }
    if s == "-0.0" {
        s.remove(0);
    }
    s
}

pub fn format_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "True" | "true" | "TRUE" | "1" => Some(true),
        "False" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(row: usize, column: &str, value: &str) -> ReportError {
    ReportError::InvalidValue {
        // 1-based, after the header line
        row: row + 1,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

struct Columns {
    names: Vec<String>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Self {
            names: headers.iter().map(|h| h.trim().to_string()).collect(),
        }
    }

    fn position(&self, name: &str) -> ReportResult<usize> {
        self.names
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
    }

    fn name(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or("")
    }
}
