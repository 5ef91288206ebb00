//! Results reporting

pub mod csv_writer;

pub use csv_writer::{
    format_bool, format_decimal, ReportError, ReportResult, ScoredCsv, SignificanceCsv,
    SummaryCsv,
};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{DatasetSummary, Metric, PairComparison, SignificanceResult};
use crate::config::Config;
use crate::corpus::PromptStyle;

pub const SIGNIFICANCE_KEY: &str = "*** p<0.001, ** p<0.01, * p<0.05, ns=not significant";

/// JSON record of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    /// `dataset/model` pairs that were scored
    pub scored: Vec<String>,
    /// `dataset/model` pairs skipped for missing data
    pub skipped: Vec<String>,
    pub summary_file: Option<String>,
    pub significance_file: Option<String>,
    pub significance_rows: usize,
    /// Agreement tests left out because their input was degenerate
    pub degenerate_tests: Vec<String>,
}

impl RunReport {
    /// Write to JSON file
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Print the key metrics of one dataset/model summary
pub fn print_dataset_summary(summary: &DatasetSummary) {
    println!("\n  Dataset: {}", summary.dataset);
    println!("    Mean Consistency:     {}", format_decimal(summary.mean_agreement, 3));
    println!("    Fully Consistent:     {}%", format_decimal(summary.fully_consistent_pct, 1));
    println!("    Overall Accuracy:     {}%", format_decimal(summary.overall_accuracy, 1));
    println!("    Unknown Rate:         {}%", format_decimal(summary.unknown_rate, 1));
    println!("    Accuracy by style:");
    for style in PromptStyle::ALL {
        println!(
            "      {:12}: {}%",
            style.as_str(),
            format_decimal(summary.style_accuracy(style), 1)
        );
    }
}

/// Print every summary as one table, models shown by their display label
pub fn print_master_summary(summaries: &[DatasetSummary], config: &Config) {
    println!("\n=== MASTER SUMMARY ===");
    println!("{:-<102}", "");
    print!(
        "{:<10} {:<18} {:>5} {:>8} {:>8} {:>8} {:>8}",
        "Dataset", "Model", "N", "Mean", "Std", "Full%", "Acc%"
    );
    for style in PromptStyle::ALL {
        print!(" {:>6}", &style.as_str()[..style.as_str().len().min(6)]);
    }
    println!();
    println!("{:-<102}", "");

    for s in summaries {
        println!("{}", format_summary_row(s, config));
    }
    println!("{:-<102}", "");
}

/// One master-summary line
pub fn format_summary_row(s: &DatasetSummary, config: &Config) -> String {
    let mut row = format!(
        "{:<10} {:<18} {:>5} {:>8.3} {:>8} {:>8.1} {:>8.1}",
        s.dataset,
        config.model_label(&s.model),
        s.n_questions,
        s.mean_agreement,
        s.std_agreement
            .map(|std| format!("{:.3}", std))
            .unwrap_or_else(|| "-".to_string()),
        s.fully_consistent_pct,
        s.overall_accuracy,
    );
    for acc in s.style_accuracy {
        row.push_str(&format!(" {:>6.1}", acc));
    }
    row
}

/// Print both test families for one dataset
pub fn print_significance_report(dataset: &str, comparisons: &[PairComparison], config: &Config) {
    println!("\n=== {} ===", dataset.to_uppercase());

    println!("\nConsistency Score Comparisons (Wilcoxon signed-rank test):");
    for comparison in comparisons {
        match &comparison.agreement {
            Ok(result) => println!("  {}", format_test_line(result, config)),
            Err(degenerate) => println!(
                "  {} vs {}: skipped ({})",
                config.model_label(&comparison.accuracy.model1),
                config.model_label(&comparison.accuracy.model2),
                degenerate
            ),
        }
    }

    println!("\nAccuracy Comparisons (McNemar test):");
    for comparison in comparisons {
        println!("  {}", format_test_line(&comparison.accuracy, config));
    }
}

/// `Llama 3.2 (3B) vs phi3_mini: W=12.0, p=0.0312 *` or `chi2=` for the
/// accuracy test. Models without a display name keep their key.
pub fn format_test_line(result: &SignificanceResult, config: &Config) -> String {
    let statistic = match result.metric {
        Metric::Agreement => format!("W={:.1}", result.statistic),
        Metric::Accuracy => format!("chi2={:.3}", result.statistic),
    };
    format!(
        "{} vs {}: {}, p={:.4} {}",
        config.model_label(&result.model1),
        config.model_label(&result.model2),
        statistic,
        result.p_value,
        result.significance
    )
}

pub fn print_significance_key() {
    println!("\nSignificance key: {}", SIGNIFICANCE_KEY);
}
