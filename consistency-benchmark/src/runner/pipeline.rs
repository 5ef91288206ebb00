//! Study pipeline: raw responses -> scored tables -> summaries -> significance tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::analysis::{
    AnalysisError, DatasetSummary, PairComparison, ScoreAggregator, ScoredQuestion,
    SignificanceResult, SignificanceTester, SummaryBuilder,
};
use crate::config::{Config, ConfigError};
use crate::corpus::QuestionId;
use crate::providers::{
    JsonCorpus, JsonResponses, ProviderError, QuestionCorpusProvider, ResponseProvider,
};
use crate::reporting::{
    print_dataset_summary, print_significance_report, ReportError, RunReport, ScoredCsv,
    SignificanceCsv, SummaryCsv,
};

pub const SUMMARY_FILE: &str = "master_summary.csv";
pub const SIGNIFICANCE_FILE: &str = "significance_tests.csv";

/// Errors that stop a pipeline stage
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Analysis error for {context}: {source}")]
    Analysis {
        context: String,
        #[source]
        source: AnalysisError,
    },

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Progress callback for the pipeline stages
pub trait ProgressCallback {
    fn on_model_start(&self, model: &str);
    fn on_pair_scored(&self, summary: &DatasetSummary, scored_file: &Path);
    fn on_pair_skipped(&self, dataset: &str, model: &str);
    fn on_dataset_compared(&self, dataset: &str, comparisons: &[PairComparison]);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_model_start(&self, _model: &str) {}
    fn on_pair_scored(&self, _summary: &DatasetSummary, _scored_file: &Path) {}
    fn on_pair_skipped(&self, _dataset: &str, _model: &str) {}
    fn on_dataset_compared(&self, _dataset: &str, _comparisons: &[PairComparison]) {}
}

/// Console progress callback, naming models by their configured label
pub struct ConsoleProgress {
    config: Config,
}

impl ConsoleProgress {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_model_start(&self, model: &str) {
        println!("\n=== Scoring {} ===", self.config.model_label(model));
    }

    fn on_pair_scored(&self, summary: &DatasetSummary, scored_file: &Path) {
        print_dataset_summary(summary);
        println!("    Saved scored results to {}", scored_file.display());
    }

    fn on_pair_skipped(&self, dataset: &str, model: &str) {
        println!("\n  Dataset: {} - no results for {}, skipping", dataset, model);
    }

    fn on_dataset_compared(&self, dataset: &str, comparisons: &[PairComparison]) {
        print_significance_report(dataset, comparisons, &self.config);
    }
}

/// What the scoring stage produced
#[derive(Debug, Default)]
pub struct ScoreOutcome {
    pub summaries: Vec<DatasetSummary>,
    /// (dataset, model) pairs with no raw results
    pub skipped: Vec<(String, String)>,
    pub summary_file: Option<PathBuf>,
}

/// What the comparison stage produced
#[derive(Debug, Default)]
pub struct CompareOutcome {
    /// Comparisons per dataset, in configured order
    pub comparisons: IndexMap<String, Vec<PairComparison>>,
    /// Rows written to the significance table
    pub results: Vec<SignificanceResult>,
    /// `dataset: model1 vs model2` for each omitted agreement test
    pub degenerate: Vec<String>,
    pub significance_file: Option<PathBuf>,
}

/// Drives scoring and comparison over the configured study
pub struct StudyRunner {
    config: Config,
    responses: Box<dyn ResponseProvider>,
    corpus: Option<Box<dyn QuestionCorpusProvider>>,
    progress: Box<dyn ProgressCallback>,
}

impl StudyRunner {
    /// Runner reading the JSON files under the configured paths
    pub fn new(config: Config) -> Self {
        let responses = JsonResponses::new(&config.paths.raw_dir);
        let corpus = JsonCorpus::new(&config.paths.prompts_dir);
        Self {
            config,
            responses: Box::new(responses),
            corpus: Some(Box::new(corpus)),
            progress: Box::new(NoOpProgress),
        }
    }

    /// Load the config at `path`, or search the default locations
    pub fn from_config_path(path: Option<&Path>) -> PipelineResult<Self> {
        let config = match path {
            Some(p) => Config::from_file(p)?,
            None => Config::load_or_default(),
        };
        Ok(Self::new(config))
    }

    pub fn with_responses(mut self, provider: impl ResponseProvider + 'static) -> Self {
        self.responses = Box::new(provider);
        self
    }

    pub fn with_corpus(mut self, provider: impl QuestionCorpusProvider + 'static) -> Self {
        self.corpus = Some(Box::new(provider));
        self
    }

    pub fn without_corpus(mut self) -> Self {
        self.corpus = None;
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressCallback + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scored_path(&self, dataset: &str, model: &str) -> PathBuf {
        self.config
            .paths
            .scored_dir
            .join(format!("{}_{}.csv", dataset, model))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.config.paths.summary_dir.join(SUMMARY_FILE)
    }

    pub fn significance_path(&self) -> PathBuf {
        self.config.paths.stats_dir.join(SIGNIFICANCE_FILE)
    }

    /// Score every (model, dataset) pair with raw results and write the
    /// scored tables and master summary
    pub fn score(&self, datasets: &[String], models: &[String]) -> PipelineResult<ScoreOutcome> {
        let mut outcome = ScoreOutcome::default();
        let mut question_text: HashMap<&str, HashMap<QuestionId, String>> = HashMap::new();

        for model in models {
            self.progress.on_model_start(model);

            for dataset in datasets {
                if !self.responses.has_responses(dataset, model) {
                    tracing::warn!("No results for {} / {}, skipping", dataset, model);
                    self.progress.on_pair_skipped(dataset, model);
                    outcome.skipped.push((dataset.clone(), model.clone()));
                    continue;
                }

                let records = self.responses.responses(dataset, model)?;
                let family = self.config.family_for(dataset);
                let mut scored = ScoreAggregator::score_all(&records, family);

                if scored.is_empty() {
                    tracing::warn!("Results for {} / {} are empty, skipping", dataset, model);
                    self.progress.on_pair_skipped(dataset, model);
                    outcome.skipped.push((dataset.clone(), model.clone()));
                    continue;
                }

                let texts = question_text
                    .entry(dataset.as_str())
                    .or_insert_with(|| self.load_question_text(dataset));
                backfill_questions(&mut scored, texts);

                let scored_file = self.scored_path(dataset, model);
                ScoredCsv::write(&scored_file, dataset, model, &scored)?;

                let summary = SummaryBuilder::summarize(&scored, dataset, model).map_err(|e| {
                    PipelineError::Analysis {
                        context: format!("{} / {}", dataset, model),
                        source: e,
                    }
                })?;
                tracing::info!(
                    "Scored {} / {}: {} questions, mean agreement {:.3}",
                    dataset,
                    model,
                    summary.n_questions,
                    summary.mean_agreement
                );

                self.progress.on_pair_scored(&summary, &scored_file);
                outcome.summaries.push(summary);
            }
        }

        if !outcome.summaries.is_empty() {
            let path = self.summary_path();
            SummaryCsv::write(&path, &outcome.summaries)?;
            tracing::info!("Master summary saved to {}", path.display());
            outcome.summary_file = Some(path);
        }

        Ok(outcome)
    }

    /// Run the configured model comparisons from the scored tables
    pub fn compare(&self, datasets: &[String]) -> PipelineResult<CompareOutcome> {
        let mut outcome = CompareOutcome::default();

        for dataset in datasets {
            let tester = SignificanceTester::new(dataset.as_str());
            let mut comparisons = Vec::new();

            for pair in &self.config.study.comparisons {
                let (model1, model2) = (&pair.0, &pair.1);
                let Some(scored1) = self.load_scored(dataset, model1)? else {
                    continue;
                };
                let Some(scored2) = self.load_scored(dataset, model2)? else {
                    continue;
                };

                let comparison = tester
                    .compare(model1, &scored1, model2, &scored2)
                    .map_err(|e| PipelineError::Analysis {
                        context: format!("{}: {} vs {}", dataset, model1, model2),
                        source: e,
                    })?;

                if let Err(degenerate) = &comparison.agreement {
                    tracing::warn!(
                        "{}: {} vs {} agreement test omitted: {}",
                        dataset,
                        model1,
                        model2,
                        degenerate
                    );
                    outcome
                        .degenerate
                        .push(format!("{}: {} vs {}", dataset, model1, model2));
                }

                outcome
                    .results
                    .extend(comparison.results().into_iter().cloned());
                comparisons.push(comparison);
            }

            if comparisons.is_empty() {
                tracing::warn!("No comparable model pairs for {}", dataset);
                continue;
            }

            self.progress.on_dataset_compared(dataset, &comparisons);
            outcome.comparisons.insert(dataset.clone(), comparisons);
        }

        if !outcome.results.is_empty() {
            let path = self.significance_path();
            SignificanceCsv::write(&path, &outcome.results)?;
            tracing::info!(
                "Saved {} significance rows to {}",
                outcome.results.len(),
                path.display()
            );
            outcome.significance_file = Some(path);
        }

        Ok(outcome)
    }

    /// Score and compare everything the config names, then write a run report
    pub fn run(&self) -> PipelineResult<RunReport> {
        let started_at = Utc::now();
        let run_id = run_id(&started_at);
        tracing::info!("Starting run {}", run_id);

        let scoring = self.score(&self.config.study.datasets, &self.config.study.models)?;
        let comparing = self.compare(&self.config.study.datasets)?;

        let report = RunReport {
            run_id: run_id.clone(),
            started_at: started_at.to_rfc3339(),
            completed_at: Utc::now().to_rfc3339(),
            scored: scoring
                .summaries
                .iter()
                .map(|s| format!("{}/{}", s.dataset, s.model))
                .collect(),
            skipped: scoring
                .skipped
                .iter()
                .map(|(d, m)| format!("{}/{}", d, m))
                .collect(),
            summary_file: scoring.summary_file.map(|p| p.display().to_string()),
            significance_file: comparing.significance_file.map(|p| p.display().to_string()),
            significance_rows: comparing.results.len(),
            degenerate_tests: comparing.degenerate,
        };

        let report_path = self
            .config
            .paths
            .summary_dir
            .join(format!("run_{}.json", run_id));
        std::fs::create_dir_all(&self.config.paths.summary_dir)?;
        report.write_to_file(&report_path)?;
        tracing::info!("Run report written to {}", report_path.display());

        Ok(report)
    }

    fn load_scored(&self, dataset: &str, model: &str) -> PipelineResult<Option<Vec<ScoredQuestion>>> {
        let path = self.scored_path(dataset, model);
        if !path.is_file() {
            tracing::warn!("No scored results for {} / {} at {}", dataset, model, path.display());
            return Ok(None);
        }
        tracing::debug!("Loading scored results from {}", path.display());
        Ok(Some(ScoredCsv::read(&path)?))
    }

    /// Question text by id from the prompt corpus, empty when unavailable
    fn load_question_text(&self, dataset: &str) -> HashMap<QuestionId, String> {
        let Some(corpus) = &self.corpus else {
            return HashMap::new();
        };

        match corpus.questions(dataset) {
            Ok(bundles) => bundles
                .into_iter()
                .map(|bundle| (bundle.id, bundle.question))
                .collect(),
            Err(ProviderError::Unavailable { .. }) => {
                tracing::debug!("{} has no prompts for {}", corpus.name(), dataset);
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!("Could not read prompts for {}: {}", dataset, e);
                HashMap::new()
            }
        }
    }
}

/// Fill in question previews the raw results left blank
fn backfill_questions(scored: &mut [ScoredQuestion], texts: &HashMap<QuestionId, String>) {
    if texts.is_empty() {
        return;
    }
    for q in scored.iter_mut().filter(|q| q.question.is_empty()) {
        if let Some(text) = texts.get(&q.id) {
            q.question = text
                .chars()
                .take(crate::analysis::QUESTION_PREVIEW_CHARS)
                .collect();
        }
    }
}

fn run_id(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
