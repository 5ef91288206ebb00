//! Consistency Benchmark CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use consistency_benchmark::{
    config::Config,
    corpus::{AnswerFamily, PromptStyle},
    reporting::{print_master_summary, print_significance_key},
    runner::{ConsoleProgress, StudyRunner},
};

#[derive(Parser)]
#[command(name = "consistency-benchmark")]
#[command(about = "Answer consistency of LLMs across prompt phrasings on clinical QA datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score raw responses and write the master summary
    Score {
        /// Comma-separated dataset list (default: from config)
        #[arg(short, long)]
        datasets: Option<String>,

        /// Comma-separated model list (default: from config)
        #[arg(short, long)]
        models: Option<String>,
    },

    /// Run the configured model comparisons on scored results
    Compare {
        /// Comma-separated dataset list (default: from config)
        #[arg(short, long)]
        datasets: Option<String>,
    },

    /// Score, then compare
    Run,

    /// List prompt styles, dataset answer families and configured models
    ListStyles,

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/study.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("consistency_benchmark=debug,info")
    } else {
        EnvFilter::new("consistency_benchmark=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match cli.command {
        Commands::Score { datasets, models } => {
            let runner = runner(cli.config)?;
            let datasets = split_list(datasets, &runner.config().study.datasets);
            let models = split_list(models, &runner.config().study.models);

            let outcome = runner.score(&datasets, &models)?;
            match &outcome.summary_file {
                Some(path) => {
                    println!("\nMaster summary saved to {}", path.display());
                    print_master_summary(&outcome.summaries, runner.config());
                }
                None => println!("\nNo results found to score"),
            }
        }

        Commands::Compare { datasets } => {
            let runner = runner(cli.config)?;
            let datasets = split_list(datasets, &runner.config().study.datasets);

            let outcome = runner.compare(&datasets)?;
            match &outcome.significance_file {
                Some(path) => println!("\nSaved to {}", path.display()),
                None => println!("\nNo scored results to compare"),
            }
            print_significance_key();
        }

        Commands::Run => {
            let runner = runner(cli.config)?;
            let report = runner.run()?;

            println!("\n=== Run {} ===", report.run_id);
            println!("Scored:  {}", report.scored.len());
            println!("Skipped: {}", report.skipped.len());
            println!("Significance rows: {}", report.significance_rows);
            for test in &report.degenerate_tests {
                println!("  Omitted agreement test (identical scores): {}", test);
            }
            print_significance_key();
        }

        Commands::ListStyles => {
            list_styles(cli.config)?;
        }

        Commands::InitConfig { output } => {
            init_config(output)?;
        }
    }

    Ok(())
}

fn runner(config: Option<PathBuf>) -> Result<StudyRunner, Box<dyn std::error::Error>> {
    let runner = StudyRunner::from_config_path(config.as_deref())?;
    let progress = ConsoleProgress::new(runner.config());
    Ok(runner.with_progress(progress))
}

fn split_list(arg: Option<String>, default: &[String]) -> Vec<String> {
    match arg {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.to_vec(),
    }
}

fn list_styles(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    println!("Prompt Styles ({}):", PromptStyle::COUNT);
    println!("{:-<60}", "");
    for style in PromptStyle::ALL {
        println!("  {}. {}", style.index() + 1, style);
    }

    println!("\nDatasets:");
    println!("{:-<60}", "");
    for dataset in &config.study.datasets {
        let family = config.family_for(dataset);
        let tokens = match family {
            AnswerFamily::MultipleChoice => "A/B/C/D",
            AnswerFamily::YesNoMaybe => "yes/no/maybe",
        };
        println!("  {} | {} | {}", dataset, family.as_str(), tokens);
    }

    println!("\nModels:");
    println!("{:-<60}", "");
    for (key, model) in &config.models {
        println!("  {} | {} | {}", key, model.tag, config.model_label(key));
    }

    Ok(())
}

fn init_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();

    // Ensure parent directory exists
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save_toml(&output)?;
    println!("Configuration written to: {}", output.display());
    Ok(())
}
