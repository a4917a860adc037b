//! # mandible-train
//!
//! Offline training pipeline: fits every candidate on a labeled measurement
//! table, reports the comparison and persists the winning bundle.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mandible_classifier::logic::artifacts::{self, ModelArtifact};
use mandible_classifier::logic::dataset::{
    load_csv, LoadOptions, DEFAULT_SEED, DEFAULT_TEST_SIZE,
};
use mandible_classifier::logic::dataset::loader::{DEFAULT_EXCLUDED_COLUMNS, DEFAULT_LABEL_COLUMN};
use mandible_classifier::logic::training::{self, TrainingOptions, TrainingOutcome};

#[derive(Parser)]
#[command(name = "mandible-train")]
#[command(about = "Train and select a mandible sex classifier", long_about = None)]
struct Cli {
    /// Labeled measurement table (CSV with a header row)
    data: PathBuf,

    /// Directory receiving the artifact bundle
    #[arg(short, long, default_value = "artifacts")]
    output_dir: PathBuf,

    /// Column holding the F/M label
    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    label_column: String,

    /// Identifier column to drop (repeatable)
    #[arg(long = "exclude", default_values = DEFAULT_EXCLUDED_COLUMNS)]
    excluded_columns: Vec<String>,

    /// Held-out fraction
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    test_size: f64,

    /// Seed for the split and every stochastic learner
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Also persist every candidate model
    #[arg(long)]
    save_all: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mandible_classifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    ensure!(
        cli.test_size > 0.0 && cli.test_size < 1.0,
        "--test-size must be between 0 and 1, got {}",
        cli.test_size
    );

    let load_options = LoadOptions {
        label_column: cli.label_column,
        excluded_columns: cli.excluded_columns,
    };
    let dataset = load_csv(&cli.data, &load_options)
        .with_context(|| format!("loading {}", cli.data.display()))?;

    let options = TrainingOptions {
        test_size: cli.test_size,
        seed: cli.seed,
        ..TrainingOptions::default()
    };
    let outcome = training::run(&dataset, &options).context("training failed")?;

    print_report(&outcome);

    let extra: Vec<ModelArtifact> = if cli.save_all {
        outcome
            .candidates
            .iter()
            .map(|e| ModelArtifact {
                name: e.candidate.name().to_string(),
                kind: e.candidate.kind,
                accuracy: e.accuracy,
                trained_samples: outcome.n_train,
                model: e.candidate.model.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let run_id = artifacts::save_bundle(&cli.output_dir, &outcome.bundle, &extra)
        .with_context(|| format!("saving artifacts to {}", cli.output_dir.display()))?;

    println!();
    println!("Saved run {} to {}", run_id, cli.output_dir.display());
    println!("  {}", artifacts::MODEL_FILE);
    println!("  {}", artifacts::SCALER_FILE);
    println!("  {}", artifacts::CODEC_FILE);
    println!("  {}", artifacts::FEATURE_NAMES_FILE);
    for model in &extra {
        println!("  {}", artifacts::candidate_file(model.kind));
    }

    // Smoke check: the saved bundle must serve the sample vector
    let sample = outcome.sample_prediction().context("predicting the sample vector")?;
    println!();
    println!("Sample prediction: {} ({:.2}% confidence)", sample.sex.full_name(), sample.confidence);
    println!(
        "  Female {:.2}%  Male {:.2}%",
        sample.probabilities.female, sample.probabilities.male
    );

    Ok(())
}

fn print_report(outcome: &TrainingOutcome) {
    let rule = "=".repeat(60);

    println!("{}", rule);
    println!("MODEL COMPARISON ({} train / {} test)", outcome.n_train, outcome.n_test);
    println!("{}", rule);
    println!("{:<4} {:<22} {:>10} {:>10}", "Rank", "Model", "Accuracy", "Percent");
    for (rank, row) in outcome.comparison.iter().enumerate() {
        println!(
            "{:<4} {:<22} {:>10.4} {:>9.2}%",
            rank + 1,
            row.name,
            row.accuracy,
            row.accuracy * 100.0
        );
    }

    let best = outcome.best();
    println!();
    println!("Best model: {} ({:.2}%)", best.name, best.accuracy * 100.0);

    println!();
    println!("Classification report");
    println!("{:<8} {:>10} {:>10} {:>10} {:>8}", "", "precision", "recall", "f1-score", "support");
    for class in &outcome.report {
        println!(
            "{:<8} {:>10.2} {:>10.2} {:>10.2} {:>8}",
            class.label, class.precision, class.recall, class.f1, class.support
        );
    }

    let classes = &outcome.bundle.codec.classes;
    println!();
    println!("Confusion matrix (rows = actual, columns = predicted)");
    print!("{:<8}", "");
    for label in classes {
        print!("{:>8}", label);
    }
    println!();
    for (label, row) in classes.iter().zip(&outcome.confusion.matrix) {
        print!("{:<8}", label);
        for count in row {
            print!("{:>8}", count);
        }
        println!();
    }
}
