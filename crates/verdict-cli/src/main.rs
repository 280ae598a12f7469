use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use verdict_core::{
    config::Config,
    evaluate::{evaluate, Evaluation},
    pipeline::{LoadedClassifier, VocabularySource},
    records, CaseRecord, Prediction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Flags left unset fall back to the shared configuration (environment,
/// then `.env`).
#[derive(Parser, Debug)]
#[command(
    name = "verdict-classify",
    about = "Predict case outcomes for a CSV of legal case texts with a trained kNN model"
)]
struct Cli {
    /// Case table with case_title, case_text and case_outcome columns
    #[arg(long, env = "VERDICT_INPUT")]
    input: Option<PathBuf>,

    /// Trained model artifact (JSON)
    #[arg(long, env = "VERDICT_MODEL")]
    model: Option<PathBuf>,

    /// Frozen vocabulary artifact (JSON); overrides the model's own
    #[arg(long, env = "VERDICT_VOCABULARY")]
    vocabulary: Option<PathBuf>,

    /// Write the vocabulary used for this run to a file
    #[arg(long)]
    save_vocabulary: Option<PathBuf>,

    /// Feature cap used when the vocabulary has to be refit
    #[arg(long, env = "VERDICT_MAX_FEATURES")]
    max_features: Option<usize>,

    /// Extra verbs, one per line, or tab-separated "form lemma" exceptions
    #[arg(long, env = "VERDICT_LEXICON")]
    lexicon: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Compare predictions with the case_outcome column
    #[arg(long, default_value_t = false)]
    evaluate: bool,
}

struct Resolved {
    input: PathBuf,
    model: PathBuf,
    vocabulary: Option<PathBuf>,
    lexicon: Option<PathBuf>,
    max_features: usize,
}

impl Cli {
    fn resolve(&self, config: &Config) -> Result<Resolved> {
        let model = self
            .model
            .clone()
            .or_else(|| config.model_path.clone())
            .context("no model given: pass --model or set MODEL_PATH")?;
        Ok(Resolved {
            input: self.input.clone().unwrap_or_else(|| config.data_path.clone()),
            model,
            vocabulary: self.vocabulary.clone().or_else(|| config.vocabulary_path.clone()),
            lexicon: self.lexicon.clone().or_else(|| config.lexicon_path.clone()),
            max_features: self.max_features.unwrap_or(config.max_features),
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verdict_cli=info,verdict_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let paths = cli.resolve(&config)?;
    anyhow::ensure!(paths.max_features > 0, "max features must be positive");

    let classifier = LoadedClassifier::load(
        &paths.model,
        paths.vocabulary.as_deref(),
        paths.lexicon.as_deref(),
        paths.max_features,
    )
    .with_context(|| format!("failed to load model from {}", paths.model.display()))?;

    let batch = records::load_csv(&paths.input)
        .with_context(|| format!("failed to read cases from {}", paths.input.display()))?;
    info!(records = batch.len(), input = %paths.input.display(), "loaded cases");

    let report = classifier.run(&batch)?;

    if let Some(out) = &cli.save_vocabulary {
        let vocabulary = match classifier.source() {
            VocabularySource::Frozen(v) => v.clone(),
            VocabularySource::RefitBatch => classifier.pipeline.fit_vocabulary(&batch),
        };
        vocabulary.save(out)?;
        info!(path = %out.display(), terms = vocabulary.len(), "saved vocabulary");
    }

    let evaluation = if cli.evaluate {
        evaluate(&batch, &report.predictions)
    } else {
        None
    };

    match cli.format {
        OutputFormat::Text => print_text(&batch, &report.predictions, evaluation.as_ref()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "predictions": report.predictions,
                "vocabulary_size": report.vocabulary_size,
                "refit_vocabulary": report.refit_vocabulary,
                "empty_documents": report.empty_documents,
                "records_with_links": report.records_with_links,
                "evaluation": evaluation,
            }))?
        ),
    }
    Ok(())
}

fn print_text(batch: &[CaseRecord], predictions: &[Prediction], evaluation: Option<&Evaluation>) {
    for (record, prediction) in batch.iter().zip(predictions) {
        println!("{}\t{}\t{}", prediction.record_id.0, prediction.label, record.title);
    }
    let Some(eval) = evaluation else {
        return;
    };
    println!();
    println!(
        "accuracy {:.4} ({}/{} labelled records)",
        eval.accuracy, eval.correct, eval.evaluated
    );
    for (label, stats) in &eval.per_label {
        println!(
            "  {label:<14} support {:>5}  precision {:.3}  recall {:.3}",
            stats.support,
            stats.precision(),
            stats.recall()
        );
    }
}
