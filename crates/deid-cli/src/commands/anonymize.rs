use anyhow::{Context, Result, anyhow};
use deid_config::Config;
use deid_engine::{AnonymizeOptions, Anonymizer};
use deid_model::ModelManager;
use deid_recognizer::RecognitionService;
use deid_storage::{TermStore, combine, parse_input_list, read_dataset, write_dataset};
use std::sync::Arc;
use tracing::info;

use crate::cli::AnonymizeArgs;
use crate::commands::{model, progress_printer};

pub async fn handle(args: AnonymizeArgs, config: &Config) -> Result<()> {
    let dataset = read_dataset(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let session: Vec<String> = args
        .terms
        .iter()
        .flat_map(|t| parse_input_list(t))
        .collect();
    let persisted = if args.no_persisted_terms {
        Vec::new()
    } else {
        TermStore::new(&config.terms.path).load()?
    };
    let blacklist = combine(&session, &persisted);
    info!(
        "Loaded {} rows from {} ({} session terms, {} persisted)",
        dataset.len(),
        args.input.display(),
        session.len(),
        persisted.len()
    );

    let options = AnonymizeOptions {
        fuzzy: config.anonymize.fuzzy && !args.exact,
        threshold: args.threshold.unwrap_or(config.anonymize.threshold),
        value_column: args
            .value_column
            .unwrap_or_else(|| config.anonymize.value_column.clone()),
        category_column: args
            .category_column
            .unwrap_or_else(|| config.anonymize.category_column.clone()),
    };
    if !(0.0..=100.0).contains(&options.threshold) {
        return Err(anyhow!(
            "Threshold must be between 0 and 100, got {}",
            options.threshold
        ));
    }

    if args.download {
        let manager = ModelManager::new(config.model_spec(), config.download.clone());
        let progress = progress_printer();
        let outcome = manager
            .ensure_available_with_progress(true, Some(&progress))
            .await;
        model::finish(outcome)?;
    }

    let service = Arc::new(RecognitionService::with_rules(config.model_spec()));
    let anonymizer = Anonymizer::new(service);

    let rows = dataset.len();
    let terms = blacklist.len();
    let report = tokio::task::spawn_blocking(move || {
        let progress = progress_printer();
        anonymizer.anonymize(&dataset, &blacklist, &options, Some(&progress))
    })
    .await?
    .map_err(|e| {
        if e.is_fatal() {
            anyhow!("{}\nRun `deid model download` or pass --download.", e)
        } else {
            anyhow!(e)
        }
    })?;

    write_dataset(&args.output, &report.dataset)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("✓ Anonymized {} rows with {} blacklist terms", rows, terms);
    println!("  Output: {}", args.output.display());
    println!("  Redacted: {}", report.stats.redacted);
    println!(
        "  Skipped: {} numeric, {} short",
        report.stats.skipped_numeric, report.stats.skipped_short
    );

    let fallbacks = report.fallback_rows();
    if !fallbacks.is_empty() {
        println!(
            "  ⚠ Recognition failed on {} rows, blacklist applied only: {:?}",
            fallbacks.len(),
            fallbacks
        );
    }

    Ok(())
}
