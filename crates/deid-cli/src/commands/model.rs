use anyhow::{Result, bail};
use deid_config::Config;
use deid_model::{InstallOutcome, ModelManager};

use crate::cli::ModelCommands;
use crate::commands::progress_printer;

pub async fn handle(cmd: ModelCommands, config: &Config) -> Result<()> {
    let manager = ModelManager::new(config.model_spec(), config.download.clone());
    match cmd {
        ModelCommands::Status => status(&manager),
        ModelCommands::Ensure { download } => {
            let progress = progress_printer();
            let outcome = manager
                .ensure_available_with_progress(download, Some(&progress))
                .await;
            finish(outcome)
        }
        ModelCommands::Download => {
            let progress = progress_printer();
            let outcome = manager.download(Some(&progress)).await;
            finish(outcome)
        }
    }
}

fn status(manager: &ModelManager) -> Result<()> {
    let spec = manager.spec();
    println!("Model: {} {}", spec.name, spec.version);
    println!("  Location: {}", spec.model_path().display());
    println!("  Source: {}", spec.archive_url());
    if let Some(size) = spec.approximate_size_mb() {
        println!("  Download size: ~{:.0} MB", size);
    }
    if manager.is_available() {
        println!("  Status: ✓ installed");
    } else {
        println!("  Status: not installed (run `deid model download`)");
    }
    Ok(())
}

pub(crate) fn finish(outcome: InstallOutcome) -> Result<()> {
    if outcome.success {
        println!("✓ {}", outcome.message);
        Ok(())
    } else {
        bail!("{}", outcome.message)
    }
}
