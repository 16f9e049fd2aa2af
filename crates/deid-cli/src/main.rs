mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use deid_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        cli::Commands::Model(model_cmd) => commands::model::handle(model_cmd, &config).await,
        cli::Commands::Anonymize(args) => commands::anonymize::handle(args, &config).await,
        cli::Commands::Terms(terms_cmd) => commands::terms::handle(terms_cmd, &config),
    }
}
