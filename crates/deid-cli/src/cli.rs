use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deid")]
#[command(about = "De-identify clinical free text", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: the user config directory)
    #[arg(long, global = true, env = "DEID_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the recognition model
    #[command(subcommand)]
    Model(ModelCommands),

    /// Anonymize a CSV file
    Anonymize(AnonymizeArgs),

    /// Manage the persisted blacklist
    #[command(subcommand)]
    Terms(TermsCommands),
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Show where the model lives and whether it is installed
    Status,

    /// Check the model is installed, optionally downloading it
    Ensure {
        /// Download the model when it is missing
        #[arg(long)]
        download: bool,
    },

    /// Download and install the model, replacing any existing copy
    Download,
}

#[derive(Args)]
pub struct AnonymizeArgs {
    /// Input CSV with a value column and an optional category column
    pub input: PathBuf,

    /// Output CSV
    #[arg(short, long)]
    pub output: PathBuf,

    /// Session blacklist entries (comma, space, hyphen, underscore, semicolon
    /// or pipe separated; repeatable)
    #[arg(long = "term", value_name = "TERMS")]
    pub terms: Vec<String>,

    /// Literal matching instead of fuzzy matching
    #[arg(long)]
    pub exact: bool,

    /// Fuzzy similarity threshold, 0-100 (default from config: 85)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Ignore the persisted blacklist
    #[arg(long)]
    pub no_persisted_terms: bool,

    /// Column holding the values to anonymize
    #[arg(long)]
    pub value_column: Option<String>,

    /// Column holding the record category
    #[arg(long)]
    pub category_column: Option<String>,

    /// Download the model first if it is missing
    #[arg(long)]
    pub download: bool,
}

#[derive(Subcommand)]
pub enum TermsCommands {
    /// List persisted terms
    List,

    /// Add terms to the persisted blacklist
    Add {
        /// Terms to add (split like --term)
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Remove a term from the persisted blacklist
    Remove {
        /// Exact term to remove
        term: String,
    },
}
