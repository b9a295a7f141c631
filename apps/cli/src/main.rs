//! Verdict CLI - train classifiers and serve cached predictions
//!
//! This CLI provides a `verdict` command over the model manager, backed by
//! the deterministic random reference classifier.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Verdict CLI - model lifecycle and prediction cache management
#[derive(Parser, Debug)]
#[command(
    name = "verdict",
    author,
    version,
    about = "Verdict - classifier training and cached inference"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Workspace directory (overrides VERDICT_WORKSPACE)
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a new model and wait for it to finish
    ///
    /// Reads a JSONL file where every line is an object with at least
    /// `text` and a boolean `label`.
    Train {
        /// JSONL training data
        #[arg(long)]
        input: PathBuf,

        /// Language of the training data
        #[arg(long, default_value = "english")]
        language: String,

        /// Training parameter as key=value (value parsed as JSON when possible)
        #[arg(long = "param", value_parser = commands::parse_param)]
        params: Vec<(String, serde_json::Value)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run inference with a trained model
    ///
    /// Reads a JSONL file where every line is an object with at least `text`.
    Infer {
        /// Model identifier
        model_id: String,

        /// JSONL items to classify
        #[arg(long)]
        input: PathBuf,

        /// Bypass the prediction cache
        #[arg(long)]
        no_cache: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a model's training status
    Status {
        /// Model identifier
        model_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a model's metadata (language and training parameters)
    Metadata {
        /// Model identifier
        model_id: String,
    },

    /// List all models with their status
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how many predictions are stored on disk for a model
    Predictions {
        /// Model identifier
        model_id: String,
    },

    /// Export a trained model
    Export {
        /// Model identifier
        model_id: String,
    },

    /// Delete a model and its stored predictions
    Delete {
        /// Model identifier
        model_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let workspace = commands::resolve_workspace(args.workspace)?;
    let manager = commands::open_manager(&workspace)?;

    match args.command {
        Command::Train {
            input,
            language,
            params,
            json,
        } => commands::train::execute(&manager, &input, &language, params, json).await,
        Command::Infer {
            model_id,
            input,
            no_cache,
            json,
        } => commands::infer::execute(&manager, &model_id, &input, !no_cache, json).await,
        Command::Status { model_id, json } => commands::models::status(&manager, &model_id, json),
        Command::Metadata { model_id } => commands::models::metadata(&manager, &model_id),
        Command::List { json } => commands::models::list(&manager, json),
        Command::Predictions { model_id } => commands::models::predictions(&manager, &model_id),
        Command::Export { model_id } => commands::models::export(&manager, &model_id),
        Command::Delete { model_id } => commands::models::delete(&manager, &model_id),
    }
}
