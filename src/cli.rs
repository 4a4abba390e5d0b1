use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::ReplayResult;

#[derive(Parser)]
#[command(name = "sicbo")]
#[command(version = "0.1.0")]
#[command(about = "High/Low dice outcome prediction service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "SICBO_CONFIG_DIR")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the refresh loop and the HTTP API
    Serve {
        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch the feed once and print the prediction as JSON
    Predict,
    /// Walk-forward replay over a JSON dump of feed rows
    Replay {
        /// Dump file (feed response body or a bare array of rows)
        file: PathBuf,
        /// Sessions observed before the first scored prediction
        #[arg(short, long, default_value = "10")]
        warmup: usize,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Human-readable replay summary
pub fn format_replay(result: &ReplayResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Sessions: {}  Predictions: {}  Fallbacks: {}  Triples: {}\n",
        result.sessions, result.total_predictions, result.fallback_predictions, result.triples
    ));
    out.push_str(&format!(
        "Ensemble hit rate: {:.2}% ({}/{})\n",
        result.hit_rate, result.correct, result.total_predictions
    ));
    out.push_str(&format!("{:<16} {:>8} {:>8} {:>9}\n", "model", "votes", "correct", "hit rate"));
    for (model, acc) in &result.by_model {
        out.push_str(&format!(
            "{:<16} {:>8} {:>8} {:>8.2}%\n",
            model, acc.predictions, acc.correct, acc.hit_rate
        ));
    }
    out
}
