use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Container health diagnostics and compose drift detection.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML file overriding the diagnosis threshold tables.
    #[arg(long, global = true)]
    pub thresholds: Option<PathBuf>,

    /// Path to a YAML file overriding the report message templates.
    #[arg(long, global = true)]
    pub messages: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List observed containers.
    List {
        /// Include stopped containers.
        #[arg(short, long)]
        all: bool,
        /// Daemon-side filter, repeatable (e.g. --filter label=app=web
        /// --filter name=nginx).
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Show resource usage for a container.
    Stats {
        /// Container ID or name.
        container: String,
    },
    /// Fetch and demultiplex container logs.
    Logs {
        /// Container ID or name.
        container: String,
        /// Number of trailing log lines to fetch.
        #[arg(long, default_value_t = 100)]
        tail: u32,
        /// Only lines after this RFC3339 datetime.
        #[arg(long, value_parser = parse_rfc3339)]
        since: Option<i64>,
        /// Only lines before this RFC3339 datetime.
        #[arg(long, value_parser = parse_rfc3339)]
        until: Option<i64>,
        /// Extract leading timestamps into their own field.
        #[arg(long)]
        timestamps: bool,
        /// Disable sensitive-data masking.
        #[arg(long)]
        no_mask: bool,
    },
    /// Decode a captured raw multiplexed log stream from a file.
    Demux {
        /// File holding the raw framed byte stream.
        file: PathBuf,
        /// Extract leading timestamps into their own field.
        #[arg(long)]
        timestamps: bool,
        /// Disable sensitive-data masking.
        #[arg(long)]
        no_mask: bool,
    },
    /// Analyze container state and report symptoms, causes and suggestions.
    Diagnose {
        /// Container ID or name.
        container: String,
        /// Number of trailing log lines to analyze.
        #[arg(long, default_value_t = 200)]
        tail: u32,
    },
    /// Compare a compose file against the observed containers.
    Drift {
        /// Path to the compose file.
        compose_file: PathBuf,
        /// Project name for container-name matching; defaults to the
        /// compose document name.
        #[arg(long)]
        project: Option<String>,
    },
    /// Check connectivity to the Docker daemon.
    Health,
}

/// Splits "key=value" at the first '='; the value may itself contain '='
/// (label filters look like label=app=web).
fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got \"{raw}\"")),
    }
}

/// The daemon wants a unix timestamp; the flag takes RFC3339.
fn parse_rfc3339(raw: &str) -> Result<i64, String> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("expected an RFC3339 datetime: {e}"))
}
