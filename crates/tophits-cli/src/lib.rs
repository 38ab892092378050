//! CLI for tophits
//!
//! Reads a JSON array of shard partials (file or stdin) and either reduces
//! them into one merged result or checks that they could be reduced.
//! Configuration comes from the `TOPHITS_*` environment variables, then an
//! optional JSON5 file.

#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use tophits_core::{
    ConfigOverrides, ReduceConfig, ReduceError, TopHitsMerged, TopHitsPartial, TopHitsReducer,
    describe_sort, read_partials,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("reduce failed ({kind}): {0}", kind = .0.error_type())]
    Reduce(#[from] ReduceError),
    #[error("cannot encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "tophits", version, about = "Merge per-shard top-hits partials")]
pub struct Cli {
    /// Log at debug level (overrides `RUST_LOG`).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reduce partials into one globally ranked result.
    Reduce {
        #[command(flatten)]
        source: SourceArgs,
        /// Pretty-print the merged JSON.
        #[arg(long, default_value_t = false)]
        pretty: bool,
        /// Reduce in groups of this many partials, then reduce the groups.
        #[arg(long = "fan-in")]
        fan_in: Option<usize>,
    },
    /// Validate partials without producing hits.
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON file holding an array of partials; stdin when omitted.
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
    /// JSON5 file overriding the environment configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Summary printed by `tophits check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub partials: usize,
    pub hits: usize,
    pub total_hits: u64,
    pub from: usize,
    pub size: usize,
    pub sort: String,
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match execute(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            err_exit_code(&err)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// `2` for bad invocations and mismatched requests, `1` otherwise.
#[must_use]
pub const fn err_exit_code(err: &CliError) -> i32 {
    match err {
        CliError::InvalidArgument(_) => 2,
        CliError::Reduce(inner) if inner.is_configuration_error() => 2,
        CliError::Reduce(ReduceError::InvalidFanIn(_) | ReduceError::Config(_)) => 2,
        _ => 1,
    }
}

fn execute(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Reduce {
            source,
            pretty,
            fan_in,
        } => {
            let config = load_config(source.config.as_deref())?;
            let partials = read_input(source.input.as_deref())?;
            let merged = reduce_partials(partials, config, fan_in)?;
            tracing::info!(
                returned = merged.hits.len(),
                total_hits = merged.total_hits,
                "reduced partials"
            );
            write_json(&merged, pretty)
        }
        Commands::Check { source } => {
            let config = load_config(source.config.as_deref())?;
            let partials = read_input(source.input.as_deref())?;
            let report = check_partials(partials, config)?;
            write_json(&report, true)
        }
    }
}

/// Environment config with the JSON5 file at `path` applied on top.
pub fn load_config(path: Option<&Path>) -> CliResult<ReduceConfig> {
    let config = ReduceConfig::from_env();
    let Some(path) = path else {
        return Ok(config);
    };
    let text = fs::read_to_string(path).map_err(|e| {
        CliError::InvalidArgument(format!("cannot read config {}: {e}", path.display()))
    })?;
    let overrides = ConfigOverrides::parse_json5(&text)?;
    tracing::debug!(path = %path.display(), ?overrides, "applied config file");
    Ok(config.with_overrides(overrides))
}

fn read_input(path: Option<&Path>) -> CliResult<Vec<TopHitsPartial>> {
    let partials = match path {
        Some(path) => {
            let file = fs::File::open(path).map_err(|e| {
                CliError::InvalidArgument(format!("cannot open input {}: {e}", path.display()))
            })?;
            read_partials(file)?
        }
        None => read_partials(io::stdin().lock())?,
    };
    Ok(partials)
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> CliResult<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut out = io::stdout().lock();
    writeln!(out, "{json}")?;
    Ok(())
}

/// Parse `text` as a JSON array of partials and reduce it.
pub fn reduce_json(
    text: &str,
    config: ReduceConfig,
    fan_in: Option<usize>,
) -> CliResult<TopHitsMerged> {
    reduce_partials(read_partials(text.as_bytes())?, config, fan_in)
}

/// Reduce `partials` in one stage, or as a tree when `fan_in` is set.
pub fn reduce_partials(
    partials: Vec<TopHitsPartial>,
    config: ReduceConfig,
    fan_in: Option<usize>,
) -> CliResult<TopHitsMerged> {
    let reducer = TopHitsReducer::new(config);
    let merged = match fan_in {
        Some(fan_in) => reducer.reduce_tree(partials, fan_in)?,
        None => reducer.reduce(partials)?,
    };
    Ok(merged)
}

/// Run every reduce validation on `text`, with shard order checking forced on.
pub fn check_json(text: &str, config: ReduceConfig) -> CliResult<CheckReport> {
    check_partials(read_partials(text.as_bytes())?, config)
}

/// Validate `partials` as [`check_json`] does.
pub fn check_partials(partials: Vec<TopHitsPartial>, config: ReduceConfig) -> CliResult<CheckReport> {
    let hits = partials.iter().map(|p| p.hits.len()).sum();
    let reducer = TopHitsReducer::new(ReduceConfig {
        validate_shard_order: true,
        ..config
    });
    let merged = reducer.reduce(partials)?;
    Ok(CheckReport {
        partials: merged.stats.partials,
        hits,
        total_hits: merged.total_hits,
        from: merged.from,
        size: merged.size,
        sort: describe_sort(&merged.sort),
    })
}
