//! ephys-gen - Session artifact generator
//!
//! With a session id, generates that session synchronously and fails on a
//! malformed id or unloadable session. Without one, generates every session
//! found under the data directory in parallel and prints a summary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ephys_common::config::{self, Overrides};
use ephys_common::SessionId;
use ephys_gen::{
    default_workers, generate_session, list_session_ids, run_batch, CachePaths, GenOptions,
    RawDataSource,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for ephys-gen
#[derive(Parser, Debug)]
#[command(name = "ephys-gen")]
#[command(about = "Generate cached figures, details and tables for recording sessions")]
#[command(version)]
struct Args {
    /// Session to generate; all sessions when omitted
    session_id: Option<String>,

    /// Raw data root with one directory per session
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Cache root receiving one directory per session
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Sessions generated in parallel (batch mode)
    #[arg(short, long)]
    workers: Option<usize>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also render the raw data overview
    #[arg(long)]
    raw_overview: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = Overrides {
        data_dir: args.data_dir.clone(),
        cache_dir: args.cache_dir.clone(),
        workers: args.workers,
        config_file: args.config.clone(),
    };
    // Configuration warnings are emitted before the real subscriber exists
    let resolved = tracing::subscriber::with_default(
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .finish(),
        || config::resolve(&overrides),
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&resolved.log_level)),
        )
        .init();

    info!("Starting ephys-gen v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", resolved.data_dir.display());
    info!("Cache directory: {}", resolved.cache_dir.display());

    let source = RawDataSource::new(&resolved.data_dir);
    let paths = CachePaths::new(&resolved.cache_dir);
    let options = GenOptions {
        raw_overview: args.raw_overview,
    };

    match args.session_id {
        Some(token) => {
            let session_id = SessionId::parse(&token)?;
            let report = generate_session(&source, &paths, session_id, &options)
                .with_context(|| format!("Failed to generate session {}", session_id))?;
            for failure in report.failures() {
                error!(session_id = %session_id, artifact = %failure.kind, "Missing after run");
            }
            println!("{}: {}", session_id, report.display_string());
        }
        None => {
            let session_ids = list_session_ids(&resolved.data_dir)?;
            let workers = resolved.workers.unwrap_or_else(default_workers);
            let report = run_batch(Arc::new(source), paths, session_ids, workers, options).await;
            for outcome in &report.sessions {
                match &outcome.result {
                    Ok(session) => println!("{}: {}", outcome.session_id, session.display_string()),
                    Err(e) => println!("{}: FAILED ({})", outcome.session_id, e),
                }
            }
            println!("{}", report.display_string());
        }
    }

    Ok(())
}
