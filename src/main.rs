//! Command-line entry point: `dryad-dl <identifier>...`

use clap::Parser;
use dryad_dl::{Config, DatasetOutcome, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Download the latest version of Dryad datasets as zip archives
///
/// Credentials are read from CLIENT_ID and CLIENT_SECRET, the output location
/// from PARENT_DIRECTORY. A `.env` file in the current directory is honored.
#[derive(Parser, Debug)]
#[command(name = "dryad-dl", version, about)]
struct Args {
    /// Dataset identifiers (the part after `doi:10.5061/dryad.`)
    identifiers: Vec<String>,

    /// Override PARENT_DIRECTORY
    #[arg(long)]
    parent_directory: Option<PathBuf>,

    /// Override the Dryad host
    #[arg(long)]
    api_host: Option<Url>,

    /// Override the token cache location
    #[arg(long)]
    token_cache: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.identifiers.is_empty() {
        eprintln!("You need to include at least one Dryad dataset identifier");
        eprintln!("usage: dryad-dl <identifier>...");
        return ExitCode::from(2);
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = args.parent_directory {
        config.parent_directory = Some(dir);
    }
    if let Some(host) = args.api_host {
        config.api_host = host;
    }
    if let Some(path) = args.token_cache {
        config.token_cache_path = path;
    }

    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize");
            return ExitCode::FAILURE;
        }
    };

    let summary = match orchestrator.run(&args.identifiers).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            return ExitCode::FAILURE;
        }
    };

    for report in &summary.datasets {
        match &report.outcome {
            DatasetOutcome::Archived {
                archive,
                files_downloaded,
                files_failed,
            } => println!(
                "{}: {} ({} files, {} failed)",
                report.identifier,
                archive.display(),
                files_downloaded,
                files_failed
            ),
            DatasetOutcome::Failed { error } => {
                println!("{}: FAILED - {}", report.identifier, error)
            }
        }
    }

    ExitCode::SUCCESS
}
