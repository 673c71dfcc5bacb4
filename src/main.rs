//! # DocSyncAI CLI (`docsync`)
//!
//! Runs the DocSyncAI backend server, or drives the comparison pipeline
//! once from the command line.
//!
//! ## Usage
//!
//! ```bash
//! docsync --config ./config/docsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsync serve` | Start the HTTP server |
//! | `docsync compare <file> [<file>]` | Process one or two files and print the summaries |
//! | `docsync extract <file>` | Print the text extracted from a file |
//!
//! Set `COMMET_API_KEY` (in the environment or `.env`) before running
//! `serve` or `compare`; without it every model call degrades to sentinel
//! text.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docsync::config::load_config;
use docsync::extract::extract_reader;
use docsync::pipeline::{process_uploads, Services, Upload};
use docsync::server::run_server;
use docsync::session::{self, Session};

#[derive(Parser)]
#[command(
    name = "docsync",
    about = "DocSyncAI: compare documents and code, then ask questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docsync.toml`. A missing file means every
    /// setting takes its default.
    #[arg(long, global = true, default_value = "./config/docsync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Process one or two files and print their diff summary.
    ///
    /// Two `.py` files get a code comparison, any other pair a document
    /// comparison. A single file is only indexed.
    Compare {
        #[arg(required = true, num_args = 1..=2)]
        files: Vec<PathBuf>,
    },

    /// Print the text extracted from a file.
    Extract { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => run_server(config).await?,
        Commands::Compare { files } => {
            let services = Services::from_config(config)?;
            let mut uploads = Vec::new();
            for path in &files {
                uploads.push(Upload {
                    name: file_name(path)?,
                    bytes: tokio::fs::read(path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                });
            }

            let session = session::shared(Session::empty());
            let outcome = process_uploads(&services, &session, uploads).await?;

            println!("Files: {}", outcome.file_names.join(", "));
            if let Some(summary) = &outcome.diff_summary {
                println!("\nDocument Diff Summary:\n{}", summary);
            }
            if let Some(summary) = &outcome.code_combined_summary {
                println!("\nCode Combined Diff Summary:\n{}", summary);
            }
            if outcome.diff_summary.is_none() && outcome.code_combined_summary.is_none() {
                println!("\nSingle file indexed. No diff available.");
            }
        }
        Commands::Extract { file } => {
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let text = extract_reader(&file_name(&file)?, reader)?;
            println!("{}", text);
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => Ok(name.to_string()),
        None => bail!("Not a file path: {}", path.display()),
    }
}
