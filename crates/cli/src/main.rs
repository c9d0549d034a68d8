//! CrabDesk CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP API server (with the session sweep loop)
//! - `ingest` — Load FAQ entries into the knowledge base from a JSON file
//! - `stats`  — Show session statistics

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "crabdesk",
    about = "CrabDesk — AI customer-support answering service",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest FAQ entries from a JSON file of {question, answer} objects
    Ingest {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show session statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ingest { file } => commands::ingest::run(file).await?,
        Commands::Stats => commands::stats::run().await?,
    }

    Ok(())
}
