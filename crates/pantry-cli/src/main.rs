use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Pantry CLI - agentic Q&A for packaged food products", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ~/.config/pantry/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question about a packaged food product
    Ask {
        /// The question text
        question: String,
        /// Session id for multi-turn conversations
        #[arg(long, default_value = "cli")]
        session: String,
    },
    /// Validate a UPC-A code locally
    Validate {
        /// The UPC code, separators tolerated
        code: String,
    },
    /// Search the local product knowledge base
    Retrieve {
        /// The search query
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::utils::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ask { question, session } => {
            commands::ask::run(&config, &session, &question).await?
        }
        Commands::Validate { code } => commands::validate::run(&code),
        Commands::Retrieve { query } => commands::retrieve::run(&config, &query).await?,
    }

    Ok(())
}
