//! Production planner CLI - database migrations and order replay.
//!
//! # Usage
//!
//! ```bash
//! # Run planner database migrations
//! prodplan-cli migrate
//!
//! # Feed an approved order into the daily summaries
//! prodplan-cli approve --tenant acme --file order.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `approve` - Aggregate an approved order from a JSON file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "prodplan-cli")]
#[command(author, version, about = "Production planner CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run planner database migrations
    Migrate,
    /// Aggregate an approved order into the daily summaries
    Approve {
        /// Path to the order approval JSON
        #[arg(short, long)]
        file: PathBuf,

        /// Tenant that owns the order
        #[arg(short, long)]
        tenant: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Approve { file, tenant } => {
            commands::approve::run(&file, &tenant).await?;
        }
    }
    Ok(())
}
