//! Dealbook CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! dealbook-cli migrate
//!
//! # Load the default promotion catalog
//! dealbook-cli seed
//!
//! # Replace the catalog with promotions from another file
//! dealbook-cli seed --file path/to/promotions.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Load promotions from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dealbook-cli")]
#[command(author, version, about = "Dealbook CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load promotions from a YAML file
    Seed {
        /// Path to the YAML file
        #[arg(short, long, default_value = commands::seed::DEFAULT_SEED_FILE)]
        file: String,

        /// Delete every existing promotion (and its favorites) first
        #[arg(long)]
        clear: bool,

        /// Validate the file without touching the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Seed {
            file,
            clear,
            dry_run,
        } => commands::seed::promotions(&file, clear, dry_run).await?,
    }
    Ok(())
}
