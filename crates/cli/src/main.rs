//! Pola CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! pola-cli migrate
//!
//! # Load the sample catalog (skipped if products already exist)
//! pola-cli seed products --file crates/cli/seeds/products.yaml
//!
//! # Replace the catalog with the seed file
//! pola-cli seed products --clear
//!
//! # Remove every product
//! pola-cli seed clear
//! ```
//!
//! # Environment Variables
//!
//! - `POLA_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pola-cli")]
#[command(author, version, about = "Pola storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a YAML file
    Products {
        /// Path to the YAML seed file
        #[arg(short, long, default_value = "crates/cli/seeds/products.yaml")]
        file: String,

        /// Delete existing products (and the cart lines referencing them) first
        #[arg(long)]
        clear: bool,
    },
    /// Delete every product
    Clear,
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
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => {
                commands::seed::products(&file, clear).await?;
            }
            SeedTarget::Clear => commands::seed::clear().await?,
        },
    }
    Ok(())
}
