//! Vitrina CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the catalog and session tables
//! vitrina-cli migrate
//!
//! # Load categories and products from a YAML file
//! vitrina-cli seed catalog.yaml --clear
//!
//! # Hash the operator password for ADMIN_PASSWORD_HASH
//! echo -n 'secret' | vitrina-cli admin hash-password
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog from YAML
//! - `admin hash-password` - Produce an Argon2id PHC string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrina-cli")]
#[command(author, version, about = "Vitrina CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (catalog tables and session stores)
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,

        /// Delete existing products and categories first
        #[arg(long)]
        clear: bool,
    },
    /// Manage the operator account
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Read a password from stdin and print its Argon2id hash
    HashPassword,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so `admin hash-password` output stays pipeable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

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
        Commands::Seed { file, clear } => commands::seed::catalog(&file, clear).await?,
        Commands::Admin { action } => match action {
            AdminAction::HashPassword => commands::admin::hash_password()?,
        },
    }
    Ok(())
}
