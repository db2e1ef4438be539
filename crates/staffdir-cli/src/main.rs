//! Command-line host for the staff directory.
//!
//! Usage:
//! ```bash
//! staffdir list                    # Default directory load
//! staffdir search Engineering      # Free-text search
//! staffdir letter M                # Given name or surname starting with M
//! staffdir department ENG          # Configured department filter
//! staffdir departments             # Show configured departments
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "staffdir")]
#[command(author, version, about)]
struct Cli {
    /// Path to staffdir.toml (defaults to the usual lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the default directory
    List(commands::list::ListArgs),

    /// Search by name, department or job title
    Search(commands::search::SearchArgs),

    /// List people whose given name or surname starts with a letter
    Letter(commands::letter::LetterArgs),

    /// List people in a configured department
    Department(commands::department::DepartmentArgs),

    /// Show the configured department filter options
    Departments(commands::departments::DepartmentsArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(_) => f.debug_tuple("List").finish(),
            Self::Search(_) => f.debug_tuple("Search").finish(),
            Self::Letter(_) => f.debug_tuple("Letter").finish(),
            Self::Department(_) => f.debug_tuple("Department").finish(),
            Self::Departments(_) => f.debug_tuple("Departments").finish(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match &cli.command {
        Command::List(args) => commands::list::run(config, args).await,
        Command::Search(args) => commands::search::run(config, args).await,
        Command::Letter(args) => commands::letter::run(config, args).await,
        Command::Department(args) => commands::department::run(config, args).await,
        Command::Departments(args) => commands::departments::run(config, args),
    }
}
