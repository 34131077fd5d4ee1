//! WARDEN CLI
//!
//! Normalize, inspect and query permission tables from the command line.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "WARDEN - Field-level access control for data models", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized permission table
    Normalize {
        /// Path to a JSON permissions file
        file: PathBuf,
    },
    /// List roles, actions and fields
    Inspect {
        /// Path to a JSON permissions file
        file: PathBuf,
    },
    /// Decide one access; exits non-zero when denied
    Check {
        /// Path to a JSON permissions file
        file: PathBuf,
        /// Role held by the actor (repeatable)
        #[arg(short, long = "role", required = true)]
        roles: Vec<String>,
        /// Action to check
        #[arg(short, long)]
        action: String,
        /// Field to check, `*` for the whole row
        #[arg(short, long)]
        field: String,
    },
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Normalize { file } => {
            println!("{}", commands::normalize(&file)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Inspect { file } => {
            print!("{}", commands::inspect(&file)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            file,
            roles,
            action,
            field,
        } => {
            let outcome = commands::check(&file, &roles, &action, &field)?;
            println!("{outcome}");
            Ok(if outcome.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
