//! Probity CLI
//!
//! Command-line access to the JSON structural comparator

use clap::{Parser, Subcommand};
use probity_core::logging_facility::{init, Profile};

mod commands;

/// Exit status when the documents differ
const EXIT_DIFFERENT: i32 = 1;
/// Exit status for unreadable or invalid input
const EXIT_ERROR: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "probity")]
#[command(about = "Probity - structural diffs of JSON documents", long_about = None)]
struct Cli {
    /// Log probity's own debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compare two JSON documents structurally
    Diff(commands::diff::DiffArgs),
    /// Print the canonical snapshot form of a JSON document
    Canon(commands::canon::CanonArgs),
}

fn main() {
    let cli = Cli::parse();
    let profile = if cli.verbose {
        Profile::Development
    } else {
        Profile::Cli
    };
    init(Profile::from_env_or(profile));

    let result = match cli.command {
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Canon(args) => commands::canon::execute(args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_DIFFERENT),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}
