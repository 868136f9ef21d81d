//! Cadena CLI - offline driver for toggleable dynamics chains.

mod commands;
mod script;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadena")]
#[command(author, version, about = "Cadena dynamics chain CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a WAV file through a compression chain
    Process(commands::process::ProcessArgs),

    /// Drive a chain from a JSON session script
    Session(commands::session::SessionArgs),

    /// List chain parameters and their ranges
    Params(commands::params::ParamsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => commands::process::run(args),
        Commands::Session(args) => commands::session::run(args),
        Commands::Params(args) => commands::params::run(args),
    }
}
