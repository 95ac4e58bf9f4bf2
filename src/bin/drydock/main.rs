//! Drydock CLI - incremental build tool for the kernel project

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("drydock=debug")
    } else {
        EnvFilter::new("drydock=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(&root, args),
        Commands::Test(args) => commands::test::execute(&root, args),
        Commands::Run(args) => commands::run::execute(&root, args),
        Commands::Clean(args) => commands::clean::execute(&root, args),
        Commands::Doctor(args) => commands::doctor::execute(&root, args),
    }
}
