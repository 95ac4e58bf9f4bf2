//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Drydock - an incremental, sandboxed build tool for a hobby OS kernel
#[derive(Parser)]
#[command(name = "drydock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a target and its dependencies
    Build(BuildArgs),

    /// Build a test target, then run it and report its exit status
    Test(TestArgs),

    /// Run a command alias from the manifest (build its target, then run)
    Run(RunArgs),

    /// Remove built artifacts
    Clean(CleanArgs),

    /// Check that the configured toolchain programs are available
    Doctor(DoctorArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Target name to build
    pub target: String,
}

#[derive(Args)]
pub struct TestArgs {
    /// Test target name to build and run
    pub target: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Command alias declared in the manifest
    pub alias: String,
}

#[derive(Args)]
pub struct CleanArgs {}

#[derive(Args)]
pub struct DoctorArgs {}
