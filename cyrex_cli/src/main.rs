//! Cyrex compiler command-line interface

use anyhow::Result;
use clap::Parser;
use cyrex_cli::{compile_file, Options};
use std::path::PathBuf;

/// The Cyrex language compiler
#[derive(Parser)]
#[command(name = "cyrexc")]
#[command(about = "Compiles Cyrex source files to x86-64 assembly")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Input source files (.cyrex)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Also write a textual IR dump next to each input
    #[arg(long)]
    ir: bool,

    /// Run the peephole optimizer over the generated machine code
    #[arg(long)]
    optimized: bool,

    /// Annotate the IR dump with per-block liveness sets
    #[arg(long)]
    liveness: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let options = Options {
        optimized: cli.optimized,
        ir_dump: cli.ir,
        liveness: cli.liveness,
    };

    for input in &cli.inputs {
        compile_file(input, &options)?;
    }

    Ok(())
}
