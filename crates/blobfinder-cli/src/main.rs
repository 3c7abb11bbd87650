mod commands;
mod io;
mod job;
mod pattern_args;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blobfinder", about = "Template-correlation peak finder for diffraction frames")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate a pattern against expected peak positions in a set of frames
    Run(commands::run::RunArgs),
    /// Render a match pattern's template to an image
    Template(commands::template::TemplateArgs),
    /// Print or save a default job file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Template(args) => commands::template::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
