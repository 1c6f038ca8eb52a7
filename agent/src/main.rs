use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use agent::commands::{analyze, build, embed, run, validate};

#[derive(Parser)]
#[command(name = "agent")]
#[command(about = "Match job postings to a role and select resume content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve, rerank and analyze postings for a role, producing profile.json
    Analyze(analyze::AnalyzeArgs),
    /// Embed the posting corpus into a binary vector index
    Embed(embed::EmbedArgs),
    /// Score resume bullets against a role profile and select them
    Build(build::BuildArgs),
    /// Re-check a finished run's artifacts against the constraints
    Validate(validate::ValidateArgs),
    /// analyze + build + validate with a deterministic retry schedule
    Run(run::RunArgs),
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => analyze::execute(&args),
        Commands::Embed(args) => embed::execute(&args),
        Commands::Build(args) => build::execute(&args),
        Commands::Validate(args) => validate::execute(&args),
        Commands::Run(args) => run::execute(&args),
    }
}
