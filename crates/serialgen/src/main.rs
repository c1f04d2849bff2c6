use clap::{Parser, Subcommand};
use serialgen::commands::{
    run_closure, run_generate, run_validate, ClosureArgs, GenerateArgs, ValidateArgs,
};
use serialgen::{logging, OutputFormat};
use std::path::PathBuf;

/// serialgen - closed-world serializer generation
#[derive(Parser)]
#[command(name = "serialgen")]
#[command(about = "Generate serializers and dispatch tables from a type index", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print results and logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate serializer units (and manifests) for owner types
    Generate(GenerateArgs),
    /// Show the serializable closure and field order of an owner
    Closure(ClosureArgs),
    /// Check that every type in the index resolves and every owner plans
    Validate(ValidateArgs),
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.verbose, cli.log_file.as_deref(), cli.json);
    let format = OutputFormat::from_flags(cli.json);

    match cli.command {
        Commands::Generate(args) => run_generate(args, format)?,
        Commands::Closure(args) => run_closure(args, format)?,
        Commands::Validate(args) => run_validate(args, format)?,
    }
    Ok(())
}
