use clap::{Parser, Subcommand};

use argus_cli::commands;

/// Argus -- Offline Cloud Compliance Evaluation Tool.
#[derive(Parser)]
#[command(name = "argus", about = "Argus -- Offline Cloud Compliance Evaluation Tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one evaluation cycle over a set of resource snapshots.
    Evaluate(commands::evaluate::EvaluateArgs),
    /// Compare two cycle records and report compliance drift.
    Drift(commands::drift::DriftArgs),
    /// List or validate declarative rule definitions.
    Rules(commands::rules::RulesArgs),
    /// Inspect control catalogs and rule coverage.
    Controls(commands::controls::ControlsArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args),
        Commands::Drift(args) => commands::drift::execute(args),
        Commands::Rules(args) => commands::rules::execute(args),
        Commands::Controls(args) => commands::controls::execute(args),
    };

    match result {
        Ok(code) => argus_cli::terminate(code),
        Err(err) => {
            eprintln!("argus: error: {err:#}");
            argus_cli::terminate(argus_cli::ExitCode::EngineError)
        }
    }
}
