//! The `rules` CLI subcommand -- lists and validates declarative rules.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;

use argus_rules::declarative::DeclarativeRuleLoader;

use crate::ExitCode;

// ---------------------------------------------------------------------------
// RulesArgs
// ---------------------------------------------------------------------------

/// List or validate declarative rule definitions.
#[derive(Debug, clap::Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Debug, Subcommand)]
enum RulesCommand {
    /// List all rules in a directory.
    List {
        /// Directory containing rule YAML files.
        dir: PathBuf,
    },
    /// Validate all rules in a directory.
    Validate {
        /// Directory containing rule YAML files.
        dir: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `rules` subcommand.
pub fn execute(args: RulesArgs) -> Result<ExitCode, anyhow::Error> {
    match args.command {
        RulesCommand::List { dir } => execute_list(&dir),
        RulesCommand::Validate { dir } => execute_validate(&dir),
    }
}

fn execute_list(dir: &std::path::Path) -> Result<ExitCode, anyhow::Error> {
    let loader = DeclarativeRuleLoader;
    let rules = loader
        .load_from_dir(dir)
        .with_context(|| format!("failed to load rules from {}", dir.display()))?;

    println!(
        "{:<45} {:<10} {:<10} {:<18} {:<8}",
        "Rule", "Severity", "Control", "Resource type", "Version"
    );
    println!("{}", "-".repeat(95));
    for rule in &rules {
        println!(
            "{:<45} {:<10} {:<10} {:<18} {:<8}",
            rule.id,
            rule.severity.to_string(),
            rule.control_id,
            rule.resource_type.to_string(),
            rule.version
        );
    }
    println!("{}", "-".repeat(95));
    println!("{} rule(s)", rules.len());

    Ok(ExitCode::Pass)
}

fn execute_validate(dir: &std::path::Path) -> Result<ExitCode, anyhow::Error> {
    let loader = DeclarativeRuleLoader;
    match loader.load_from_dir(dir) {
        Ok(rules) => {
            println!("OK: {} rule(s) validated in {}", rules.len(), dir.display());
            Ok(ExitCode::Pass)
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            Ok(ExitCode::ConfigError)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
