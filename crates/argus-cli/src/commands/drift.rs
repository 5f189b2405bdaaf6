//! The `drift` CLI subcommand -- compares two cycle records.

use std::path::PathBuf;

use anyhow::Context;
use clap::ValueEnum;
use tracing::info;

use argus_eval::{diff_cycles, load_cycle_record, ControlDrift};

use crate::ExitCode;

// ---------------------------------------------------------------------------
// DriftArgs
// ---------------------------------------------------------------------------

/// Compare two cycle records and report compliance drift.
#[derive(Debug, clap::Args)]
pub struct DriftArgs {
    /// The earlier cycle record (JSON).
    #[arg(long)]
    pub from: PathBuf,

    /// The later cycle record (JSON).
    #[arg(long)]
    pub to: PathBuf,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output.
    #[arg(long, short)]
    pub verbose: bool,

    /// Suppress all non-essential output.
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `drift` subcommand.
///
/// Exits [`ExitCode::NonCompliant`] when any control gained newly failing
/// resources, [`ExitCode::Pass`] otherwise.
pub fn execute(args: DriftArgs) -> Result<ExitCode, anyhow::Error> {
    let _ = argus_core::init_tracing(args.verbose, args.quiet, false);

    let before = load_cycle_record(&args.from)
        .with_context(|| format!("failed to load cycle record {}", args.from.display()))?;
    let after = load_cycle_record(&args.to)
        .with_context(|| format!("failed to load cycle record {}", args.to.display()))?;

    info!(
        from = %before.cycle_id,
        to = %after.cycle_id,
        "comparing cycle records"
    );

    let drift = diff_cycles(&before, &after);

    match args.format {
        OutputFormat::Table => render_table(&drift),
        OutputFormat::Json => render_json(&drift)?,
    }

    let regressed = drift.iter().any(|d| !d.newly_failing.is_empty());
    if regressed {
        Ok(ExitCode::NonCompliant)
    } else {
        Ok(ExitCode::Pass)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_table(drift: &[ControlDrift]) {
    println!(
        "{:<10} {:>14} {:>14}",
        "Control", "Newly failing", "Newly passing"
    );
    println!("{}", "-".repeat(42));

    for entry in drift {
        println!(
            "{:<10} {:>14} {:>14}",
            entry.control_id,
            entry.newly_failing.len(),
            entry.newly_passing.len()
        );
        for resource in &entry.newly_failing {
            println!("           - now failing: {resource}");
        }
        for resource in &entry.newly_passing {
            println!("           - now passing: {resource}");
        }
    }

    println!("{}", "-".repeat(42));
    let changed = drift.iter().filter(|d| !d.is_empty()).count();
    if changed == 0 {
        println!("No drift: failing-resource sets are identical.");
    } else {
        println!("{changed} control(s) drifted.");
    }
}

fn render_json(drift: &[ControlDrift]) -> Result<(), anyhow::Error> {
    let json =
        serde_json::to_string_pretty(drift).context("failed to serialise drift to JSON")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
