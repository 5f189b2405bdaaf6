//! The `controls` CLI subcommand -- catalog inspection and rule coverage.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Subcommand, ValueEnum};
use tracing::info;

use argus_core::controls::{self, CatalogCoverage};
use argus_rules::declarative::DeclarativeRuleLoader;

use crate::ExitCode;

// ---------------------------------------------------------------------------
// ControlsArgs
// ---------------------------------------------------------------------------

/// Inspect control catalogs and rule coverage.
#[derive(Debug, clap::Args)]
pub struct ControlsArgs {
    #[command(subcommand)]
    command: ControlsCommand,
}

#[derive(Debug, Subcommand)]
enum ControlsCommand {
    /// Compute and display rule coverage for one or more catalogs.
    Coverage(CoverageArgs),
}

#[derive(Debug, clap::Args)]
struct CoverageArgs {
    /// Catalog ids to compute coverage for (all loaded catalogs when empty).
    catalogs: Vec<String>,

    /// Directory containing control catalog YAML files.
    #[arg(long, default_value = "rules/catalogs")]
    catalogs_dir: PathBuf,

    /// Directory containing declarative rule YAML files.
    #[arg(long, default_value = "rules/builtin")]
    rules_dir: PathBuf,

    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `controls` subcommand.
pub fn execute(args: ControlsArgs) -> Result<ExitCode, anyhow::Error> {
    match args.command {
        ControlsCommand::Coverage(coverage_args) => execute_coverage(coverage_args),
    }
}

fn execute_coverage(args: CoverageArgs) -> Result<ExitCode, anyhow::Error> {
    // 1. Load catalog definitions.
    let catalogs = controls::load_catalogs(&args.catalogs_dir)
        .context("failed to load control catalog definitions")?;

    if catalogs.is_empty() {
        bail!(
            "no control catalog definitions found in {}",
            args.catalogs_dir.display()
        );
    }

    // 2. Validate requested catalog ids.
    let available_ids: Vec<&str> = catalogs.iter().map(|c| c.id.as_str()).collect();
    for requested in &args.catalogs {
        if !available_ids.contains(&requested.as_str()) {
            bail!(
                "unknown catalog: '{}'. Available catalogs: {}",
                requested,
                available_ids.join(", ")
            );
        }
    }

    // 3. Load rules.
    let rules = if args.rules_dir.is_dir() {
        let loader = DeclarativeRuleLoader;
        loader
            .load_from_dir(&args.rules_dir)
            .map_err(|e| anyhow::anyhow!("failed to load rules: {e}"))?
    } else {
        Vec::new()
    };

    if rules.is_empty() {
        eprintln!("Warning: no rules loaded. Coverage will be 0% for all catalogs.");
    }

    info!(rule_count = rules.len(), "loaded rules for coverage");

    // 4. Compute coverage for each requested catalog.
    let mut coverages: Vec<CatalogCoverage> = Vec::new();
    for catalog in &catalogs {
        if args.catalogs.is_empty() || args.catalogs.contains(&catalog.id) {
            coverages.push(controls::compute_coverage(catalog, &rules));
        }
    }

    // 5. Render output.
    match args.format {
        OutputFormat::Table => render_table(&coverages),
        OutputFormat::Json => render_json(&coverages)?,
    }

    Ok(ExitCode::Pass)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_table(coverages: &[CatalogCoverage]) {
    for (i, coverage) in coverages.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("Catalog: {} ({})", coverage.catalog_name, coverage.catalog);
        println!(
            "{:<10} {:<45} {:>8} {:>14}",
            "Control", "Title", "Rules", "Status"
        );
        println!("{}", "-".repeat(80));

        for control in &coverage.controls {
            println!(
                "{:<10} {:<45} {:>8} {:>14}",
                control.control_id,
                truncate(&control.control_title, 45),
                control.mapped_rules,
                control.status
            );
        }

        println!("{}", "-".repeat(80));
        println!(
            "Coverage: {}/{} controls covered ({:.1}%) | {} total rules mapped",
            coverage.covered_controls,
            coverage.controls.len(),
            coverage.coverage_percentage,
            coverage.total_rules
        );
        if !coverage.unmapped_rules.is_empty() {
            println!(
                "Unmapped rules (control not in catalog): {}",
                coverage.unmapped_rules.join(", ")
            );
        }
    }
}

fn render_json(coverages: &[CatalogCoverage]) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(coverages)
        .context("failed to serialise coverage to JSON")?;
    println!("{json}");
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max - 3])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
