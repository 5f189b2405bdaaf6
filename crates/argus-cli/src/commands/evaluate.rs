//! The `evaluate` CLI subcommand -- runs one compliance evaluation cycle.

use std::path::PathBuf;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use argus_core::config;
use argus_core::controls::{load_catalogs, ControlCatalog};
use argus_core::engine::EvalEngine;
use argus_eval::create_cycle_record;
use argus_report::{compute_cycle_id, compute_rules_version, compute_snapshots_digest};
use argus_snapshot::{load_snapshots_from_dir, load_snapshots_from_file, ResourceSnapshot};

use crate::ExitCode;

// ---------------------------------------------------------------------------
// EvaluateArgs
// ---------------------------------------------------------------------------

/// Run one evaluation cycle over a set of resource snapshots.
#[derive(Debug, clap::Args)]
pub struct EvaluateArgs {
    /// Snapshot JSON file or directory of JSON files.
    pub snapshots: PathBuf,

    /// Directory containing declarative rule YAML files.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Directory containing control catalog YAML files.
    #[arg(long)]
    pub catalogs: Option<PathBuf>,

    /// Catalog id to aggregate against (defaults to all loaded catalogs).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Output format: json, jsonl, or table.
    #[arg(long)]
    pub format: Option<String>,

    /// Output file path (stdout when omitted).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write a validated cycle record to this path for later drift
    /// comparison.
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Include timestamps in output.
    #[arg(long)]
    pub timestamp: bool,

    /// Enable verbose output.
    #[arg(long, short)]
    pub verbose: bool,

    /// Suppress all non-essential output.
    #[arg(long, short)]
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Executes the `evaluate` subcommand.
///
/// Returns an [`ExitCode`] indicating the outcome of the cycle.
pub fn execute(args: EvaluateArgs) -> Result<ExitCode, anyhow::Error> {
    // 1. Initialize tracing.
    //    Ignore the error if the subscriber is already set (e.g. in tests).
    let _ = argus_core::init_tracing(args.verbose, args.quiet, false);

    // 2. Load configuration; CLI flags override file values.
    let config = config::load_config(None).context("failed to load configuration")?;
    let rules_dir = args.rules.unwrap_or(config.evaluation.rules_dir);
    let catalogs_dir = args.catalogs.unwrap_or(config.evaluation.catalogs_dir);
    let catalog_filter = args.catalog.unwrap_or(config.evaluation.catalog);
    let format = args
        .format
        .unwrap_or(config.reporting.default_format);
    let include_timestamp = args.timestamp || config.reporting.timestamp;

    // 3. Load rules.
    let mut engine = EvalEngine::new();
    if !rules_dir.is_dir() {
        bail!("rules directory not found: {}", rules_dir.display());
    }
    engine
        .load_rules(&rules_dir)
        .context("failed to load rules")?;
    if engine.rules().is_empty() {
        bail!("no rules loaded from {}", rules_dir.display());
    }

    // 4. Load control catalogs and resolve the expected control set.
    let catalogs = load_catalogs(&catalogs_dir).context("failed to load control catalogs")?;
    let expected_controls = select_controls(&catalogs, &catalog_filter)?;

    // 5. Load snapshots (single file or directory).
    let snapshots = load_snapshots(&args.snapshots)?;
    info!(count = snapshots.len(), path = %args.snapshots.display(), "loaded snapshots");

    // 6. Show progress spinner (unless --quiet).
    let spinner = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["=>", "==>", "===>", "====>", "=====>", ""]),
        );
        pb.set_message(format!("Evaluating {} snapshots...", snapshots.len()));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    // 7. Run the cycle. The timestamp is sampled once here and stamped onto
    //    everything the cycle produces.
    let cycle_timestamp =
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let result = engine.evaluate(&snapshots, &expected_controls, &cycle_timestamp);

    if let Some(pb) = spinner {
        pb.finish_with_message(format!(
            "Evaluated {} resources, {} verdicts across {} controls",
            result.resources_evaluated,
            result.verdicts.len(),
            result.summaries.len()
        ));
    }

    let failing_controls = result
        .summaries
        .iter()
        .filter(|s| s.status.is_non_compliant())
        .count();
    info!(
        verdicts = result.verdicts.len(),
        controls = result.summaries.len(),
        failing_controls,
        "evaluation completed"
    );

    // 8. Build the report.
    let report = argus_report::format_report(
        &result,
        engine.rules(),
        &snapshots,
        &cycle_timestamp,
        include_timestamp,
    );

    // 9. Optionally persist a cycle record for drift comparison.
    if let Some(record_path) = &args.record {
        let rules_version = compute_rules_version(engine.rules());
        let snapshots_digest = compute_snapshots_digest(&snapshots);
        let cycle_id =
            compute_cycle_id(argus_report::ENGINE_VERSION, &rules_version, &snapshots_digest);
        let record = create_cycle_record(
            &cycle_id,
            argus_report::ENGINE_VERSION,
            result.verdicts.clone(),
            result.summaries.clone(),
            std::collections::BTreeMap::new(),
            &cycle_timestamp,
        );
        argus_eval::save_cycle_record(&record, record_path)
            .with_context(|| format!("failed to write cycle record to {}", record_path.display()))?;
        info!(path = %record_path.display(), "cycle record written");
    }

    // 10. Render output.
    let rendered = match format.as_str() {
        "json" => serde_json::to_string_pretty(&report)
            .context("failed to serialise cycle report to JSON")?,
        "jsonl" => argus_report::format_events(&report, &cycle_timestamp, !include_timestamp),
        "table" => render_table(&report),
        other => bail!("unknown output format '{other}' (expected json, jsonl, or table)"),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write output to {}", path.display()))?;
        }
        None => println!("{rendered}"),
    }

    if failing_controls > 0 {
        Ok(ExitCode::NonCompliant)
    } else {
        Ok(ExitCode::Pass)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads snapshots from a JSON file or a directory of JSON files.
fn load_snapshots(path: &std::path::Path) -> Result<Vec<ResourceSnapshot>, anyhow::Error> {
    if path.is_file() {
        load_snapshots_from_file(path).context("failed to load snapshot file")
    } else if path.is_dir() {
        load_snapshots_from_dir(path).context("failed to load snapshot directory")
    } else {
        bail!("snapshot path not found: {}", path.display());
    }
}

/// Resolves the expected control ids from the loaded catalogs.
///
/// With a filter, exactly that catalog is used (unknown ids are an error so
/// typos do not silently evaluate against nothing). Without one, the union
/// of all loaded catalogs is used; no catalogs at all is allowed -- the
/// rule set's own control ids still get summaries.
fn select_controls(
    catalogs: &[ControlCatalog],
    catalog_filter: &str,
) -> Result<Vec<String>, anyhow::Error> {
    if catalog_filter.is_empty() {
        return Ok(catalogs.iter().flat_map(ControlCatalog::control_ids).collect());
    }

    match catalogs.iter().find(|c| c.id == catalog_filter) {
        Some(catalog) => Ok(catalog.control_ids()),
        None => {
            let available: Vec<&str> = catalogs.iter().map(|c| c.id.as_str()).collect();
            bail!(
                "unknown catalog '{catalog_filter}'; available catalogs: {}",
                if available.is_empty() {
                    String::from("(none)")
                } else {
                    available.join(", ")
                }
            )
        }
    }
}

/// Renders the per-control summary table.
fn render_table(report: &argus_report::CycleReport) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<15} {:>10} {:>10} {:>10}",
        "Control", "Status", "Total", "Passing", "Failing"
    );
    let _ = writeln!(out, "{}", "-".repeat(60));

    for summary in &report.controls {
        let _ = writeln!(
            out,
            "{:<10} {:<15} {:>10} {:>10} {:>10}",
            summary.control_id,
            summary.status.to_string(),
            summary.resources_total,
            summary.resources_passing,
            summary.resources_failing
        );
        for resource in &summary.failing_resources {
            let _ = writeln!(out, "           - failing: {resource}");
        }
    }

    let _ = writeln!(out, "{}", "-".repeat(60));
    let _ = writeln!(
        out,
        "Overall: {} | {} verdicts ({} failed) | cycle {}",
        report.overall_status,
        report.verdict_counts.total,
        report.verdict_counts.failed,
        &report.cycle.id[..12]
    );
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
