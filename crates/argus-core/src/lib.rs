//! Argus Core -- shared error type, tracing setup, configuration, control
//! catalogs, and cycle orchestration.
//!
//! This crate ties the evaluation core together: it loads rules and control
//! catalogs, runs evaluation cycles through [`engine::EvalEngine`], and
//! re-exports the shared enums so downstream crates have a single import
//! point.

pub mod config;
pub mod controls;
pub mod engine;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use argus_eval::{ControlStatus, ControlSummary, Verdict};
pub use argus_rules::{Rule, Severity};
pub use argus_snapshot::{ResourceSnapshot, ResourceType};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Top-level error type for the argus-core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule loading or validation error.
    #[error("rule error: {0}")]
    Rule(String),

    /// A snapshot loading or validation error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] argus_snapshot::SnapshotError),

    /// A control catalog loading error.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Tracing/logging initialization failed.
    #[error("tracing initialization error: {0}")]
    TracingInit(String),
}

/// Convenience alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Tracing / Logging
// ---------------------------------------------------------------------------

/// Initialize structured tracing with the given verbosity level.
///
/// # Behaviour
///
/// | `verbose` | `quiet` | `json_output` | Effect                                  |
/// |-----------|---------|---------------|-----------------------------------------|
/// | `true`    | _       | _             | TRACE level (most verbose)              |
/// | _         | `true`  | _             | ERROR level only                        |
/// | `false`   | `false` | _             | INFO level (default)                    |
/// | _         | _       | `true`        | JSON-formatted log lines (CI/CD)        |
/// | _         | _       | `false`       | Human-readable, compact log lines       |
///
/// The `RUST_LOG` environment variable, when set, takes precedence over the
/// programmatic level selection so that operators can fine-tune per-module
/// verbosity without recompiling.
///
/// # Errors
///
/// Returns [`CoreError::TracingInit`] if the global subscriber has already
/// been set (i.e. this function was called more than once in the same
/// process).
pub fn init_tracing(verbose: bool, quiet: bool, json_output: bool) -> Result<(), CoreError> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_output {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    } else {
        fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .try_init()
            .map_err(|e| CoreError::TracingInit(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
