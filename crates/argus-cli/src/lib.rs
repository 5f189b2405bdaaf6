//! Argus CLI -- command-line interface for the Argus compliance evaluation
//! core.
//!
//! This crate provides the CLI entry point, argument parsing, exit code
//! definitions, and orchestration logic that ties together the evaluation
//! engine, control catalogs, drift detection, and reporting.

use std::fmt;

pub mod commands;

// ---------------------------------------------------------------------------
// Exit Codes
// ---------------------------------------------------------------------------

/// Argus process exit codes.
///
/// These exit codes allow CI/CD pipelines and shell scripts to distinguish
/// between different termination reasons without parsing output.
///
/// | Code | Meaning                                          |
/// |------|--------------------------------------------------|
/// | 0    | Cycle completed, all controls compliant          |
/// | 1    | Cycle completed, one or more controls failing    |
/// | 2    | Engine error (load failure, internal error)      |
/// | 3    | Configuration error                              |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    /// Cycle completed, all controls compliant.
    Pass = 0,
    /// Cycle completed, one or more controls non-compliant (or drift
    /// introduced newly failing resources).
    NonCompliant = 1,
    /// Engine error (load failure, internal error).
    EngineError = 2,
    /// Configuration error (missing config, invalid YAML).
    ConfigError = 3,
}

impl ExitCode {
    /// Returns the numeric exit code as a `u8`.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns all exit code variants.
    #[must_use]
    pub const fn all() -> &'static [ExitCode] {
        &[
            Self::Pass,
            Self::NonCompliant,
            Self::EngineError,
            Self::ConfigError,
        ]
    }

    /// Returns a human-readable description of this exit code.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pass => "cycle completed, all controls compliant",
            Self::NonCompliant => "cycle completed, one or more controls non-compliant",
            Self::EngineError => "engine error (load failure, internal error)",
            Self::ConfigError => "configuration error (missing config, invalid YAML)",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {} ({})", self.as_u8(), self.description())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

/// Terminate the process with the given [`ExitCode`].
///
/// Logs the exit reason at the appropriate tracing level (info for
/// [`ExitCode::Pass`], error for everything else) and returns the
/// corresponding [`std::process::ExitCode`] suitable for use as a `main`
/// return value.
pub fn terminate(code: ExitCode) -> std::process::ExitCode {
    match code {
        ExitCode::Pass => {
            tracing::info!(%code, "argus exiting");
        }
        _ => {
            tracing::error!(%code, "argus exiting with error");
        }
    }
    code.into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_numeric_values() {
        assert_eq!(ExitCode::Pass.as_u8(), 0);
        assert_eq!(ExitCode::NonCompliant.as_u8(), 1);
        assert_eq!(ExitCode::EngineError.as_u8(), 2);
        assert_eq!(ExitCode::ConfigError.as_u8(), 3);
    }

    #[test]
    fn exit_code_display() {
        let display = ExitCode::Pass.to_string();
        assert!(display.contains("0"));
        assert!(display.contains("all controls compliant"));

        let display = ExitCode::NonCompliant.to_string();
        assert!(display.contains("1"));
        assert!(display.contains("non-compliant"));
    }

    #[test]
    fn exit_code_all_variants() {
        let all = ExitCode::all();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], ExitCode::Pass);
        assert_eq!(all[3], ExitCode::ConfigError);
    }

    #[test]
    fn exit_code_descriptions_non_empty() {
        for code in ExitCode::all() {
            assert!(!code.description().is_empty());
        }
    }

    #[test]
    fn terminate_returns_process_exit_code() {
        let _ = terminate(ExitCode::Pass);
        let _ = terminate(ExitCode::EngineError);
    }
}
