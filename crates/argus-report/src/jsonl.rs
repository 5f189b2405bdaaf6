//! Argus Events JSONL v1.0.0 formatter.
//!
//! Produces line-delimited JSON (JSONL) events for streaming ingestion by
//! SIEM systems, log aggregators, and real-time dashboards. Each line is a
//! self-contained JSON object representing a discrete cycle lifecycle event.
//!
//! # Event sequence
//!
//! A complete cycle produces events in this order:
//!
//! 1. `cycle_started` -- emitted once at the beginning.
//! 2. `verdict_recorded` -- one per verdict (zero or more).
//! 3. `control_summarized` -- one per control summary.
//! 4. `cycle_completed` -- emitted once at the end.
//!
//! # Determinism
//!
//! When `deterministic` is `true`, all timestamps are replaced with
//! `"1970-01-01T00:00:00Z"` so that identical inputs produce byte-identical
//! output. The `correlation_id` is always deterministic (SHA-256 of the
//! cycle id).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use argus_eval::{ControlStatus, ControlSummary, Verdict};

use crate::json::CycleReport;

// ---------------------------------------------------------------------------
// Schema version
// ---------------------------------------------------------------------------

/// Current schema version for the Argus Events JSONL format.
pub const JSONL_SCHEMA_VERSION: &str = "1.0.0";

/// Timestamp substituted for every event in deterministic mode.
const EPOCH_TIMESTAMP: &str = "1970-01-01T00:00:00Z";

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Discriminator for the kind of event encoded in a JSONL line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// An evaluation cycle has started.
    CycleStarted,
    /// A single verdict was recorded.
    VerdictRecorded,
    /// A control summary was computed.
    ControlSummarized,
    /// The evaluation cycle has completed.
    CycleCompleted,
}

// ---------------------------------------------------------------------------
// Event struct
// ---------------------------------------------------------------------------

/// One JSONL line. Optional fields are populated per event type and omitted
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// JSONL schema version (always `"1.0.0"`).
    pub schema_version: String,

    /// The kind of event.
    pub event: EventType,

    /// Event timestamp (RFC 3339), or the epoch in deterministic mode.
    pub timestamp: String,

    /// Correlates all events of one cycle (SHA-256 of the cycle id).
    pub correlation_id: String,

    /// The verdict, for `verdict_recorded` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    /// The control summary, for `control_summarized` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlSummary>,

    /// Overall status, for `cycle_completed` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_status: Option<ControlStatus>,

    /// Verdict count, for `cycle_started` / `cycle_completed` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict_count: Option<u32>,
}

impl Event {
    fn base(event: EventType, timestamp: &str, correlation_id: &str) -> Self {
        Self {
            schema_version: JSONL_SCHEMA_VERSION.to_owned(),
            event,
            timestamp: timestamp.to_owned(),
            correlation_id: correlation_id.to_owned(),
            verdict: None,
            control: None,
            overall_status: None,
            verdict_count: None,
        }
    }
}

// ---------------------------------------------------------------------------
// format_events
// ---------------------------------------------------------------------------

/// Renders a cycle report as JSONL lifecycle events, one JSON object per
/// line, trailing newline included.
///
/// `timestamp` stamps every event unless `deterministic` is set, in which
/// case the epoch is used instead.
#[must_use]
pub fn format_events(report: &CycleReport, timestamp: &str, deterministic: bool) -> String {
    let ts = if deterministic { EPOCH_TIMESTAMP } else { timestamp };

    let correlation_id = {
        let mut hasher = Sha256::new();
        hasher.update(report.cycle.id.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    let mut events: Vec<Event> = Vec::with_capacity(report.verdicts.len() + report.controls.len() + 2);

    let mut started = Event::base(EventType::CycleStarted, ts, &correlation_id);
    started.verdict_count = Some(report.verdict_counts.total);
    events.push(started);

    for verdict in &report.verdicts {
        let mut event = Event::base(EventType::VerdictRecorded, ts, &correlation_id);
        event.verdict = Some(verdict.clone());
        events.push(event);
    }

    for control in &report.controls {
        let mut event = Event::base(EventType::ControlSummarized, ts, &correlation_id);
        event.control = Some(control.clone());
        events.push(event);
    }

    let mut completed = Event::base(EventType::CycleCompleted, ts, &correlation_id);
    completed.overall_status = Some(report.overall_status);
    completed.verdict_count = Some(report.verdict_counts.total);
    events.push(completed);

    let mut out = String::new();
    for event in &events {
        // Serialization of these plain structs cannot fail; fall back to an
        // empty object rather than poisoning the stream.
        let line = serde_json::to_string(event).unwrap_or_else(|_| String::from("{}"));
        out.push_str(&line);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
