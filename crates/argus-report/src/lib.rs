//! Argus Report -- serializable output for the reporting interface.
//!
//! Two formats are produced from a [`CycleResult`](argus_core::engine::CycleResult):
//!
//! - **JSON** ([`json`]) -- one self-contained document per cycle with
//!   metadata, control summaries, the full verdict list, and an overall
//!   status. Designed for dashboards and archive storage.
//! - **JSONL** ([`jsonl`]) -- line-delimited lifecycle events for streaming
//!   ingestion by SIEM systems and log aggregators.
//!
//! Both formats are deterministic when timestamps are disabled: identical
//! cycle inputs produce byte-identical output.

pub mod json;
pub mod jsonl;

pub use json::{
    compute_cycle_id, compute_rules_version, compute_snapshots_digest, format_report,
    CycleMetadata, CycleReport, VerdictCounts, ENGINE_VERSION, SCHEMA_VERSION,
};
pub use jsonl::{format_events, EventType, JSONL_SCHEMA_VERSION};
