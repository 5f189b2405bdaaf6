//! Argus Eval -- the compliance evaluation and evidence-aggregation core.
//!
//! This crate contains the pure heart of Argus:
//!
//! - [`evaluate`] -- applies a [`Rule`](argus_rules::Rule) to resource
//!   snapshots, producing one [`Verdict`] per snapshot of the rule's target
//!   type. Evaluation is a pure function: identical inputs always yield
//!   identical verdicts, fingerprints included.
//! - [`aggregate`] -- folds a cycle's verdict set into per-control
//!   [`ControlSummary`] records.
//! - [`drift`] -- set differences over failing-resource lists between two
//!   cycles.
//! - [`record`] -- persistent, validated cycle records (the append-only
//!   verdict log).
//!
//! Nothing in this crate performs I/O except [`record`], and nothing here
//! mutates a verdict after creation.

pub mod aggregate;
pub mod drift;
pub mod evaluate;
pub mod record;
pub mod verdict;

pub use aggregate::{aggregate_cycle, ControlStatus, ControlSummary};
pub use drift::{diff_cycles, diff_summaries, ControlDrift};
pub use evaluate::{evaluate_cycle, evaluate_rule};
pub use record::{
    create_cycle_record, load_cycle_record, load_cycle_record_from_str, save_cycle_record,
    CycleRecord, CycleRecordError, CYCLE_RECORD_SCHEMA_VERSION,
};
pub use verdict::Verdict;
