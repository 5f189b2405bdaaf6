//! CLI subcommand implementations.

pub mod controls;
pub mod drift;
pub mod evaluate;
pub mod rules;
