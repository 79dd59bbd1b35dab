//! CLI subcommand implementations.

pub mod aggregate;
pub mod run;
