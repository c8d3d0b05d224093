//! Command handlers for the `corollary` CLI.

pub mod check;
pub mod list;
pub mod plan;
pub mod run;
pub mod version;
