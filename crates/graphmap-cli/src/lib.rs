//! Graphmap CLI library.
//!
//! Logging setup, terminal styling and output formatting shared by the
//! `graphmap-cli` binary.

pub mod logging;
pub mod output;
pub mod terminal;
