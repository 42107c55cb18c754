// snakecharm/src/lib.rs
//! # snakecharm CLI Application
//!
//! The command-line front end for `snakecharm-core`: it turns flags, rule
//! files and profiles into a search configuration, runs the search and
//! prints the rewritten payload.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;

pub use commands::bypass::{run_bypass, BypassExit};
pub use commands::strategies::run_strategies;
