// snakecharm/src/logger.rs
//! Logger initialization for the snakecharm CLI.
//!
//! `RUST_LOG` supplies the default filter. An explicit level from the command
//! line (`-v` flags or `--quiet`) overrides it for every target.
//!
//! License: MIT OR Apache-2.0

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Maps the `-v` count and `--quiet` to an explicit level, or `None` to defer
/// to `RUST_LOG`.
pub fn level_from_flags(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        return Some(LevelFilter::Off);
    }
    match verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

/// Initializes `env_logger` once. Later calls are ignored.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_flags(0, false), None);
        assert_eq!(level_from_flags(1, false), Some(LevelFilter::Info));
        assert_eq!(level_from_flags(2, false), Some(LevelFilter::Debug));
        assert_eq!(level_from_flags(7, false), Some(LevelFilter::Trace));
        assert_eq!(level_from_flags(3, true), Some(LevelFilter::Off));
    }
}
