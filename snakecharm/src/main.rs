// snakecharm/src/main.rs
//! snakecharm entry point.
//!
//! Parses the command line, initializes logging and the theme, and dispatches
//! to the subcommand. Exit codes: 0 bypass found (or listing printed), 1 no
//! bypass found or search aborted, 2 configuration, input or parse error.

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use std::process::ExitCode;

use snakecharm::cli::{Cli, Commands};
use snakecharm::logger;
use snakecharm::ui::output::print_error_message;
use snakecharm::ui::theme::{build_theme_map, ThemeMap, ThemeStyle};
use snakecharm::{run_bypass, run_strategies};

fn run(cli: &Cli, theme: &ThemeMap) -> Result<u8> {
    match &cli.command {
        Commands::Bypass(cmd) => Ok(run_bypass(cmd, theme)?.code()),
        Commands::Strategies(cmd) => {
            run_strategies(cmd, theme)?;
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_logger(logger::level_from_flags(cli.verbose, cli.quiet));

    let result = build_theme_map(cli.theme.as_deref())
        .context("Theme error")
        .and_then(|theme| run(&cli, &theme));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let fallback = ThemeStyle::default_theme_map();
            let _ = print_error_message(&mut std::io::stderr(), &format!("{e:#}"), &fallback, std::io::stderr().is_terminal());
            ExitCode::from(2)
        }
    }
}
