// snakecharm/src/cli.rs
//! This file defines the command-line interface (CLI) for the snakecharm
//! application, including all available commands and their arguments.
//! License: MIT OR Apache-2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "snakecharm",
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Rewrite Python payloads so they pass character and keyword blacklists",
    long_about = "snakecharm rewrites a Python expression or statement into an equivalent one that avoids every banned character, keyword or pattern. It searches a catalog of rewriting strategies bottom-up over the syntax tree and returns the first, shortest, or smallest-alphabet result.",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress all log output.
    #[arg(long, short = 'q', global = true, help = "Suppress all log output.")]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true, help = "Increase log verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `snakecharm` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrites a payload so that it passes the given rules.
    #[command(about = "Rewrite a payload so that it passes the given rules.")]
    Bypass(BypassCommand),

    /// Lists the strategy catalog.
    #[command(about = "List the available rewriting strategies.")]
    Strategies(StrategiesCommand),
}

/// Arguments for the `bypass` command.
#[derive(Args, Debug, Default)]
pub struct BypassCommand {
    /// The Python payload (read from stdin if not provided).
    #[arg(value_name = "PAYLOAD", help = "The Python payload to rewrite. Reads stdin when omitted.")]
    pub payload: Option<String>,

    /// Banned characters or keywords; repeatable, comma separated.
    #[arg(long, short = 'b', value_name = "ITEMS", help = "Banned characters or keywords (repeatable, comma separated; pass ',' alone to ban the comma).")]
    pub blacklist: Vec<String>,

    /// The only characters a rewrite may use.
    #[arg(long, value_name = "CHARS", help = "The only characters a rewrite may use.")]
    pub whitelist: Option<String>,

    /// Regular expressions whose matches are banned.
    #[arg(long = "pattern", value_name = "REGEX", help = "A regular expression whose matches are banned (repeatable).")]
    pub patterns: Vec<String>,

    /// A YAML or JSON file holding the rules.
    #[arg(long = "rules", value_name = "FILE", help = "Load rules (blacklist, groups, whitelist or patterns) from a YAML or JSON file.")]
    pub rules_file: Option<PathBuf>,

    /// A YAML or JSON file holding strategy white and black lists.
    #[arg(long = "filter", value_name = "FILE", help = "Load per-category strategy white/black lists from a YAML or JSON file.")]
    pub filter_file: Option<PathBuf>,

    /// Loads a named bypass profile.
    #[arg(long = "profile", value_name = "NAME", env = "SNAKECHARM_PROFILE", help = "Load a named bypass profile or a profile file.")]
    pub profile: Option<String>,

    /// Prefer the shortest rewrite.
    #[arg(long, help = "Prefer the shortest rewrite.")]
    pub minlen: bool,

    /// Prefer the rewrite with the fewest distinct characters.
    #[arg(long, help = "Prefer the rewrite with the fewest distinct characters.")]
    pub minset: bool,

    /// Also rewrite nodes that already pass the rules.
    #[arg(long, help = "In --minlen/--minset modes, also rewrite nodes that already pass.")]
    pub exhaustive: bool,

    #[arg(long = "depth", value_name = "N", help = "Nested strategy applications allowed below a node.")]
    pub depth: Option<u8>,

    #[arg(long = "beam", value_name = "N", help = "Renderings kept per node.")]
    pub beam: Option<usize>,

    #[arg(long = "max-combinations", value_name = "N", help = "Cap on the cross product of child renderings.")]
    pub max_combinations: Option<usize>,

    #[arg(long, help = "Render sibling subtrees in parallel.")]
    pub parallel: bool,

    #[arg(long = "timeout-ms", value_name = "MS", help = "Abort the search after this many milliseconds.")]
    pub timeout_ms: Option<u64>,

    /// Search memo file; loaded if present and saved afterwards.
    #[arg(long = "memo", value_name = "FILE", help = "Load the search memo from FILE if it exists and save it afterwards.")]
    pub memo: Option<PathBuf>,

    /// An external command that receives each candidate on stdin.
    #[arg(long = "check-cmd", value_name = "CMD", help = "Verify candidates with a command; exit status 0 accepts.")]
    pub check_cmd: Option<String>,

    #[arg(long = "check-timeout-ms", value_name = "MS", default_value_t = 5000, help = "Per-candidate timeout for --check-cmd.")]
    pub check_timeout_ms: u64,

    /// Print the report as JSON.
    #[arg(long, help = "Print the report as JSON on stdout.")]
    pub json: bool,

    /// Print search statistics after the result.
    #[arg(long, help = "Print search statistics to stderr.")]
    pub stats: bool,
}

/// Arguments for the `strategies` command.
#[derive(Args, Debug, Default)]
pub struct StrategiesCommand {
    /// Restrict the listing to one category (e.g. `int` or `Bypass_String`).
    #[arg(long, short = 'c', value_name = "CATEGORY", help = "Only list strategies of this category.")]
    pub category: Option<String>,

    #[arg(long, help = "Print the catalog as JSON on stdout.")]
    pub json: bool,
}
