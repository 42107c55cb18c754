// snakecharm-core/src/lib.rs
//! # snakecharm Core Library
//!
//! `snakecharm-core` rewrites Python snippets so that they still mean the same
//! thing but no longer contain anything a character or keyword blacklist
//! forbids. It parses the snippet, renders every node bottom-up through a
//! catalog of rewriting strategies, and picks a winner under the requested
//! objective: first valid result, shortest text, or smallest character set.
//!
//! The library does no I/O of its own apart from loading configuration and
//! persisting the optional search memo.
//!
//! ## Modules
//!
//! * `syntax`: Lexer, recursive-descent parser and arena tree for Python expressions.
//! * `rules`: The compiled `RuleSet` a rendering must satisfy.
//! * `filter`: Per-category white and black lists over strategy names.
//! * `catalog`: The `Strategy` trait, the registry and the builtin strategies.
//! * `rendering`: Candidate texts with their precedence, length and character set.
//! * `visitor`: Bottom-up rendering and child combination.
//! * `memo`: The success and exhaustion history shared across searches.
//! * `search`: The search controller, cancellation and outcomes.
//! * `checker`: Optional verification of candidates against a live target.
//! * `report`: What a search hands back.
//! * `eval`: A side-effect free evaluator used to confirm equivalence.
//! * `config`: YAML/JSON search specifications and the immutable `SearchConfig`.
//! * `profiles`: Named search specifications discovered on disk.
//! * `headless`: One-shot convenience wrappers.
//!
//! ## Public API
//!
//! **Configuration & Rules**
//!
//! * [`SearchSpec`]: Serializable rules, filter, mode and options; see [`SearchSpec::load_from_file`].
//! * [`SearchConfig`]: The immutable configuration one search runs against.
//! * [`RuleSet`]: Blacklist, whitelist or pattern rules.
//! * [`StrategyFilterMap`]: Narrows which strategies may run per category.
//!
//! **Searching**
//!
//! * [`SearchController`]: Runs searches against a shared [`StrategyCatalog`].
//! * [`SearchOutcome`]: Found, no bypass found, or aborted.
//! * [`SearchMemo`]: Reusable history; can be saved to and loaded from disk.
//!
//! **Headless Mode**
//!
//! * [`headless_bypass`] and [`headless_bypass_string`]: One call, one answer.
//!
//! ## Usage Example
//!
//! ```rust
//! use snakecharm_core::{headless_bypass, RuleSet, SearchConfig, SearchMode, SearchOutcome};
//!
//! fn main() -> Result<(), snakecharm_core::BypassError> {
//!     let config = SearchConfig::new(RuleSet::blacklist(["1"])?).with_mode(SearchMode::MinLen);
//!     match headless_bypass("10", &config)? {
//!         SearchOutcome::Found(report) => assert!(!report.text().contains('1')),
//!         other => panic!("unexpected outcome: {other:?}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Configuration and parse problems are [`BypassError`]s and are reported
//! before any search work starts. Not finding a bypass, checker rejections and
//! cancellation are ordinary [`SearchOutcome`] values.
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod catalog;
pub mod checker;
pub mod config;
pub mod errors;
pub mod eval;
pub mod filter;
pub mod headless;
pub mod memo;
pub mod profiles;
pub mod rendering;
pub mod report;
pub mod rules;
pub mod search;
pub mod syntax;
pub mod visitor;

/// Re-exports the configuration types.
pub use config::{FilterSpec, RuleSpec, SearchConfig, SearchMode, SearchOptions, SearchSpec};

/// Re-exports the error taxonomy.
pub use errors::{BypassError, CheckerError, ConfigError, EvalError, ParseError};

/// Re-exports rules and strategy filtering.
pub use filter::{allowed, StrategyFilterMap};
pub use rules::{RuleMode, RuleSet, Violation};

/// Re-exports the strategy registry and its extension points.
pub use catalog::{Category, FnStrategy, Rewrite, Strategy, StrategyCatalog, StrategyContext};

/// Re-exports the search engine.
pub use memo::{MemoEntry, MemoKey, SearchMemo};
pub use rendering::{Precedence, Rendering};
pub use search::{CancellationToken, SearchController, SearchOutcome};
pub use visitor::SearchStats;

/// Re-exports verification and reporting.
pub use checker::{Checker, CheckerGate, CommandChecker, EvalChecker, RuleChecker, Verdict};
pub use report::{BypassReport, FailureReport, Rejection, RejectionReason, Verification};

/// Re-exports profile discovery.
pub use profiles::{load_profile_by_name, load_profile_from_file, profile_candidate_paths, BypassProfile};

/// Re-exports types and functions for one-shot, non-interactive use.
pub use headless::{headless_bypass, headless_bypass_string};

/// Re-exports the parser entry points.
pub use syntax::{parse_expression, parse_snippet, SyntaxTree};
