//! errors.rs - Error types for the snakecharm-core library.
//!
//! Configuration and parse errors are unrecoverable and surface to the caller
//! before any search work starts. Exhaustion and cancellation are not errors:
//! they are values of [`crate::search::SearchOutcome`].
//!
//! License: MIT OR Apache-2.0

use std::time::Duration;
use thiserror::Error;

/// Top-level error for every fallible operation in `snakecharm-core`.
///
/// `#[non_exhaustive]` so that new variants can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BypassError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("search memo error: {0}")]
    Memo(String),

    #[error("failed to serialize search state: {0}")]
    Serialization(String),

    #[error("an unexpected I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// Contradictory or malformed configuration, detected at construction time.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("rule set mixes modes ({0}); supply exactly one of blacklist, whitelist or patterns")]
    ConflictingRuleModes(String),

    #[error("invalid rule pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to build keyword matcher: {0}")]
    KeywordMatcher(String),

    #[error("strategy filter lists category '{0}' as both white and black")]
    ConflictingFilter(String),

    #[error("unknown strategy category '{0}'")]
    UnknownCategory(String),

    #[error("strategy '{name}' is already registered for category '{category}'")]
    DuplicateStrategy { category: String, name: String },

    #[error("invalid search option: {0}")]
    InvalidOption(String),
}

/// The snippet is not valid syntax for the supported Python subset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Failure of an external checker. Recorded against the candidate, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckerError {
    #[error("checker timed out after {0:?}")]
    Timeout(Duration),

    #[error("checker failed: {0}")]
    Failed(String),
}

/// A snippet uses something the symbolic evaluator does not model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot evaluate: {0}")]
pub struct EvalError(pub String);
