// File: snakecharm-core/src/headless.rs

//! `headless.rs`
//! Convenience wrappers for one-shot, non-interactive searches.
//!
//! These build the builtin catalog, a fresh memo and no checker, which is
//! what scripts and quick experiments usually want.

use crate::config::{SearchConfig, SearchMode};
use crate::errors::BypassError;
use crate::rules::RuleSet;
use crate::search::{SearchController, SearchOutcome};

/// Searches `snippet` under `config` with the builtin catalog.
pub fn headless_bypass(snippet: &str, config: &SearchConfig) -> Result<SearchOutcome, BypassError> {
    SearchController::default().search(snippet, config)
}

/// Rewrites `snippet` so that none of `banned` appears in it, returning the
/// rewritten text or `None` when no bypass exists.
pub fn headless_bypass_string<I, S>(snippet: &str, banned: I, mode: SearchMode) -> Result<Option<String>, BypassError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let config = SearchConfig::new(RuleSet::blacklist(banned)?).with_mode(mode);
    Ok(headless_bypass(snippet, &config)?
        .report()
        .map(|report| report.text().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::eval_int;

    #[test]
    fn test_headless_bypass_int() -> Result<(), BypassError> {
        let out = headless_bypass_string("10", ["1"], SearchMode::FirstSuccess)?.unwrap();
        assert!(!out.contains('1'));
        assert_eq!(eval_int(&out), Some(10));
        Ok(())
    }

    #[test]
    fn test_headless_bypass_reports_parse_errors() {
        let result = headless_bypass_string("(1", ["1"], SearchMode::FirstSuccess);
        assert!(matches!(result, Err(BypassError::Parse(_))));
    }
}
