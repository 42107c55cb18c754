//! search.rs - Search controller: one snippet in, one outcome out.
//!
//! The controller parses the snippet, renders it with a [`Visitor`], and
//! optionally walks the ranked root candidates through a checker until one is
//! accepted. Exhaustion, checker rejection and cancellation all come back as
//! [`SearchOutcome`] values; only configuration and parse problems are errors.
//!
//! License: MIT OR Apache-2.0

use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::catalog::StrategyCatalog;
use crate::checker::{CheckerGate, Verdict};
use crate::errors::BypassError;
use crate::memo::SearchMemo;
use crate::report::{BypassReport, FailureReport, Rejection, Verification};
use crate::syntax::parse_snippet;
use crate::visitor::{SearchStats, StopSignal, Visitor};

pub use crate::config::{SearchConfig, SearchMode};

/// Cooperative cancellation flag, polled between expansions.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(BypassReport),
    NoBypassFound(FailureReport),
    /// Cancelled or out of time. `best` is a fully validated rendering when
    /// one had been completed.
    Aborted {
        best: Option<BypassReport>,
        stats: SearchStats,
    },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    /// The winning or best-so-far report.
    pub fn report(&self) -> Option<&BypassReport> {
        match self {
            SearchOutcome::Found(report) => Some(report),
            SearchOutcome::Aborted { best, .. } => best.as_ref(),
            SearchOutcome::NoBypassFound(_) => None,
        }
    }

    pub fn stats(&self) -> SearchStats {
        match self {
            SearchOutcome::Found(report) => report.stats,
            SearchOutcome::NoBypassFound(failure) => failure.stats,
            SearchOutcome::Aborted { stats, .. } => *stats,
        }
    }
}

/// Owns the strategy catalog; cheap to clone and share between threads.
#[derive(Debug, Clone, Default)]
pub struct SearchController {
    catalog: Arc<StrategyCatalog>,
}

impl SearchController {
    pub fn new(catalog: Arc<StrategyCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Searches with a fresh memo, no cancellation and no checker.
    pub fn search(&self, snippet: &str, config: &SearchConfig) -> Result<SearchOutcome, BypassError> {
        self.search_with(snippet, config, &SearchMemo::new(), &CancellationToken::new(), None)
    }

    pub fn search_with(
        &self,
        snippet: &str,
        config: &SearchConfig,
        memo: &SearchMemo,
        cancel: &CancellationToken,
        checker: Option<&CheckerGate>,
    ) -> Result<SearchOutcome, BypassError> {
        let tree = parse_snippet(snippet)?;
        info!(
            "Searching for a bypass of {} nodes under {} ({} mode).",
            tree.len(),
            config.rules().describe(),
            config.mode()
        );

        let stop = StopSignal::new(cancel.clone(), config.options().timeout());
        let visitor = Visitor::new(&self.catalog, config, memo, &stop);
        let candidates = visitor.render_tree(&tree);
        let mode = config.mode();

        if stop.is_stopped() {
            let stats = visitor.stats();
            let best = candidates
                .into_iter()
                .find(|r| config.rules().allows(&r.text))
                .map(|r| BypassReport::new(snippet, r, mode, stats));
            info!("Search aborted; best candidate kept: {}.", best.is_some());
            return Ok(SearchOutcome::Aborted { best, stats });
        }

        let Some(gate) = checker else {
            let stats = visitor.stats();
            return Ok(match candidates.into_iter().next() {
                Some(winner) => {
                    debug!("Winning rendering: {}", winner.text);
                    SearchOutcome::Found(BypassReport::new(snippet, winner, mode, stats))
                }
                None => SearchOutcome::NoBypassFound(FailureReport {
                    original: snippet.to_string(),
                    mode,
                    reason: "no rendering satisfies the rules".into(),
                    rejected: Vec::new(),
                    stats,
                }),
            });
        };

        let mut rejected = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if stop.is_stopped() {
                let stats = visitor.stats();
                // Candidates not yet refused by the checker, unverified.
                let best = candidates[index..]
                    .iter()
                    .find(|r| config.rules().allows(&r.text))
                    .map(|r| {
                        let mut report = BypassReport::new(snippet, r.clone(), mode, stats);
                        report.rejected = rejected;
                        report
                    });
                info!("Search aborted while checking; best candidate kept: {}.", best.is_some());
                return Ok(SearchOutcome::Aborted { best, stats });
            }
            match gate.verify(&candidate.text) {
                Verdict::Accepted => {
                    let mut report = BypassReport::new(snippet, candidate.clone(), mode, visitor.stats());
                    report.verification = Verification::Accepted;
                    report.rejected = rejected;
                    return Ok(SearchOutcome::Found(report));
                }
                verdict => {
                    debug!("Checker refused {}: {:?}", candidate.text, verdict);
                    rejected.extend(Rejection::from_verdict(&candidate.text, verdict));
                }
            }
        }

        let reason = if candidates.is_empty() {
            "no rendering satisfies the rules"
        } else {
            "the checker refused every candidate"
        };
        Ok(SearchOutcome::NoBypassFound(FailureReport {
            original: snippet.to_string(),
            mode,
            reason: reason.into(),
            rejected,
            stats: visitor.stats(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{Checker, RuleChecker};
    use crate::errors::CheckerError;
    use crate::rules::RuleSet;
    use std::time::Duration;

    fn config(banned: &[&str]) -> SearchConfig {
        SearchConfig::new(RuleSet::blacklist(banned).unwrap())
    }

    struct RefuseAll;

    impl Checker for RefuseAll {
        fn check(&self, _: &str) -> Result<Vec<String>, CheckerError> {
            Ok(vec!["blocked by target".into()])
        }
    }

    #[test]
    fn parse_errors_are_errors() {
        let controller = SearchController::default();
        let err = controller.search("f(1", &config(&["x"])).unwrap_err();
        assert!(matches!(err, BypassError::Parse(_)));
    }

    #[test]
    fn checker_picks_the_first_accepted_candidate() {
        let controller = SearchController::default();
        let config = config(&["1"]).with_mode(SearchMode::MinLen);
        // The target also refuses "x", so hex spellings are skipped.
        let gate = CheckerGate::new(
            Arc::new(RuleChecker::new(RuleSet::blacklist(["1", "x"]).unwrap())),
            Duration::from_secs(1),
        );
        let outcome = controller
            .search_with("10", &config, &SearchMemo::new(), &CancellationToken::new(), Some(&gate))
            .unwrap();
        let report = outcome.report().unwrap();
        assert!(!report.text().contains('x'));
        assert_eq!(report.verification, Verification::Accepted);
    }

    #[test]
    fn universal_rejection_is_no_bypass() {
        let controller = SearchController::default();
        let gate = CheckerGate::new(Arc::new(RefuseAll), Duration::from_secs(1));
        let outcome = controller
            .search_with("10", &config(&["1"]), &SearchMemo::new(), &CancellationToken::new(), Some(&gate))
            .unwrap();
        let SearchOutcome::NoBypassFound(failure) = outcome else {
            panic!("expected no bypass");
        };
        assert!(!failure.rejected.is_empty());
    }

    #[test]
    fn cancelled_search_is_aborted() {
        let controller = SearchController::default();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = controller
            .search_with("10", &config(&["1"]), &SearchMemo::new(), &token, None)
            .unwrap();
        assert!(matches!(outcome, SearchOutcome::Aborted { best: None, .. }));
    }

    /// Refuses the candidate and cancels the search it belongs to.
    struct RefuseAndCancel(CancellationToken);

    impl Checker for RefuseAndCancel {
        fn check(&self, _: &str) -> Result<Vec<String>, CheckerError> {
            self.0.cancel();
            Ok(vec!["blocked by target".into()])
        }
    }

    #[test]
    fn cancel_during_checking_keeps_the_next_candidate() {
        let controller = SearchController::default();
        let token = CancellationToken::new();
        let gate = CheckerGate::new(Arc::new(RefuseAndCancel(token.clone())), Duration::from_secs(1));
        let config = config(&["1"]).with_mode(SearchMode::MinLen);
        let outcome = controller
            .search_with("10", &config, &SearchMemo::new(), &token, Some(&gate))
            .unwrap();
        let SearchOutcome::Aborted { best: Some(best), .. } = outcome else {
            panic!("expected an aborted search with a best candidate");
        };
        assert_eq!(best.rejected.len(), 1);
        assert_ne!(best.text(), best.rejected[0].candidate);
        assert!(config.rules().allows(best.text()));
        assert_eq!(best.verification, Verification::Unchecked);
    }
}
