//! report.rs - What a search hands back to its caller.
//!
//! License: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checker::Verdict;
use crate::config::SearchMode;
use crate::rendering::Rendering;
use crate::visitor::SearchStats;

/// Whether the winning rendering went through a checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Unchecked,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum RejectionReason {
    Rejected(Vec<String>),
    TimedOut,
    Failed(String),
}

/// A candidate the checker refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub candidate: String,
    pub reason: RejectionReason,
}

impl Rejection {
    /// Builds the record for a non-accepting verdict.
    pub fn from_verdict(candidate: &str, verdict: Verdict) -> Option<Self> {
        let reason = match verdict {
            Verdict::Accepted => return None,
            Verdict::Rejected(reasons) => RejectionReason::Rejected(reasons),
            Verdict::TimedOut => RejectionReason::TimedOut,
            Verdict::Failed(message) => RejectionReason::Failed(message),
        };
        Some(Self {
            candidate: candidate.to_string(),
            reason,
        })
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectionReason::Rejected(reasons) => write!(f, "{}: rejected ({})", self.candidate, reasons.join("; ")),
            RejectionReason::TimedOut => write!(f, "{}: checker timed out", self.candidate),
            RejectionReason::Failed(message) => write!(f, "{}: checker failed: {message}", self.candidate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassReport {
    pub original: String,
    pub rendering: Rendering,
    pub length: usize,
    pub charset_size: usize,
    pub mode: SearchMode,
    pub verification: Verification,
    /// Higher-ranked candidates the checker refused first.
    pub rejected: Vec<Rejection>,
    pub stats: SearchStats,
}

impl BypassReport {
    pub fn new(original: &str, rendering: Rendering, mode: SearchMode, stats: SearchStats) -> Self {
        Self {
            original: original.to_string(),
            length: rendering.length,
            charset_size: rendering.charset_size(),
            rendering,
            mode,
            verification: Verification::Unchecked,
            rejected: Vec::new(),
            stats,
        }
    }

    pub fn text(&self) -> &str {
        &self.rendering.text
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for BypassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.rendering.text)?;
        write!(f, "  length {}, {} distinct characters ({})", self.length, self.charset_size, self.mode)?;
        if !self.rendering.applied.is_empty() {
            write!(f, "\n  via {}", self.rendering.applied.join(", "))?;
        }
        if self.verification == Verification::Accepted {
            write!(f, "\n  accepted by checker")?;
        }
        for rejection in &self.rejected {
            write!(f, "\n  skipped {rejection}")?;
        }
        Ok(())
    }
}

/// Why no bypass came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub original: String,
    pub mode: SearchMode,
    pub reason: String,
    pub rejected: Vec<Rejection>,
    pub stats: SearchStats,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no bypass found for {:?}: {}", self.original, self.reason)?;
        for rejection in &self.rejected {
            write!(f, "\n  {rejection}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::Precedence;

    #[test]
    fn report_measures_the_winner() {
        let rendering = Rendering::new("0xa", Precedence::Atom).with_applied(vec!["int.by_hex".into()]);
        let report = BypassReport::new("10", rendering, SearchMode::MinLen, SearchStats::default());
        assert_eq!((report.length, report.charset_size), (3, 3));
        let text = report.to_string();
        assert!(text.starts_with("0xa\n"));
        assert!(text.contains("via int.by_hex"));
        assert!(text.contains("(minlen)"));
    }

    #[test]
    fn json_carries_rejections() {
        let mut report = BypassReport::new(
            "10",
            Rendering::new("0xa", Precedence::Atom),
            SearchMode::FirstSuccess,
            SearchStats::default(),
        );
        report.rejected = Rejection::from_verdict("5*2", Verdict::TimedOut).into_iter().collect();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["mode"], "first-success");
        assert_eq!(json["rejected"][0]["reason"]["kind"], "timed_out");
        assert!(Rejection::from_verdict("x", Verdict::Accepted).is_none());
    }
}
