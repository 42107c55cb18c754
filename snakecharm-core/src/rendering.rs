//! rendering.rs - Candidate renderings and the objectives that rank them.
//!
//! A [`Rendering`] is a textual substitute for a node. It carries its own
//! character set and length (computed once, from the text) plus the binding
//! strength of its outermost construct, so a parent can decide whether the
//! child needs parentheses.
//!
//! License: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use crate::config::SearchMode;

/// Python operator precedence, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precedence {
    Tuple,
    Test,
    Or,
    And,
    Not,
    Cmp,
    BOr,
    BXor,
    BAnd,
    Shift,
    Arith,
    Term,
    Factor,
    Power,
    Atom,
}

impl Precedence {
    /// The next tighter level. `Atom` is its own successor.
    pub fn next(self) -> Self {
        use Precedence::*;
        match self {
            Tuple => Test,
            Test => Or,
            Or => And,
            And => Not,
            Not => Cmp,
            Cmp => BOr,
            BOr => BXor,
            BXor => BAnd,
            BAnd => Shift,
            Shift => Arith,
            Arith => Term,
            Term => Factor,
            Factor => Power,
            Power | Atom => Atom,
        }
    }
}

/// One candidate textual substitute for a node or subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendering {
    pub text: String,
    /// Distinct characters used by `text`.
    pub charset: BTreeSet<char>,
    /// Length of `text` in characters.
    pub length: usize,
    pub precedence: Precedence,
    /// `category.strategy` for every strategy that contributed, outermost first.
    pub applied: Vec<String>,
}

impl Rendering {
    pub fn new(text: impl Into<String>, precedence: Precedence) -> Self {
        let text = text.into();
        let charset = text.chars().collect();
        let length = text.chars().count();
        Self {
            text,
            charset,
            length,
            precedence,
            applied: Vec::new(),
        }
    }

    pub fn with_applied(mut self, applied: Vec<String>) -> Self {
        self.applied = applied;
        self
    }

    pub fn charset_size(&self) -> usize {
        self.charset.len()
    }

    /// Text suitable for a slot that requires at least `min` precedence.
    pub fn text_for(&self, min: Precedence) -> Cow<'_, str> {
        if self.precedence < min {
            Cow::Owned(format!("({})", self.text))
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    /// True if any strategy of `category` contributed to this rendering.
    pub fn used_category(&self, category: &str) -> bool {
        let prefix = format!("{category}.");
        self.applied.iter().any(|a| a.starts_with(&prefix))
    }
}

impl fmt::Display for Rendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Orders `candidates` best-first for `mode`.
///
/// The sort is stable, so ties keep discovery order, which is catalog
/// priority order.
pub fn rank(candidates: &mut [Rendering], mode: SearchMode) {
    match mode {
        SearchMode::FirstSuccess => {}
        SearchMode::MinLen => candidates.sort_by_key(|r| r.length),
        SearchMode::MinSet | SearchMode::MinSetLen => {
            candidates.sort_by_key(|r| (r.charset_size(), r.length))
        }
    }
}

/// Drops repeated texts, keeping the first occurrence.
pub fn dedupe(candidates: &mut Vec<Rendering>) {
    let mut seen = BTreeSet::new();
    candidates.retain(|r| seen.insert(r.text.clone()));
}
