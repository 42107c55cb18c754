//! rules.rs - The compiled rule a rendering must satisfy.
//!
//! A [`RuleSet`] is built once per search and shared read-only. Exactly one
//! matcher is active: a character/keyword blacklist (keywords matched with a
//! double-array Aho-Corasick automaton), a character whitelist, or a list of
//! regular expressions.
//!
//! License: MIT OR Apache-2.0

use daachorse::DoubleArrayAhoCorasick;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::ConfigError;

/// One forbidden occurrence inside a candidate text. Offsets are bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub token: String,
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {}..{}", self.token, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    Blacklist,
    Whitelist,
    Pattern,
}

enum Matcher {
    Blacklist {
        chars: BTreeSet<char>,
        keywords: Vec<String>,
        automaton: Option<DoubleArrayAhoCorasick<usize>>,
    },
    Whitelist {
        chars: BTreeSet<char>,
    },
    Pattern {
        patterns: Vec<Regex>,
    },
}

pub struct RuleSet {
    matcher: Matcher,
    fingerprint: String,
}

impl RuleSet {
    /// Bans every listed item. Single characters are matched as characters,
    /// longer items as substrings. Empty items are ignored.
    pub fn blacklist<I, S>(items: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chars = BTreeSet::new();
        let mut keywords: BTreeSet<String> = BTreeSet::new();
        for item in items {
            let item = item.as_ref();
            let mut it = item.chars();
            match (it.next(), it.next()) {
                (None, _) => {}
                (Some(c), None) => {
                    chars.insert(c);
                }
                _ => {
                    keywords.insert(item.to_string());
                }
            }
        }
        // Keywords containing a banned character are already covered by it.
        let keywords: Vec<String> = keywords
            .into_iter()
            .filter(|k| !k.chars().any(|c| chars.contains(&c)))
            .collect();
        let automaton = if keywords.is_empty() {
            None
        } else {
            Some(
                DoubleArrayAhoCorasick::new(keywords.iter().map(String::as_str))
                    .map_err(|e| ConfigError::KeywordMatcher(e.to_string()))?,
            )
        };
        let fingerprint = fingerprint_of(
            RuleMode::Blacklist,
            chars.iter().map(|c| c.to_string()).chain(keywords.iter().cloned()),
        );
        debug!(
            "Compiled blacklist with {} characters and {} keywords.",
            chars.len(),
            keywords.len()
        );
        Ok(Self {
            matcher: Matcher::Blacklist {
                chars,
                keywords,
                automaton,
            },
            fingerprint,
        })
    }

    /// Allows only the characters of `allowed`.
    pub fn whitelist(allowed: &str) -> Self {
        let chars: BTreeSet<char> = allowed.chars().collect();
        let fingerprint = fingerprint_of(RuleMode::Whitelist, chars.iter().map(|c| c.to_string()));
        Self {
            matcher: Matcher::Whitelist { chars },
            fingerprint,
        }
    }

    /// Bans every non-empty match of any pattern.
    pub fn patterns<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        let mut sources = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            compiled.push(regex);
            sources.push(pattern.to_string());
        }
        let fingerprint = fingerprint_of(RuleMode::Pattern, sources.into_iter());
        Ok(Self {
            matcher: Matcher::Pattern { patterns: compiled },
            fingerprint,
        })
    }

    /// A blacklist that bans nothing.
    pub fn unrestricted() -> Self {
        Self {
            matcher: Matcher::Blacklist {
                chars: BTreeSet::new(),
                keywords: Vec::new(),
                automaton: None,
            },
            fingerprint: fingerprint_of(RuleMode::Blacklist, std::iter::empty()),
        }
    }

    pub fn mode(&self) -> RuleMode {
        match self.matcher {
            Matcher::Blacklist { .. } => RuleMode::Blacklist,
            Matcher::Whitelist { .. } => RuleMode::Whitelist,
            Matcher::Pattern { .. } => RuleMode::Pattern,
        }
    }

    /// Every forbidden occurrence in `text`, ordered by start offset.
    pub fn violations(&self, text: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        match &self.matcher {
            Matcher::Blacklist {
                chars,
                keywords,
                automaton,
            } => {
                for (start, c) in text.char_indices() {
                    if chars.contains(&c) {
                        out.push(Violation {
                            token: c.to_string(),
                            start,
                            end: start + c.len_utf8(),
                        });
                    }
                }
                if let Some(automaton) = automaton {
                    for m in automaton.find_overlapping_iter(text) {
                        out.push(Violation {
                            token: keywords[m.value()].clone(),
                            start: m.start(),
                            end: m.end(),
                        });
                    }
                }
            }
            Matcher::Whitelist { chars } => {
                for (start, c) in text.char_indices() {
                    if !chars.contains(&c) {
                        out.push(Violation {
                            token: c.to_string(),
                            start,
                            end: start + c.len_utf8(),
                        });
                    }
                }
            }
            Matcher::Pattern { patterns } => {
                for regex in patterns {
                    for m in regex.find_iter(text).filter(|m| !m.is_empty()) {
                        out.push(Violation {
                            token: m.as_str().to_string(),
                            start: m.start(),
                            end: m.end(),
                        });
                    }
                }
            }
        }
        out.sort_by_key(|v| (v.start, v.end));
        out
    }

    /// True when `text` has no violation.
    pub fn allows(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Blacklist { chars, automaton, .. } => {
                !text.chars().any(|c| chars.contains(&c))
                    && automaton.as_ref().map_or(true, |a| a.find_iter(text).next().is_none())
            }
            Matcher::Whitelist { chars } => text.chars().all(|c| chars.contains(&c)),
            Matcher::Pattern { patterns } => patterns
                .iter()
                .all(|regex| regex.find_iter(text).all(|m| m.is_empty())),
        }
    }

    /// True when any text containing a forbidden substring is itself
    /// forbidden. Holds for character and keyword matching, not for
    /// patterns, which may be anchored.
    pub fn is_monotone(&self) -> bool {
        !matches!(self.matcher, Matcher::Pattern { .. })
    }

    /// SHA-256 of the mode and its normalized items.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// One-line human summary.
    pub fn describe(&self) -> String {
        match &self.matcher {
            Matcher::Blacklist { chars, keywords, .. } => {
                let chars: String = chars.iter().collect();
                format!("blacklist chars {chars:?} keywords {keywords:?}")
            }
            Matcher::Whitelist { chars } => {
                let chars: String = chars.iter().collect();
                format!("whitelist {chars:?}")
            }
            Matcher::Pattern { patterns } => {
                let sources: Vec<&str> = patterns.iter().map(Regex::as_str).collect();
                format!("patterns {sources:?}")
            }
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rule", &self.describe())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

fn fingerprint_of(mode: RuleMode, items: impl Iterator<Item = String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{mode:?}").as_bytes());
    for item in items {
        hasher.update([0u8]);
        hasher.update(item.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_reports_each_occurrence() {
        let rules = RuleSet::blacklist(["_", "chr", ""]).unwrap();
        let v = rules.violations("__chr__");
        assert_eq!(v.len(), 5);
        assert!(v.iter().any(|v| v.token == "chr" && v.start == 2 && v.end == 5));
        assert!(!rules.allows("chr"));
        assert!(rules.allows("ch r"));
    }

    #[test]
    fn overlapping_keywords_are_all_reported() {
        let rules = RuleSet::blacklist(["aa"]).unwrap();
        assert_eq!(rules.violations("aaa").len(), 2);
    }

    #[test]
    fn keywords_shadowed_by_characters_are_dropped() {
        let a = RuleSet::blacklist(["_", "__"]).unwrap();
        let b = RuleSet::blacklist(["_"]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn whitelist_rejects_everything_else() {
        let rules = RuleSet::whitelist("abc()");
        assert!(rules.allows("abc()"));
        let v = rules.violations("abd");
        assert_eq!(v, vec![Violation { token: "d".into(), start: 2, end: 3 }]);
    }

    #[test]
    fn patterns_skip_empty_matches() {
        let rules = RuleSet::patterns([r"\d*"]).unwrap();
        assert!(rules.allows("abc"));
        assert!(!rules.allows("a1"));
        assert!(!rules.is_monotone());

        let err = RuleSet::patterns(["("]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn multibyte_offsets_are_bytes() {
        let rules = RuleSet::blacklist(["x"]).unwrap();
        let v = rules.violations("𝒂x");
        assert_eq!(v[0].start, 4);
    }
}
