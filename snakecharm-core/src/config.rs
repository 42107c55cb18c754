//! Configuration management for `snakecharm-core`.
//!
//! This module defines the serializable search specification (rules, strategy
//! filter, mode and options), loads it from YAML or JSON files, and turns it
//! into the immutable [`SearchConfig`] a search runs against. Every
//! contradiction is rejected here, before any search work starts.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Category, StrategyCatalog};
use crate::errors::ConfigError;
use crate::filter::StrategyFilterMap;
use crate::rules::RuleSet;

/// The objective a search optimizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// The first valid rendering in catalog priority order.
    #[default]
    FirstSuccess,
    /// Shortest text.
    #[serde(alias = "minlen")]
    MinLen,
    /// Fewest distinct characters, then shortest.
    #[serde(alias = "minset")]
    MinSet,
    /// Both objectives requested: charset size, then length.
    #[serde(alias = "minset+minlen")]
    MinSetLen,
}

impl SearchMode {
    pub fn from_flags(minlen: bool, minset: bool) -> Self {
        match (minlen, minset) {
            (false, false) => SearchMode::FirstSuccess,
            (true, false) => SearchMode::MinLen,
            (false, true) => SearchMode::MinSet,
            (true, true) => SearchMode::MinSetLen,
        }
    }

    /// True for the modes that compare every discovered rendering.
    pub fn is_minimize(self) -> bool {
        self != SearchMode::FirstSuccess
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::FirstSuccess => "first-success",
            SearchMode::MinLen => "minlen",
            SearchMode::MinSet => "minset",
            SearchMode::MinSetLen => "minset+minlen",
        })
    }
}

/// What a rendering must avoid. Exactly one of the three modes may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSpec {
    /// Banned characters (single items) and substrings (longer items).
    pub blacklist: Vec<String>,
    /// Labeled blacklist groups, e.g. `keyword: [".", "chr"]`. Flattened.
    pub groups: BTreeMap<String, Vec<String>>,
    /// The only characters a rendering may use.
    pub whitelist: Option<String>,
    /// Regular expressions whose matches are banned.
    pub patterns: Vec<String>,
}

impl RuleSpec {
    pub fn blacklist<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blacklist: items.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn active_modes(&self) -> Vec<&'static str> {
        let mut modes = Vec::new();
        if !self.blacklist.is_empty() || !self.groups.is_empty() {
            modes.push("blacklist");
        }
        if self.whitelist.is_some() {
            modes.push("whitelist");
        }
        if !self.patterns.is_empty() {
            modes.push("patterns");
        }
        modes
    }

    /// Compiles the spec. An empty spec bans nothing.
    pub fn build(&self) -> Result<RuleSet, ConfigError> {
        let modes = self.active_modes();
        if modes.len() > 1 {
            return Err(ConfigError::ConflictingRuleModes(modes.join(" + ")));
        }
        if let Some(allowed) = &self.whitelist {
            return Ok(RuleSet::whitelist(allowed));
        }
        if !self.patterns.is_empty() {
            return RuleSet::patterns(&self.patterns);
        }
        let items = self.blacklist.iter().chain(self.groups.values().flatten());
        RuleSet::blacklist(items)
    }
}

/// Strategy allow/deny lists keyed by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSpec {
    pub white: BTreeMap<String, Vec<String>>,
    pub black: BTreeMap<String, Vec<String>>,
}

impl FilterSpec {
    /// Loads a filter map from a YAML or JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file {}", path.display()))?;
        let spec: FilterSpec = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse filter file {}", path.display()))?;
        debug!("Loaded filter for {} categories from {}.", spec.white.len() + spec.black.len(), path.display());
        Ok(spec)
    }
}

/// Search limits. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchOptions {
    /// Nested strategy applications allowed below a node.
    pub max_depth: u8,
    /// Renderings kept per node.
    pub beam_width: usize,
    /// Cap on the child cross product at one node.
    pub max_combinations: usize,
    /// In minimize modes, also rewrite nodes that are already valid.
    pub exhaustive: bool,
    /// Render sibling subtrees on the rayon pool.
    pub parallel: bool,
    /// Wall-clock budget in milliseconds; cancels the search when spent.
    pub timeout_ms: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth: 4,
            beam_width: 5,
            max_combinations: 4096,
            exhaustive: false,
            parallel: false,
            timeout_ms: None,
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beam_width == 0 {
            return Err(ConfigError::InvalidOption("beam_width must be at least 1".into()));
        }
        if self.max_combinations == 0 {
            return Err(ConfigError::InvalidOption("max_combinations must be at least 1".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Everything a search needs, in serializable form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSpec {
    pub rules: RuleSpec,
    pub filter: FilterSpec,
    pub mode: SearchMode,
    pub options: SearchOptions,
}

impl SearchSpec {
    /// Loads a search specification from a YAML or JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading search specification from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let spec: SearchSpec = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        spec.validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(spec)
    }

    /// Reports every problem at once rather than the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.rules.build() {
            errors.push(e.to_string());
        }
        for category in self.filter.white.keys().chain(self.filter.black.keys()) {
            if let Err(e) = category.parse::<Category>() {
                errors.push(e.to_string());
            }
        }
        if let Err(e) = StrategyFilterMap::from_spec(&self.filter) {
            if !matches!(e, ConfigError::UnknownCategory(_)) {
                errors.push(e.to_string());
            }
        }
        if let Err(e) = self.options.validate() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Search specification is invalid:\n{}", errors.join("\n")))
        }
    }

    /// Builds the immutable configuration, warning about unknown strategy names.
    pub fn build(&self, catalog: &StrategyCatalog) -> Result<SearchConfig, ConfigError> {
        let filter = StrategyFilterMap::from_spec(&self.filter)?;
        filter.warn_unknown(catalog);
        SearchConfig::new(self.rules.build()?)
            .with_filter(filter)
            .with_mode(self.mode)
            .with_options(self.options.clone())
    }
}

/// The immutable bundle one search runs against.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    rules: Arc<RuleSet>,
    filter: StrategyFilterMap,
    mode: SearchMode,
    options: SearchOptions,
}

impl SearchConfig {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
            filter: StrategyFilterMap::new(),
            mode: SearchMode::default(),
            options: SearchOptions::default(),
        }
    }

    pub fn with_filter(mut self, filter: StrategyFilterMap) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn shared_rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules)
    }

    pub fn filter(&self) -> &StrategyFilterMap {
        &self.filter
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// SHA-256 over everything that can change a search result.
    /// `parallel` and `timeout_ms` are left out.
    pub fn fingerprint(&self, catalog: &StrategyCatalog) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.rules.fingerprint().as_bytes());
        hasher.update(b"|");
        hasher.update(self.filter.fingerprint_material().as_bytes());
        hasher.update(b"|");
        hasher.update(self.mode.to_string().as_bytes());
        hasher.update(
            format!(
                "|{}|{}|{}|{}|",
                self.options.max_depth,
                self.options.beam_width,
                self.options.max_combinations,
                self.options.exhaustive
            )
            .as_bytes(),
        );
        hasher.update(catalog.fingerprint().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_rule_modes_are_rejected() {
        let spec = RuleSpec {
            blacklist: vec!["1".into()],
            patterns: vec!["1".into()],
            ..RuleSpec::default()
        };
        assert!(matches!(spec.build(), Err(ConfigError::ConflictingRuleModes(_))));

        let spec = RuleSpec {
            groups: BTreeMap::from([("kwd".to_string(), vec![".".to_string()])]),
            whitelist: Some("abc".into()),
            ..RuleSpec::default()
        };
        assert!(matches!(spec.build(), Err(ConfigError::ConflictingRuleModes(_))));
    }

    #[test]
    fn groups_flatten_into_the_blacklist() {
        let spec = RuleSpec {
            blacklist: vec!["'".into()],
            groups: BTreeMap::from([("keyword".to_string(), vec![".".to_string(), "chr".to_string()])]),
            ..RuleSpec::default()
        };
        let rules = spec.build().unwrap();
        assert!(!rules.allows("chr(1)"));
        assert!(!rules.allows("a.b"));
        assert!(!rules.allows("'"));
        assert!(rules.allows("ch r"));
    }

    #[test]
    fn mode_flags() {
        assert_eq!(SearchMode::from_flags(false, false), SearchMode::FirstSuccess);
        assert_eq!(SearchMode::from_flags(true, true), SearchMode::MinSetLen);
        assert!(SearchMode::MinSet.is_minimize());
        let parsed: SearchMode = serde_yml::from_str("min-set-len").unwrap();
        assert_eq!(parsed, SearchMode::MinSetLen);
    }

    #[test]
    fn zero_beam_is_invalid() {
        let options = SearchOptions {
            beam_width: 0,
            ..SearchOptions::default()
        };
        let err = SearchConfig::new(RuleSet::unrestricted()).with_options(options).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption(_)));
    }

    #[test]
    fn fingerprint_tracks_rules_filter_and_mode() {
        let catalog = StrategyCatalog::builtin();
        let base = SearchConfig::new(RuleSet::blacklist(["1"]).unwrap());
        let same = SearchConfig::new(RuleSet::blacklist(["1"]).unwrap());
        assert_eq!(base.fingerprint(&catalog), same.fingerprint(&catalog));

        let other_rules = SearchConfig::new(RuleSet::blacklist(["2"]).unwrap());
        assert_ne!(base.fingerprint(&catalog), other_rules.fingerprint(&catalog));

        let filtered = base
            .clone()
            .with_filter(StrategyFilterMap::new().black(Category::Int, ["by_hex"]).unwrap());
        assert_ne!(base.fingerprint(&catalog), filtered.fingerprint(&catalog));

        let minlen = base.clone().with_mode(SearchMode::MinLen);
        assert_ne!(base.fingerprint(&catalog), minlen.fingerprint(&catalog));
    }

    #[test]
    fn validate_collects_every_problem() {
        let yaml = r#"
rules:
  blacklist: ["1"]
  patterns: ["2"]
filter:
  white:
    Bypass_Float: []
options:
  beam_width: 0
"#;
        let spec: SearchSpec = serde_yml::from_str(yaml).unwrap();
        let message = spec.validate().unwrap_err().to_string();
        assert!(message.contains("mixes modes"));
        assert!(message.contains("Bypass_Float"));
        assert!(message.contains("beam_width"));
    }
}
