//! filter.rs - Per-category allow/deny lists over strategy names.
//!
//! A category absent from the map keeps every strategy. A category may carry
//! a white list or a black list, never both.
//!
//! License: MIT OR Apache-2.0

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Category, StrategyCatalog};
use crate::config::FilterSpec;
use crate::errors::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEntry {
    White(BTreeSet<String>),
    Black(BTreeSet<String>),
}

impl FilterEntry {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            FilterEntry::White(names) => names.contains(name),
            FilterEntry::Black(names) => !names.contains(name),
        }
    }

    fn names(&self) -> &BTreeSet<String> {
        match self {
            FilterEntry::White(names) | FilterEntry::Black(names) => names,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyFilterMap {
    entries: BTreeMap<Category, FilterEntry>,
}

impl StrategyFilterMap {
    /// No filtering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `category` to `names`.
    pub fn white<I, S>(self, category: Category, names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(category, FilterEntry::White(names.into_iter().map(Into::into).collect()))
    }

    /// Removes `names` from `category`.
    pub fn black<I, S>(self, category: Category, names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(category, FilterEntry::Black(names.into_iter().map(Into::into).collect()))
    }

    fn insert(mut self, category: Category, entry: FilterEntry) -> Result<Self, ConfigError> {
        match (self.entries.get_mut(&category), entry) {
            (None, entry) => {
                self.entries.insert(category, entry);
            }
            (Some(FilterEntry::White(existing)), FilterEntry::White(more))
            | (Some(FilterEntry::Black(existing)), FilterEntry::Black(more)) => existing.extend(more),
            (Some(_), _) => return Err(ConfigError::ConflictingFilter(category.to_string())),
        }
        Ok(self)
    }

    pub fn from_spec(spec: &FilterSpec) -> Result<Self, ConfigError> {
        let mut map = Self::new();
        for (category, names) in &spec.white {
            map = map.white(category.parse()?, names.iter().cloned())?;
        }
        for (category, names) in &spec.black {
            map = map.black(category.parse()?, names.iter().cloned())?;
        }
        debug!("Built strategy filter for {} categories.", map.entries.len());
        Ok(map)
    }

    pub fn entry(&self, category: Category) -> Option<&FilterEntry> {
        self.entries.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn allows(&self, category: Category, name: &str) -> bool {
        allowed(category, name, self)
    }

    /// Logs filter names that no registered strategy carries.
    pub fn warn_unknown(&self, catalog: &StrategyCatalog) {
        for (category, entry) in &self.entries {
            for name in entry.names() {
                if !catalog.contains(*category, name) {
                    warn!("Strategy '{}' in the {} filter does not exist.", name, category);
                }
            }
        }
    }

    /// Stable text form used in configuration fingerprints.
    pub fn fingerprint_material(&self) -> String {
        let mut out = String::new();
        for (category, entry) in &self.entries {
            let (tag, names) = match entry {
                FilterEntry::White(names) => ("white", names),
                FilterEntry::Black(names) => ("black", names),
            };
            out.push_str(&format!("{category}:{tag}:"));
            for name in names {
                out.push_str(name);
                out.push(',');
            }
            out.push(';');
        }
        out
    }
}

/// True if `name` may run for `category` under `map`.
pub fn allowed(category: Category, name: &str, map: &StrategyFilterMap) -> bool {
    map.entry(category).map_or(true, |entry| entry.allows(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn absent_category_allows_everything() {
        let map = StrategyFilterMap::new().white(Category::Name, ["by_builtins"]).unwrap();
        assert!(allowed(Category::Int, "by_hex", &map));
        assert!(allowed(Category::Name, "by_builtins", &map));
        assert!(!allowed(Category::Name, "by_unicode", &map));
    }

    #[test]
    fn black_list_excludes_only_listed() {
        let map = StrategyFilterMap::new().black(Category::Int, ["by_cal"]).unwrap();
        assert!(!map.allows(Category::Int, "by_cal"));
        assert!(map.allows(Category::Int, "by_hex"));
    }

    #[test]
    fn white_and_black_for_one_category_conflict() {
        let err = StrategyFilterMap::new()
            .white(Category::String, ["by_char"])
            .unwrap()
            .black(Category::String, ["by_dict"])
            .unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingFilter(c) if c == "string"));
    }

    #[test]
    fn empty_white_list_disables_category() {
        let map = StrategyFilterMap::new().white(Category::Int, Vec::<String>::new()).unwrap();
        assert!(!map.allows(Category::Int, "by_hex"));
    }

    #[test]
    fn spec_accepts_python_style_names() {
        let spec = FilterSpec {
            white: BTreeMap::from([("Bypass_Name".to_string(), vec!["by_builtins".to_string()])]),
            black: BTreeMap::new(),
        };
        let map = StrategyFilterMap::from_spec(&spec).unwrap();
        assert!(!map.allows(Category::Name, "by_unicode"));

        let spec = FilterSpec {
            white: BTreeMap::from([("Bypass_Float".to_string(), vec![])]),
            black: BTreeMap::new(),
        };
        assert!(matches!(
            StrategyFilterMap::from_spec(&spec),
            Err(ConfigError::UnknownCategory(_))
        ));
    }
}
