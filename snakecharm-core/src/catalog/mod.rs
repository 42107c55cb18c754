//! catalog - The strategy registry.
//!
//! Strategies are grouped by the syntactic [`Category`] they rewrite. Within a
//! category, registration order is priority order: first-success search takes
//! the first strategy that yields a valid rendering, and the minimizing modes
//! break exact ties in favor of the earlier strategy.
//!
//! A strategy never renders a whole subtree itself. It proposes Python source
//! ([`Rewrite::Expr`]) that the visitor re-parses and renders recursively, or a
//! replacement identifier ([`Rewrite::Ident`]) for the node's name slot.
//!
//! License: MIT OR Apache-2.0

pub mod arith;
pub mod attribute;
pub mod boolop;
pub mod homoglyph;
pub mod int;
pub mod name;
pub mod string;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;
use crate::rules::RuleSet;
use crate::syntax::Subject;

/// Syntactic categories that own strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Int,
    String,
    Name,
    Attribute,
    Keyword,
    BoolOp,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Int,
        Category::String,
        Category::Name,
        Category::Attribute,
        Category::Keyword,
        Category::BoolOp,
    ];

    /// Lowercase name used in strategy references such as `int.by_hex`.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Int => "int",
            Category::String => "string",
            Category::Name => "name",
            Category::Attribute => "attribute",
            Category::Keyword => "keyword",
            Category::BoolOp => "boolop",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    /// Accepts `Int`, `int` and `Bypass_Int` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("Bypass_").unwrap_or(trimmed);
        match bare.to_ascii_lowercase().as_str() {
            "int" => Ok(Category::Int),
            "string" | "str" => Ok(Category::String),
            "name" => Ok(Category::Name),
            "attribute" | "attr" => Ok(Category::Attribute),
            "keyword" => Ok(Category::Keyword),
            "boolop" => Ok(Category::BoolOp),
            _ => Err(ConfigError::UnknownCategory(s.to_string())),
        }
    }
}

/// A strategy's proposal for a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rewrite {
    /// Python source for an equivalent expression.
    Expr(String),
    /// A replacement for the node's identifier slot.
    Ident(String),
}

/// Read-only state a strategy may consult.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub rules: &'a RuleSet,
}

/// A named rewrite for one category.
///
/// Implementations must be pure: the same subject and rules always produce the
/// same rewrites in the same order.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> Category;

    fn description(&self) -> &str;

    fn apply(&self, subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite>;
}

/// Signature of the built-in strategy functions.
pub type ApplyFn = fn(&Subject<'_>, &StrategyContext<'_>) -> Vec<Rewrite>;

/// A strategy backed by a plain function.
#[derive(Clone, Copy)]
pub struct FnStrategy {
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub apply: ApplyFn,
}

impl fmt::Debug for FnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FnStrategy({}.{})", self.category, self.name)
    }
}

impl Strategy for FnStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn description(&self) -> &str {
        self.description
    }

    fn apply(&self, subject: &Subject<'_>, ctx: &StrategyContext<'_>) -> Vec<Rewrite> {
        (self.apply)(subject, ctx)
    }
}

/// Ordered strategies per category.
pub struct StrategyCatalog {
    strategies: BTreeMap<Category, Vec<Box<dyn Strategy>>>,
}

impl StrategyCatalog {
    /// An empty catalog.
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// The catalog with every built-in strategy, in priority order.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        let builtins = int::strategies()
            .into_iter()
            .chain(string::strategies())
            .chain(name::strategies())
            .chain(attribute::strategies())
            .chain(name::keyword_strategies())
            .chain(boolop::strategies());
        for strategy in builtins {
            catalog
                .register(Box::new(strategy))
                .expect("built-in strategy names are unique per category");
        }
        catalog
    }

    /// Appends `strategy` to its category. Names must be unique per category.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> Result<(), ConfigError> {
        let category = strategy.category();
        let entry = self.strategies.entry(category).or_default();
        if entry.iter().any(|s| s.name() == strategy.name()) {
            return Err(ConfigError::DuplicateStrategy {
                category: category.to_string(),
                name: strategy.name().to_string(),
            });
        }
        entry.push(strategy);
        Ok(())
    }

    pub fn for_category(&self, category: Category) -> &[Box<dyn Strategy>] {
        self.strategies.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self, category: Category) -> Vec<&str> {
        self.for_category(category).iter().map(|s| s.name()).collect()
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.for_category(category).iter().any(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.strategies.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// SHA-256 over every registered `category.name` in priority order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (category, strategies) in &self.strategies {
            for strategy in strategies {
                hasher.update(category.as_str().as_bytes());
                hasher.update(b".");
                hasher.update(strategy.name().as_bytes());
                hasher.update(b"\n");
            }
        }
        hex::encode(hasher.finalize())
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (category, strategies) in &self.strategies {
            let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
            map.entry(category, &names);
        }
        map.finish()
    }
}
