//! visitor.rs - Bottom-up rendering of a syntax tree.
//!
//! Every node yields a ranked, rule-satisfying set of at most `beam_width`
//! renderings. A node's set is the merge of two sources:
//!
//! * combinations of its children's renderings, spelled with the node's
//!   [`Layout`];
//! * node-level strategies for the node's category, tried when the
//!   combinations produce nothing valid (or always, for exhaustive minimize
//!   searches).
//!
//! Strategy output is Python source. It is parsed and rendered recursively
//! with one less level of depth, so a rewrite's own literals and names can
//! be rewritten again. Every rendering is checked against the rules at the
//! level it is produced; validity is never inherited from children.
//!
//! License: MIT OR Apache-2.0

use lazy_static::lazy_static;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::catalog::{Rewrite, StrategyCatalog, StrategyContext};
use crate::config::{SearchConfig, SearchMode};
use crate::errors::ParseError;
use crate::memo::{MemoEntry, MemoKey, SearchMemo};
use crate::rendering::{dedupe, rank, Rendering};
use crate::search::CancellationToken;
use crate::syntax::{layout, parse_expression, Layout, NodeId, SyntaxTree};

const REWRITE_CACHE_LIMIT: usize = 1 << 16;

lazy_static! {
    /// Parsed strategy output, keyed by source. Parsing is pure, so the cache
    /// is shared by every search in the process.
    static ref REWRITE_CACHE: RwLock<HashMap<String, Result<Arc<SyntaxTree>, ParseError>>> =
        RwLock::new(HashMap::new());
}

fn parse_rewrite(source: &str) -> Result<Arc<SyntaxTree>, ParseError> {
    if let Some(hit) = REWRITE_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(source)
    {
        return hit.clone();
    }
    let parsed = parse_expression(source).map(Arc::new);
    let mut cache = REWRITE_CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if cache.len() >= REWRITE_CACHE_LIMIT {
        cache.clear();
    }
    cache.insert(source.to_string(), parsed.clone());
    parsed
}

/// Work counters for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub nodes_visited: u64,
    pub memo_hits: u64,
    pub strategy_applications: u64,
    pub combinations_tried: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    nodes_visited: AtomicU64,
    memo_hits: AtomicU64,
    strategy_applications: AtomicU64,
    combinations_tried: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SearchStats {
        SearchStats {
            nodes_visited: self.nodes_visited.load(Ordering::Relaxed),
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
            strategy_applications: self.strategy_applications.load(Ordering::Relaxed),
            combinations_tried: self.combinations_tried.load(Ordering::Relaxed),
        }
    }
}

/// Cancellation token plus an optional wall-clock deadline.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

pub struct Visitor<'a> {
    catalog: &'a StrategyCatalog,
    config: &'a SearchConfig,
    memo: &'a SearchMemo,
    stop: &'a StopSignal,
    scope: String,
    stats: StatCounters,
}

impl<'a> Visitor<'a> {
    pub fn new(
        catalog: &'a StrategyCatalog,
        config: &'a SearchConfig,
        memo: &'a SearchMemo,
        stop: &'a StopSignal,
    ) -> Self {
        Self {
            catalog,
            config,
            memo,
            stop,
            scope: config.fingerprint(catalog),
            stats: StatCounters::default(),
        }
    }

    pub fn stats(&self) -> SearchStats {
        self.stats.snapshot()
    }

    /// Ranked valid renderings of the whole tree.
    pub fn render_tree(&self, tree: &SyntaxTree) -> Vec<Rendering> {
        self.render(tree, tree.root(), self.config.options().max_depth, true)
    }

    /// Ranked valid renderings of node `id`.
    ///
    /// `depth` bounds nested strategy applications; `expand` allows
    /// node-level strategies at this node and below.
    pub fn render(&self, tree: &SyntaxTree, id: NodeId, depth: u8, expand: bool) -> Vec<Rendering> {
        StatCounters::bump(&self.stats.nodes_visited, 1);
        if self.stop.is_stopped() {
            return Vec::new();
        }

        let key = MemoKey {
            scope: self.scope.clone(),
            node: tree.text(id).to_string(),
            precedence: tree.precedence(id),
            depth,
            expand,
        };
        if let Some(entry) = self.memo.get(&key) {
            StatCounters::bump(&self.stats.memo_hits, 1);
            return match entry {
                MemoEntry::Success(renderings) => renderings,
                MemoEntry::Exhausted(_) => Vec::new(),
            };
        }

        let layout = layout(tree, id);
        let children = self.render_children(tree, &layout, depth, expand);

        let mut candidates = self.combine(&layout, &children, None, None);
        let mut tried: Vec<String> = Vec::new();

        let mode = self.config.mode();
        let wants_strategies =
            candidates.is_empty() || (mode.is_minimize() && self.config.options().exhaustive);
        if expand && depth > 0 && wants_strategies {
            candidates.extend(self.apply_strategies(tree, id, &layout, &children, depth, &mut tried));
        }

        dedupe(&mut candidates);
        rank(&mut candidates, mode);
        candidates.truncate(self.config.options().beam_width);

        if self.stop.is_stopped() {
            return candidates;
        }
        let entry = if candidates.is_empty() {
            trace!(target: "snakecharm_core::visitor", "No rendering for {:?} at depth {}.", key.node, depth);
            MemoEntry::Exhausted(tried)
        } else {
            MemoEntry::Success(candidates.clone())
        };
        self.memo.insert(key, entry);
        candidates
    }

    fn render_children(&self, tree: &SyntaxTree, layout: &Layout, depth: u8, expand: bool) -> Vec<Vec<Rendering>> {
        let ids = layout.child_ids();
        if self.config.options().parallel && ids.len() > 1 {
            ids.par_iter().map(|&c| self.render(tree, c, depth, expand)).collect()
        } else {
            let mut out = Vec::with_capacity(ids.len());
            for c in ids {
                let rendered = self.render(tree, c, depth, expand);
                let failed = rendered.is_empty();
                out.push(rendered);
                // One failed child already rules out every combination.
                if failed && self.config.mode() == SearchMode::FirstSuccess {
                    break;
                }
            }
            out
        }
    }

    fn apply_strategies(
        &self,
        tree: &SyntaxTree,
        id: NodeId,
        layout: &Layout,
        children: &[Vec<Rendering>],
        depth: u8,
        tried: &mut Vec<String>,
    ) -> Vec<Rendering> {
        let Some(subject) = tree.subject(id) else {
            return Vec::new();
        };
        let category = subject.category();
        let ctx = StrategyContext {
            rules: self.config.rules(),
        };
        let minimize = self.config.mode().is_minimize();
        let mut out = Vec::new();

        for strategy in self.catalog.for_category(category) {
            if self.stop.is_stopped() {
                break;
            }
            if !self.config.filter().allows(category, strategy.name()) {
                continue;
            }
            StatCounters::bump(&self.stats.strategy_applications, 1);
            let reference = format!("{}.{}", category, strategy.name());
            tried.push(reference.clone());

            let mut produced = Vec::new();
            for rewrite in strategy.apply(&subject, &ctx) {
                let rendered = match rewrite {
                    Rewrite::Ident(name) => self.combine(layout, children, Some(&name), Some(&reference)),
                    Rewrite::Expr(source) => match parse_rewrite(&source) {
                        Ok(sub) => {
                            let same_leaf = sub.subject(sub.root()).as_ref() == Some(&subject);
                            sub_renderings(self.render(&sub, sub.root(), depth - 1, !same_leaf), &reference)
                        }
                        Err(e) => {
                            warn!(
                                target: "snakecharm_core::visitor",
                                "Strategy {} produced unparseable source {:?}: {}",
                                reference,
                                source,
                                e
                            );
                            continue;
                        }
                    },
                };
                produced.extend(rendered);
                if !minimize && !produced.is_empty() {
                    break;
                }
            }

            if !produced.is_empty() {
                debug!(
                    target: "snakecharm_core::visitor",
                    "{} rewrote {:?} ({} renderings).",
                    reference,
                    tree.text(id),
                    produced.len()
                );
                out.extend(produced);
                if !minimize {
                    break;
                }
            }
        }
        out
    }

    /// Valid combinations of one rendering per child.
    fn combine(
        &self,
        layout: &Layout,
        children: &[Vec<Rendering>],
        ident: Option<&str>,
        reference: Option<&str>,
    ) -> Vec<Rendering> {
        if children.len() < layout.child_ids().len() || children.iter().any(Vec::is_empty) {
            return Vec::new();
        }
        let options = self.config.options();
        let minimize = self.config.mode().is_minimize();
        let total = children.iter().try_fold(1usize, |acc, c| acc.checked_mul(c.len()));

        let picks = match total {
            Some(n) if n <= options.max_combinations || !minimize => self.enumerate(layout, children, ident),
            _ => self.fold(layout, children, ident),
        };

        picks
            .into_iter()
            .map(|(text, chosen)| {
                let mut applied: Vec<String> = reference.map(str::to_string).into_iter().collect();
                applied.extend(chosen.iter().flat_map(|r| r.applied.iter().cloned()));
                Rendering::new(text, layout.precedence).with_applied(applied)
            })
            .collect()
    }

    /// Odometer walk over the cross product in child priority order.
    ///
    /// First-success stops once a beam of valid texts is found; minimize
    /// modes walk every combination up to `max_combinations`.
    fn enumerate<'r>(
        &self,
        layout: &Layout,
        children: &'r [Vec<Rendering>],
        ident: Option<&str>,
    ) -> Vec<(String, Vec<&'r Rendering>)> {
        let options = self.config.options();
        let rules = self.config.rules();
        let minimize = self.config.mode().is_minimize();
        let mut out = Vec::new();
        let mut index = vec![0usize; children.len()];

        for _ in 0..options.max_combinations {
            if self.stop.is_stopped() {
                break;
            }
            let chosen: Vec<&Rendering> = index.iter().zip(children).map(|(&i, c)| &c[i]).collect();
            StatCounters::bump(&self.stats.combinations_tried, 1);
            let text = layout.assemble(&chosen, ident);
            if rules.allows(&text) {
                out.push((text, chosen));
                if !minimize && out.len() >= options.beam_width {
                    break;
                }
            }
            if !advance(&mut index, children) {
                break;
            }
        }
        out
    }

    /// Left-to-right beam over partial combinations, for products too large
    /// to enumerate. Partial texts that already break a monotone rule set are
    /// dropped early.
    fn fold<'r>(
        &self,
        layout: &Layout,
        children: &'r [Vec<Rendering>],
        ident: Option<&str>,
    ) -> Vec<(String, Vec<&'r Rendering>)> {
        let options = self.config.options();
        let rules = self.config.rules();
        let widest = children.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let keep = (options.max_combinations / widest).max(options.beam_width);
        let prune = rules.is_monotone();
        let mode = self.config.mode();

        let mut partial: Vec<(String, Vec<&Rendering>)> = vec![(String::new(), Vec::new())];
        for child in children {
            if self.stop.is_stopped() {
                return Vec::new();
            }
            let mut next = Vec::with_capacity(partial.len() * child.len());
            for (_, prefix) in &partial {
                for rendering in child {
                    let mut chosen = prefix.clone();
                    chosen.push(rendering);
                    let text = layout.assemble(&chosen, ident);
                    StatCounters::bump(&self.stats.combinations_tried, 1);
                    if prune && !rules.allows(&text) {
                        continue;
                    }
                    next.push((text, chosen));
                }
            }
            sort_partials(&mut next, mode);
            next.truncate(keep);
            partial = next;
        }

        partial
            .into_iter()
            .filter(|(text, _)| rules.allows(text))
            .collect()
    }
}

fn sub_renderings(renderings: Vec<Rendering>, reference: &str) -> Vec<Rendering> {
    renderings
        .into_iter()
        .map(|mut r| {
            r.applied.insert(0, reference.to_string());
            r
        })
        .collect()
}

fn sort_partials(partials: &mut [(String, Vec<&Rendering>)], mode: SearchMode) {
    match mode {
        SearchMode::FirstSuccess => {}
        SearchMode::MinLen => partials.sort_by_cached_key(|(text, _)| text.chars().count()),
        SearchMode::MinSet | SearchMode::MinSetLen => partials.sort_by_cached_key(|(text, _)| {
            let mut chars: Vec<char> = text.chars().collect();
            let len = chars.len();
            chars.sort_unstable();
            chars.dedup();
            (chars.len(), len)
        }),
    }
}

/// Steps `index` to the next combination, last child fastest.
fn advance(index: &mut [usize], children: &[Vec<Rendering>]) -> bool {
    for pos in (0..index.len()).rev() {
        index[pos] += 1;
        if index[pos] < children[pos].len() {
            return true;
        }
        index[pos] = 0;
    }
    false
}
