//! memo.rs - Success and exhaustion history shared across searches.
//!
//! The memo is an explicit value owned by the caller. Keys carry the
//! configuration fingerprint, so one memo can serve searches under different
//! rules and filters without returning stale results. Inserts are
//! first-writer-wins; nothing is ever overwritten or invalidated.
//!
//! License: MIT OR Apache-2.0

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::errors::BypassError;
use crate::rendering::{Precedence, Rendering};

const MEMO_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoKey {
    /// Fingerprint of the configuration the entry was computed under.
    pub scope: String,
    /// Source text of the node.
    pub node: String,
    /// Binding strength of the node. Separates a module from its lone statement.
    pub precedence: Precedence,
    /// Remaining strategy depth.
    pub depth: u8,
    /// Whether node-level strategies were allowed.
    pub expand: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoEntry {
    /// Ranked valid renderings.
    Success(Vec<Rendering>),
    /// Every strategy tried failed; holds the `category.strategy` names tried.
    Exhausted(Vec<String>),
}

#[derive(Serialize, Deserialize)]
struct MemoFile {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: Vec<(MemoKey, MemoEntry)>,
}

#[derive(Debug, Default)]
pub struct SearchMemo {
    entries: RwLock<HashMap<MemoKey, MemoEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SearchMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &MemoKey) -> Option<MemoEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let found = entries.get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores `entry` unless `key` is already present. Returns whether it was stored.
    pub fn insert(&self, key: MemoKey, entry: MemoEntry) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            log::trace!(target: "snakecharm_core::memo", "Discarding second result for {:?}.", key.node);
            return false;
        }
        entries.insert(key, entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Writes the memo to `path` as bincode.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BypassError> {
        let path = path.as_ref();
        let entries: Vec<(MemoKey, MemoEntry)> = {
            let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let file = MemoFile {
            version: MEMO_FORMAT_VERSION,
            saved_at: Utc::now(),
            entries,
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())
            .map_err(|e| BypassError::Serialization(e.to_string()))?;
        std::fs::write(path, bytes)?;
        info!(target: "snakecharm_core::memo", "Saved {} memo entries to {}.", file.entries.len(), path.display());
        Ok(())
    }

    /// Reads a memo written by [`SearchMemo::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BypassError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let (file, _): (MemoFile, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| BypassError::Memo(format!("{}: {e}", path.display())))?;
        if file.version != MEMO_FORMAT_VERSION {
            return Err(BypassError::Memo(format!(
                "{} has format version {}, expected {}",
                path.display(),
                file.version,
                MEMO_FORMAT_VERSION
            )));
        }
        debug!(
            target: "snakecharm_core::memo",
            "Loaded {} memo entries saved at {}.",
            file.entries.len(),
            file.saved_at
        );
        Ok(Self {
            entries: RwLock::new(file.entries.into_iter().collect()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(node: &str) -> MemoKey {
        MemoKey {
            scope: "scope".into(),
            node: node.into(),
            precedence: Precedence::Atom,
            depth: 2,
            expand: true,
        }
    }

    #[test]
    fn first_writer_wins() {
        let memo = SearchMemo::new();
        let first = MemoEntry::Success(vec![Rendering::new("0xa", Precedence::Atom)]);
        assert!(memo.insert(key("10"), first.clone()));
        assert!(!memo.insert(key("10"), MemoEntry::Exhausted(vec!["int.by_hex".into()])));
        assert_eq!(memo.get(&key("10")), Some(first));
        assert_eq!(memo.get(&key("11")), None);
        assert_eq!((memo.hits(), memo.misses()), (1, 1));
    }

    #[test]
    fn save_and_load_preserve_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memo.bin");
        let memo = SearchMemo::new();
        memo.insert(
            key("'abc'"),
            MemoEntry::Success(vec![Rendering::new("\"abc\"", Precedence::Atom)
                .with_applied(vec!["string.by_quote_trans".into()])]),
        );
        memo.insert(key("x"), MemoEntry::Exhausted(vec!["name.by_unicode".into()]));
        memo.save(&path).unwrap();

        let loaded = SearchMemo::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(&key("x")), memo.get(&key("x")));
        assert_eq!(loaded.get(&key("'abc'")), memo.get(&key("'abc'")));
    }

    #[test]
    fn garbage_is_a_memo_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memo.bin");
        std::fs::write(&path, b"\xff\xff\xff").unwrap();
        assert!(matches!(SearchMemo::load(&path), Err(BypassError::Memo(_))));
    }
}
