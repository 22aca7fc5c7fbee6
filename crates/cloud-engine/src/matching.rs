//! Grouping item records onto anchors by owner key.

use cloud_records::ItemRecord;
use std::collections::HashMap;

use crate::config::MatchingConfig;

/// Result of resolving an item's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerMatch {
    /// Index into the layout's anchor list
    Anchor(usize),
    /// The key belongs to an anchor that was excluded (no valid position)
    Excluded,
    /// No anchor claims the item's keys
    Unmatched,
}

impl OwnerMatch {
    pub fn anchor(self) -> Option<usize> {
        match self {
            OwnerMatch::Anchor(index) => Some(index),
            _ => None,
        }
    }
}

/// Maps owner keys to anchor slots.
#[derive(Debug, Clone, Default)]
pub struct OwnerIndex {
    /// owner_key -> anchor index, or `None` for an excluded anchor
    keys: HashMap<String, Option<usize>>,
}

impl OwnerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an owner key. Returns false if the key was already taken.
    pub fn claim(&mut self, owner_key: &str, anchor: Option<usize>) -> bool {
        if self.keys.contains_key(owner_key) {
            return false;
        }
        self.keys.insert(owner_key.to_string(), anchor);
        true
    }

    fn lookup(&self, key: &str) -> Option<OwnerMatch> {
        self.keys.get(key).map(|slot| match slot {
            Some(index) => OwnerMatch::Anchor(*index),
            None => OwnerMatch::Excluded,
        })
    }

    /// Resolves the owner of an item.
    ///
    /// The owner field is matched exactly first; unless matching is strict the
    /// fallback field is tried when that misses.
    pub fn resolve(&self, item: &ItemRecord, config: &MatchingConfig) -> OwnerMatch {
        if let Some(found) = item
            .key(&config.owner_field)
            .and_then(|key| self.lookup(&key))
        {
            return found;
        }
        if config.strict {
            return OwnerMatch::Unmatched;
        }
        config
            .fallback_field
            .as_deref()
            .and_then(|field| item.key(field))
            .and_then(|key| self.lookup(&key))
            .unwrap_or(OwnerMatch::Unmatched)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
