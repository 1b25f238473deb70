//! crates/promptsmith_core/src/history.rs
//!
//! The History Store: an ordered log of past generations.
//!
//! The collection is kept sorted newest-first after every mutation. Under the
//! free plan only the most recent `history_limit` unsaved entries survive;
//! saved entries are kept until explicitly deleted.

use crate::domain::{HistoryEntry, HistoryFilter, PlanTier};
use crate::ports::{KeyValueStore, PortError, PortResult};
use crate::store::HISTORY_KEY;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reads a persisted history array. Anything that is not an array yields an
/// empty history; elements that are not well-formed entries are skipped.
pub fn parse_history(raw: &str) -> Vec<HistoryEntry> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };

    let total = items.len();
    let entries: Vec<HistoryEntry> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if entries.len() != total {
        warn!(
            "Skipped {} malformed history entries out of {}.",
            total - entries.len(),
            total
        );
    }
    entries
}

/// Sorts newest-first. The sort is stable, so entries sharing a timestamp keep
/// their relative order, and a freshly prepended entry wins the tie.
fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Keeps every saved entry and the `limit` newest unsaved ones.
/// Expects `entries` to already be sorted newest-first.
pub fn apply_retention(entries: &mut Vec<HistoryEntry>, plan: PlanTier, limit: usize) {
    if plan == PlanTier::Pro {
        return;
    }
    let mut unsaved_seen = 0usize;
    entries.retain(|entry| {
        if entry.saved {
            return true;
        }
        unsaved_seen += 1;
        unsaved_seen <= limit
    });
}

/// Owns the history collection and writes it back after every change.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    history_limit: usize,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Loads the stored history. Missing or corrupt state means an empty history.
    pub fn load(store: Arc<dyn KeyValueStore>, history_limit: usize) -> Self {
        let mut entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => parse_history(&raw),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read history: {}", e);
                Vec::new()
            }
        };
        sort_newest_first(&mut entries);

        Self {
            store,
            history_limit,
            entries,
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn append(&mut self, entry: HistoryEntry, plan: PlanTier) {
        debug!("Appending history entry {}", entry.id);
        self.entries.insert(0, entry);
        self.commit(plan);
    }

    /// Flips the saved flag and returns its new value.
    pub fn toggle_saved(&mut self, id: Uuid, plan: PlanTier) -> PortResult<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| PortError::NotFound(format!("History entry {} not found", id)))?;
        entry.saved = !entry.saved;
        let saved = entry.saved;
        self.commit(plan);
        Ok(saved)
    }

    /// Removes an entry regardless of its saved flag.
    pub fn delete(&mut self, id: Uuid) -> PortResult<()> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Err(PortError::NotFound(format!("History entry {} not found", id)));
        }
        self.persist();
        Ok(())
    }

    /// Drops every unsaved entry and returns how many were removed.
    pub fn clear_unsaved(&mut self, plan: PlanTier) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.saved);
        let removed = before - self.entries.len();
        self.commit(plan);
        removed
    }

    /// Applies the plan's retention cap and returns how many entries were evicted.
    /// Storage is only rewritten when something was evicted.
    pub fn enforce_retention(&mut self, plan: PlanTier) -> usize {
        let before = self.entries.len();
        apply_retention(&mut self.entries, plan, self.history_limit);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("Retention evicted {} history entries.", evicted);
            self.persist();
        }
        evicted
    }

    /// Entries on the given tab whose text contains `query` (case-insensitive).
    pub fn list(&self, filter: HistoryFilter, query: Option<&str>) -> Vec<&HistoryEntry> {
        let needle = query.map(|q| q.trim().to_lowercase()).unwrap_or_default();
        self.entries
            .iter()
            .filter(|e| filter == HistoryFilter::All || e.saved)
            .filter(|e| e.matches_query(&needle))
            .collect()
    }

    fn commit(&mut self, plan: PlanTier) {
        sort_newest_first(&mut self.entries);
        apply_retention(&mut self.entries, plan, self.history_limit);
        self.persist();
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.entries)
            .map_err(|e| e.to_string())
            .and_then(|json| self.store.set(HISTORY_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("Failed to persist history: {}", e);
        }
    }
}
