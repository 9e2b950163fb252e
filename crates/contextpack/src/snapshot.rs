use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool result kept for follow-up questions ("approve the second one").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(alias = "Data", default)]
    pub data: Value,
}

impl SnapshotEntry {
    pub fn new(entry_type: impl Into<String>, data: Value) -> Self {
        Self {
            entry_type: entry_type.into(),
            data,
        }
    }
}

/// The most recent tool results, oldest first, never longer than its
/// capacity. The client resends it verbatim on the next turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    entries: VecDeque<SnapshotEntry>,
    capacity: usize,
}

impl ContextSnapshot {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Restore a snapshot resent by the client, keeping the `capacity`
    /// most recent entries. Elements that are not objects are skipped;
    /// text that is not a JSON array yields an empty snapshot.
    pub fn from_json(text: Option<&str>, capacity: usize) -> Self {
        let mut snapshot = Self::new(capacity);
        let Some(text) = text else {
            return snapshot;
        };
        let items = match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!("resent context snapshot is not an array, ignoring");
                return snapshot;
            }
            Err(e) => {
                tracing::warn!(error = %e, "resent context snapshot is not valid JSON, ignoring");
                return snapshot;
            }
        };
        for item in items {
            if !item.is_object() {
                tracing::warn!("skipping non-object snapshot entry");
                continue;
            }
            match serde_json::from_value::<SnapshotEntry>(item) {
                Ok(entry) => {
                    snapshot.push(entry);
                }
                Err(e) => tracing::warn!(error = %e, "skipping malformed snapshot entry"),
            }
        }
        snapshot
    }

    /// Append, evicting the oldest entry when over capacity. Returns the
    /// evicted entry, if any.
    pub fn push(&mut self, entry: SnapshotEntry) -> Option<SnapshotEntry> {
        if self.capacity == 0 {
            return Some(entry);
        }
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter()
    }

    /// Pretty JSON array, the form sent back to the client.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
