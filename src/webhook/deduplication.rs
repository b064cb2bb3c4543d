use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::models::{RowId, RowSnapshot};

/// Identity of one applied row state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub row_id: RowId,
    pub version: i64,
}

impl DedupKey {
    pub fn new(row_id: RowId, version: i64) -> Self {
        Self { row_id, version }
    }
}

impl From<&RowSnapshot> for DedupKey {
    fn from(snapshot: &RowSnapshot) -> Self {
        Self::new(snapshot.row_id, snapshot.version)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row_id, self.version)
    }
}

/// Row states already applied during one batch.
///
/// A scope is owned by a single batch worker and passed explicitly into the
/// dispatcher, so concurrent batches never share dedup state. It protects
/// against duplicates within a batch only and is not durable.
#[derive(Debug, Default)]
pub struct DedupScope {
    seen: HashSet<DedupKey>,
}

impl DedupScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    pub fn mark_seen(&mut self, key: DedupKey) {
        if !self.seen.insert(key) {
            debug!("Dedup key {} was already marked", key);
        }
    }

    /// Forgets every key. Called once per batch, before processing it.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deduplication() {
        let mut scope = DedupScope::new();
        let key = DedupKey::new(RowId(1), 1);

        // First sighting is new
        assert!(!scope.seen(&key));
        scope.mark_seen(key);

        // Same row state is a duplicate
        assert!(scope.seen(&key));

        // Another version of the same row is not
        assert!(!scope.seen(&DedupKey::new(RowId(1), 2)));
        // Nor the same version of another row
        assert!(!scope.seen(&DedupKey::new(RowId(2), 1)));
    }

    #[test]
    fn test_mark_seen_is_idempotent() {
        let mut scope = DedupScope::new();
        let key = DedupKey::new(RowId(7), 3);

        scope.mark_seen(key);
        scope.mark_seen(key);

        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_reset_clears_scope() {
        let mut scope = DedupScope::new();
        scope.mark_seen(DedupKey::new(RowId(1), 1));
        scope.mark_seen(DedupKey::new(RowId(2), 1));
        assert_eq!(scope.len(), 2);

        scope.reset();

        assert!(scope.is_empty());
        assert!(!scope.seen(&DedupKey::new(RowId(1), 1)));
    }

    #[test]
    fn test_key_from_snapshot() {
        let snapshot = RowSnapshot {
            row_id: RowId(42),
            version: 5,
            cell_values: vec![],
        };
        let key = DedupKey::from(&snapshot);
        assert_eq!(key, DedupKey::new(RowId(42), 5));
        assert_eq!(key.to_string(), "42_5");
    }
}
