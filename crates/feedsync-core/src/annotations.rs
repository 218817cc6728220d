//! User annotations
//!
//! An `AnnotationSet` is a persisted set of item ids for one toggleable
//! flag. Two independent sets exist (liked, bookmarked); an item may be in
//! neither, either or both.
//!
//! Toggles update memory immediately and queue the full set for writing.
//! A failed write is logged by the write queue and not rolled back; the
//! next successful write wins.

use std::collections::BTreeSet;

use tracing::debug;

use crate::storage::{read_json, PersistentStore, WriteQueue, BOOKMARKED_KEY, LIKED_KEY};

/// Which flag a set represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Liked,
    Bookmarked,
}

impl AnnotationKind {
    /// Storage key for this set
    pub fn key(&self) -> &'static str {
        match self {
            AnnotationKind::Liked => LIKED_KEY,
            AnnotationKind::Bookmarked => BOOKMARKED_KEY,
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationKind::Liked => write!(f, "liked"),
            AnnotationKind::Bookmarked => write!(f, "bookmarked"),
        }
    }
}

/// Persisted set of item ids
pub struct AnnotationSet {
    kind: AnnotationKind,
    ids: BTreeSet<String>,
    writer: WriteQueue,
}

impl AnnotationSet {
    /// Create an empty set
    pub fn new(kind: AnnotationKind, writer: WriteQueue) -> Self {
        Self {
            kind,
            ids: BTreeSet::new(),
            writer,
        }
    }

    /// Load the persisted set, defaulting to empty on absence or corruption
    pub fn hydrate(kind: AnnotationKind, store: &dyn PersistentStore, writer: WriteQueue) -> Self {
        let ids: BTreeSet<String> = read_json::<Vec<String>>(store, kind.key())
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();
        debug!("Hydrated {} {} id(s)", ids.len(), kind);

        Self { kind, ids, writer }
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Flip membership of `id` and persist the set
    ///
    /// Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> bool {
        let member = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };
        debug!("{} {} -> {}", self.kind, id, member);

        let ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        self.writer.submit_json(self.kind.key(), &ids);

        member
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::testing::FailingStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_toggle_twice_restores_membership() {
        let store = Arc::new(MemoryStore::new());
        let writer = WriteQueue::spawn(store.clone());
        let mut liked = AnnotationSet::new(AnnotationKind::Liked, writer);

        assert!(!liked.contains("a"));
        assert!(liked.toggle("a"));
        assert!(liked.contains("a"));
        assert!(!liked.toggle("a"));
        assert!(!liked.contains("a"));
        assert!(liked.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_persists_full_set() {
        let store = Arc::new(MemoryStore::new());
        let writer = WriteQueue::spawn(store.clone());
        let mut bookmarked = AnnotationSet::new(AnnotationKind::Bookmarked, writer.clone());

        bookmarked.toggle("b");
        bookmarked.toggle("a");
        writer.flush().await;

        assert_eq!(
            store.get(BOOKMARKED_KEY).unwrap().unwrap(),
            br#"["a","b"]"#
        );

        let restored = AnnotationSet::hydrate(AnnotationKind::Bookmarked, store.as_ref(), writer);
        assert_eq!(restored.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_sets_are_independent() {
        let store = Arc::new(MemoryStore::new());
        let writer = WriteQueue::spawn(store.clone());
        let mut liked = AnnotationSet::new(AnnotationKind::Liked, writer.clone());
        let mut bookmarked = AnnotationSet::new(AnnotationKind::Bookmarked, writer.clone());

        liked.toggle("x");
        bookmarked.toggle("x");
        bookmarked.toggle("y");
        writer.flush().await;

        assert!(liked.contains("x") && bookmarked.contains("x"));
        assert!(!liked.contains("y"));
        assert_eq!(store.get(LIKED_KEY).unwrap().unwrap(), br#"["x"]"#);
        assert_eq!(store.get(BOOKMARKED_KEY).unwrap().unwrap(), br#"["x","y"]"#);
    }

    #[tokio::test]
    async fn test_hydrate_defaults_to_empty() {
        let store = Arc::new(MemoryStore::new());
        let writer = WriteQueue::spawn(store.clone());

        let liked = AnnotationSet::hydrate(AnnotationKind::Liked, store.as_ref(), writer.clone());
        assert!(liked.is_empty());

        store.set(LIKED_KEY, b"not json").unwrap();
        let liked = AnnotationSet::hydrate(AnnotationKind::Liked, store.as_ref(), writer);
        assert!(liked.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_keeps_toggle() {
        let store = Arc::new(FailingStore::new());
        let writer = WriteQueue::spawn(store.clone());
        let mut liked = AnnotationSet::new(AnnotationKind::Liked, writer.clone());

        assert!(liked.toggle("a"));
        writer.flush().await;

        assert!(liked.contains("a"));
        assert_eq!(writer.failed_writes(), 1);
    }
}
