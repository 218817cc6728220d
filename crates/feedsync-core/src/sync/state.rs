//! Sync state
//!
//! `SyncState` is the single mutable unit owned by the engine. Everything
//! else sees it through the engine's watch channel or a cloned copy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Collection, PageCursor};

/// Coarse error signal exposed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No network and no prior snapshot; lasts until connectivity returns
    NoCachedData,
    /// Transport or decode error; the caller may retry
    FetchFailed,
    /// A durable write failed; logged only, never stored in `last_error`
    PersistenceWriteFailed,
    /// Request rejected because the device is offline
    Offline,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorKind::NoCachedData => "No internet connection and no cached articles available",
            ErrorKind::FetchFailed => "Failed to fetch articles. Please try again.",
            ErrorKind::PersistenceWriteFailed => "Failed to save local data",
            ErrorKind::Offline => "You are currently offline. Showing cached articles.",
        };
        f.write_str(msg)
    }
}

/// Where the engine is in its sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Fetching,
}

/// What happened to the collection when a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Collection was non-empty and left untouched
    Retained,
    /// Collection was empty and has been re-hydrated from the cache
    Rehydrated(usize),
    /// Collection was empty and nothing was cached
    Empty,
}

/// Why a fetch request was dropped without contacting the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch is outstanding
    InFlight,
    /// Device is offline and the request was not forced
    Offline,
    /// Upstream has no further pages
    Exhausted,
}

/// Result of `refresh` / `load_more`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page 1 replaced the collection
    Replaced { count: usize, exhausted: bool },
    /// A later page was appended
    Appended { added: usize, exhausted: bool },
    /// The source failed
    Failed(Fallback),
    /// The request was dropped
    Skipped(SkipReason),
}

impl FetchOutcome {
    /// Whether the source was reached and answered
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            FetchOutcome::Replaced { .. } | FetchOutcome::Appended { .. }
        )
    }
}

/// Result of engine startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Online: a refresh was attempted
    Fetched(FetchOutcome),
    /// Offline with a cached collection
    CachedOffline { count: usize },
    /// Offline with nothing cached
    NoCachedData,
}

/// Engine-owned synchronization state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub(crate) collection: Collection,
    pub(crate) cursor: PageCursor,
    pub(crate) is_fetching: bool,
    pub(crate) is_offline: bool,
    pub(crate) last_error: Option<ErrorKind>,
}

impl SyncState {
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn is_fetching(&self) -> bool {
        self.is_fetching
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    pub fn phase(&self) -> SyncPhase {
        if self.is_fetching {
            SyncPhase::Fetching
        } else {
            SyncPhase::Idle
        }
    }

    /// Whether more pages may be loaded
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }
}

/// On-disk form of the cached collection
///
/// Older caches hold a bare item list; the cursor is then estimated from
/// the item count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CachedFeed {
    Snapshot {
        items: Collection,
        cursor: PageCursor,
    },
    Items(Collection),
}

impl CachedFeed {
    pub(crate) fn into_parts(self, page_size: u32) -> (Collection, PageCursor) {
        match self {
            CachedFeed::Snapshot { items, cursor } => (items, cursor),
            CachedFeed::Items(items) => {
                let pages = items.len() as u32 / page_size.max(1);
                let cursor = PageCursor {
                    next_page: pages + 1,
                    exhausted: false,
                };
                (items, cursor)
            }
        }
    }
}

/// Borrowed form written to the store
#[derive(Debug, Serialize)]
pub(crate) struct CachedFeedRef<'a> {
    pub(crate) items: &'a Collection,
    pub(crate) cursor: PageCursor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn test_default_state_is_idle_and_empty() {
        let state = SyncState::default();
        assert_eq!(state.phase(), SyncPhase::Idle);
        assert!(state.collection().is_empty());
        assert!(state.has_more());
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NoCachedData).unwrap();
        assert_eq!(json, "\"no_cached_data\"");
    }

    #[test]
    fn test_cached_snapshot_round_trip() {
        let items = Collection::from_items(vec![Item::new("a", "A"), Item::new("b", "B")]);
        let cursor = PageCursor {
            next_page: 4,
            exhausted: true,
        };
        let json = serde_json::to_vec(&CachedFeedRef {
            items: &items,
            cursor,
        })
        .unwrap();

        let cached: CachedFeed = serde_json::from_slice(&json).unwrap();
        let (restored, restored_cursor) = cached.into_parts(10);
        assert_eq!(restored.ids(), vec!["a", "b"]);
        assert_eq!(restored_cursor, cursor);
    }

    #[test]
    fn test_cached_bare_list_estimates_cursor() {
        let items: Vec<Item> = (0..20).map(|i| Item::new(format!("id-{}", i), "t")).collect();
        let json = serde_json::to_vec(&items).unwrap();

        let cached: CachedFeed = serde_json::from_slice(&json).unwrap();
        let (restored, cursor) = cached.into_parts(10);
        assert_eq!(restored.len(), 20);
        assert_eq!(cursor.next_page, 3);
        assert!(!cursor.exhausted);
    }
}
