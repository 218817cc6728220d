//! Presentation-facing session
//!
//! `FeedSession` bundles the sync engine, both annotation sets and the
//! search term behind the intents a renderer may invoke, and produces
//! read-only [`Snapshot`]s for it to draw.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = FeedSession::open(source, store, EngineOptions::default()).await;
//! session.initialize().await;
//! session.set_search_term("climate");
//! for view in session.snapshot().items {
//!     println!("{} {}", if view.liked { "♥" } else { " " }, view.item.title);
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::annotations::{AnnotationKind, AnnotationSet};
use crate::models::Item;
use crate::query::QueryView;
use crate::source::ContentSource;
use crate::storage::{PersistentStore, WriteQueue};
use crate::sync::{
    EngineOptions, ErrorKind, FetchOutcome, StartupOutcome, SyncEngine, SyncState,
};

/// An item together with its annotation flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    /// 1-based position in the unfiltered collection
    pub position: usize,
    pub liked: bool,
    pub bookmarked: bool,
}

/// Read-only projection handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Search-filtered items in collection order
    pub items: Vec<ItemView>,
    /// A fetch is outstanding
    pub is_loading: bool,
    pub is_offline: bool,
    pub error: Option<ErrorKind>,
    /// More pages may be loaded
    pub has_more: bool,
    /// Items held before filtering
    pub total_held: usize,
}

impl Snapshot {
    fn build(
        state: &SyncState,
        query: &QueryView,
        liked: &AnnotationSet,
        bookmarked: &AnnotationSet,
    ) -> Self {
        let items = query
            .apply(state.collection().items())
            .into_iter()
            .map(|(index, item)| ItemView {
                position: index + 1,
                liked: liked.contains(&item.id),
                bookmarked: bookmarked.contains(&item.id),
                item: item.clone(),
            })
            .collect();

        Self {
            items,
            is_loading: state.is_fetching(),
            is_offline: state.is_offline(),
            error: state.last_error(),
            has_more: state.has_more(),
            total_held: state.collection().len(),
        }
    }

    /// Nothing to show and the reason is an error
    pub fn is_error_state(&self) -> bool {
        self.items.is_empty() && self.error.is_some()
    }
}

/// Engine, annotations and search term behind one set of intents
pub struct FeedSession<S> {
    engine: Arc<SyncEngine<S>>,
    liked: AnnotationSet,
    bookmarked: AnnotationSet,
    query: QueryView,
    writer: WriteQueue,
}

impl<S: ContentSource> FeedSession<S> {
    /// Build a session over `store`, hydrating both annotation sets
    ///
    /// Must be called within a tokio runtime (spawns the write queue).
    pub async fn open(source: S, store: Arc<dyn PersistentStore>, options: EngineOptions) -> Self {
        let writer = WriteQueue::spawn(Arc::clone(&store));
        let (liked, bookmarked) = hydrate_annotations(Arc::clone(&store), writer.clone()).await;
        let engine = Arc::new(SyncEngine::new(source, store, writer.clone(), options));

        Self {
            engine,
            liked,
            bookmarked,
            query: QueryView::new(),
            writer,
        }
    }

    /// Shared handle to the engine (for the connectivity monitor)
    pub fn engine(&self) -> &Arc<SyncEngine<S>> {
        &self.engine
    }

    /// Load cached items only; returns how many were found
    pub async fn hydrate(&self) -> usize {
        self.engine.hydrate().await
    }

    pub async fn initialize(&self) -> StartupOutcome {
        self.engine.initialize().await
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.engine.refresh().await
    }

    /// Refresh even if the device is believed to be offline (retry)
    pub async fn force_refresh(&self) -> FetchOutcome {
        self.engine.force_refresh().await
    }

    pub async fn load_more(&self) -> FetchOutcome {
        self.engine.load_more().await
    }

    /// Flip the liked flag; returns the new state
    pub fn toggle_like(&mut self, id: &str) -> bool {
        self.liked.toggle(id)
    }

    /// Flip the bookmarked flag; returns the new state
    pub fn toggle_bookmark(&mut self, id: &str) -> bool {
        self.bookmarked.toggle(id)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.query.set_term(term);
    }

    pub fn search_term(&self) -> &str {
        self.query.term()
    }

    pub fn liked(&self) -> &AnnotationSet {
        &self.liked
    }

    pub fn bookmarked(&self) -> &AnnotationSet {
        &self.bookmarked
    }

    /// Current projection for the renderer
    pub fn snapshot(&self) -> Snapshot {
        self.engine
            .with_state(|state| Snapshot::build(state, &self.query, &self.liked, &self.bookmarked))
    }

    /// Resolve a listing position ([`ItemView::position`]) to an item id
    pub fn id_at(&self, position: usize) -> Option<String> {
        let index = position.checked_sub(1)?;
        self.engine.with_state(|state| {
            state
                .collection()
                .items()
                .get(index)
                .map(|item| item.id.clone())
        })
    }

    /// Whether the collection holds `id`
    pub fn contains(&self, id: &str) -> bool {
        self.engine.with_state(|state| state.collection().contains(id))
    }

    /// Held item `id` with its annotation flags, ignoring the search term
    pub fn view(&self, id: &str) -> Option<ItemView> {
        self.engine.with_state(|state| {
            let items = state.collection().items();
            items
                .iter()
                .position(|item| item.id == id)
                .map(|index| ItemView {
                    item: items[index].clone(),
                    position: index + 1,
                    liked: self.liked.contains(id),
                    bookmarked: self.bookmarked.contains(id),
                })
        })
    }

    /// Wait for queued writes to land
    pub async fn flush(&self) {
        self.writer.flush().await;
    }
}

/// Read both annotation sets off the runtime thread
async fn hydrate_annotations(
    store: Arc<dyn PersistentStore>,
    writer: WriteQueue,
) -> (AnnotationSet, AnnotationSet) {
    let fallback = writer.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let liked = AnnotationSet::hydrate(AnnotationKind::Liked, store.as_ref(), writer.clone());
        let bookmarked = AnnotationSet::hydrate(AnnotationKind::Bookmarked, store.as_ref(), writer);
        (liked, bookmarked)
    })
    .await;

    match loaded {
        Ok(sets) => sets,
        Err(e) => {
            warn!("Annotation read task failed: {}", e);
            (
                AnnotationSet::new(AnnotationKind::Liked, fallback.clone()),
                AnnotationSet::new(AnnotationKind::Bookmarked, fallback),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use crate::source::Page;
    use crate::storage::{FileStore, MemoryStore, BOOKMARKED_KEY, LIKED_KEY};
    use crate::sync::SkipReason;
    use crate::testing::{page, FailingStore, ScriptedSource};

    async fn session_with(
        source: ScriptedSource,
        store: Arc<MemoryStore>,
    ) -> FeedSession<ScriptedSource> {
        FeedSession::open(source, store, EngineOptions::default()).await
    }

    #[tokio::test]
    async fn test_snapshot_after_initialize() {
        let source = ScriptedSource::new();
        source.push_page(page(0..10, 25));
        let session = session_with(source, Arc::new(MemoryStore::new())).await;

        session.initialize().await;
        let snapshot = session.snapshot();

        assert_eq!(snapshot.items.len(), 10);
        assert!(snapshot.has_more);
        assert!(!snapshot.is_loading);
        assert!(!snapshot.is_offline);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.total_held, 10);
    }

    #[tokio::test]
    async fn test_search_term_projection() {
        // Scenario E
        let source = ScriptedSource::new();
        source.push_page(Page::new(
            vec![
                Item::new("a", "Markets rally").with_description("Stocks"),
                Item::new("b", "Climate crisis update").with_description("Summit"),
                Item::new("c", "Local news").with_description("Roads"),
            ],
            3,
        ));
        let mut session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;

        session.set_search_term("climate");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].item.title, "Climate crisis update");
        assert_eq!(snapshot.items[0].position, 2);
        assert_eq!(snapshot.total_held, 3);

        session.set_search_term("");
        let ids: Vec<String> = session
            .snapshot()
            .items
            .into_iter()
            .map(|v| v.item.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_annotation_flags_in_snapshot() {
        let source = ScriptedSource::new();
        source.push_page(page(0..3, 3));
        let mut session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;

        assert!(session.toggle_like("item-0"));
        assert!(session.toggle_bookmark("item-0"));
        assert!(session.toggle_bookmark("item-2"));

        let snapshot = session.snapshot();
        assert!(snapshot.items[0].liked && snapshot.items[0].bookmarked);
        assert!(!snapshot.items[1].liked && !snapshot.items[1].bookmarked);
        assert!(!snapshot.items[2].liked && snapshot.items[2].bookmarked);
    }

    #[tokio::test]
    async fn test_annotations_survive_reopen() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut session = session_with(ScriptedSource::new(), store.clone()).await;
            session.toggle_like("item-1");
            session.toggle_like("item-5");
            session.toggle_like("item-1");
            session.flush().await;
        }
        assert_eq!(store.get(LIKED_KEY).unwrap().unwrap(), br#"["item-5"]"#);

        let session = session_with(ScriptedSource::new(), store).await;
        assert!(session.liked().contains("item-5"));
        assert!(!session.liked().contains("item-1"));
        assert!(session.bookmarked().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let source = ScriptedSource::new();
            source.push_page(page(0..4, 10));
            let store = Arc::new(FileStore::open(dir.path()).unwrap());
            let mut session = FeedSession::open(source, store, EngineOptions::default()).await;
            session.initialize().await;
            session.toggle_like("item-3");
            session.flush().await;
        }

        let options = EngineOptions {
            offline: true,
            ..EngineOptions::default()
        };
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let session = FeedSession::open(ScriptedSource::new(), store, options).await;

        assert_eq!(
            session.initialize().await,
            StartupOutcome::CachedOffline { count: 4 }
        );
        let snapshot = session.snapshot();
        assert!(snapshot.items[3].liked);
        assert!(!snapshot.items[0].liked);
        assert!(snapshot.has_more);
        assert_eq!(session.engine().source().calls(), 0);
    }

    #[tokio::test]
    async fn test_offline_startup_without_cache() {
        let options = EngineOptions {
            offline: true,
            ..EngineOptions::default()
        };
        let session =
            FeedSession::open(ScriptedSource::new(), Arc::new(MemoryStore::new()), options).await;

        assert_eq!(session.initialize().await, StartupOutcome::NoCachedData);
        let snapshot = session.snapshot();
        assert!(snapshot.is_offline);
        assert!(snapshot.is_error_state());
        assert_eq!(snapshot.error, Some(ErrorKind::NoCachedData));

        assert_eq!(
            session.load_more().await,
            FetchOutcome::Skipped(SkipReason::Offline)
        );
    }

    #[tokio::test]
    async fn test_id_at_position() {
        let source = ScriptedSource::new();
        source.push_page(page(0..3, 3));
        let session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;

        assert_eq!(session.id_at(1).as_deref(), Some("item-0"));
        assert_eq!(session.id_at(3).as_deref(), Some("item-2"));
        assert!(session.id_at(0).is_none());
        assert!(session.id_at(4).is_none());
        assert!(session.contains("item-1"));
    }

    #[tokio::test]
    async fn test_view_ignores_search_term() {
        let source = ScriptedSource::new();
        source.push_page(page(0..3, 3));
        let mut session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;
        session.set_search_term("no such headline");
        session.toggle_bookmark("item-1");

        let view = session.view("item-1").unwrap();
        assert_eq!(view.item.title, "Item 1");
        assert_eq!(view.position, 2);
        assert!(view.bookmarked && !view.liked);
        assert!(session.view("item-9").is_none());
        assert!(session.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_flat_items() {
        let source = ScriptedSource::new();
        source.push_page(page(0..1, 1));
        let mut session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;
        session.toggle_like("item-0");

        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["items"][0]["id"], "item-0");
        assert_eq!(json["items"][0]["liked"], true);
        assert_eq!(json["items"][0]["position"], 1);
        assert_eq!(json["has_more"], false);
        assert!(json["error"].is_null());
    }

    #[tokio::test]
    async fn test_filtered_position_resolves_to_listed_item() {
        let source = ScriptedSource::new();
        source.push_page(Page::new(
            vec![
                Item::new("a", "Markets rally"),
                Item::new("b", "Climate crisis update"),
            ],
            2,
        ));
        let mut session = session_with(source, Arc::new(MemoryStore::new())).await;
        session.refresh().await;
        session.set_search_term("climate");

        let listed = &session.snapshot().items[0];
        assert_eq!(listed.item.id, "b");
        assert_eq!(
            session.id_at(listed.position).as_deref(),
            Some(listed.item.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_write_failures_stay_out_of_snapshot() {
        let source = ScriptedSource::new();
        source.push_page(page(0..2, 2));
        let mut session =
            FeedSession::open(source, Arc::new(FailingStore::new()), EngineOptions::default())
                .await;
        session.refresh().await;

        assert!(session.toggle_like("item-0"));
        session.flush().await;

        let snapshot = session.snapshot();
        assert!(snapshot.error.is_none());
        assert!(snapshot.items[0].liked);
    }

    #[tokio::test]
    async fn test_open_reads_annotations_from_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set(LIKED_KEY, br#"["item-1"]"#).unwrap();
            store.set(BOOKMARKED_KEY, b"not json").unwrap();
        }

        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let session =
            FeedSession::open(ScriptedSource::new(), store, EngineOptions::default()).await;

        assert!(session.liked().contains("item-1"));
        assert_eq!(session.liked().len(), 1);
        assert!(session.bookmarked().is_empty());
    }
}
