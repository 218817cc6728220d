//! Sync engine
//!
//! Orchestrates paging against a [`ContentSource`], merges batches into the
//! collection, writes the result through the store and decides between
//! live data and the cache.
//!
//! ## Cycle
//!
//! `Idle -> Fetching -> {merged | failed, fallback} -> Idle`
//!
//! Only one fetch may be outstanding. The in-flight flag is checked and set
//! inside a single `watch` update, so a second `refresh`/`load_more` issued
//! while one is running is dropped (not queued) with
//! [`SkipReason::InFlight`].
//!
//! ## Exhaustion
//!
//! The cursor is exhausted when a fetch brings no new items, or when the
//! upstream total is no larger than the number of items held *after* the
//! batch was merged.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{
    CachedFeed, CachedFeedRef, ErrorKind, Fallback, FetchOutcome, SkipReason, StartupOutcome,
    SyncPhase, SyncState,
};
use crate::models::{Collection, PageCursor};
use crate::source::{ContentSource, SourceError};
use crate::storage::{read_json, PersistentStore, WriteQueue, ARTICLES_KEY};

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Engine construction options
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Items requested per page
    pub page_size: u32,
    /// Initial connectivity assumption
    pub offline: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            offline: false,
        }
    }
}

/// Clears the in-flight flag if a fetch ends without reaching its merge step
struct FetchGuard<'a> {
    state: &'a watch::Sender<SyncState>,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.state
            .send_if_modified(|s| std::mem::replace(&mut s.is_fetching, false));
    }
}

/// Paged synchronization engine
pub struct SyncEngine<S> {
    source: S,
    store: Arc<dyn PersistentStore>,
    writer: WriteQueue,
    page_size: u32,
    state: watch::Sender<SyncState>,
}

impl<S: ContentSource> SyncEngine<S> {
    /// Create an engine with an empty collection
    pub fn new(
        source: S,
        store: Arc<dyn PersistentStore>,
        writer: WriteQueue,
        options: EngineOptions,
    ) -> Self {
        let state = SyncState {
            is_offline: options.offline,
            ..SyncState::default()
        };
        let (state, _) = watch::channel(state);

        Self {
            source,
            store,
            writer,
            page_size: options.page_size.max(1),
            state,
        }
    }

    /// The content source this engine pulls from
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Cloned copy of the current state
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.borrow().phase()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().collection.is_empty()
    }

    pub fn is_offline(&self) -> bool {
        self.state.borrow().is_offline
    }

    /// Record the device's connectivity
    ///
    /// Does not touch an outstanding fetch: its result is merged if it
    /// arrives, and later requests see the new flag.
    pub fn set_offline(&self, offline: bool) {
        let changed = self.state.send_if_modified(|s| {
            if s.is_offline == offline {
                return false;
            }
            s.is_offline = offline;
            true
        });
        if changed {
            debug!("Engine offline flag set to {}", offline);
        }
    }

    /// Load the cached collection and cursor without contacting the source
    ///
    /// Returns the number of items hydrated.
    pub async fn hydrate(&self) -> usize {
        let Some((collection, cursor)) = self.load_cached().await else {
            return 0;
        };

        let count = collection.len();
        info!("Hydrated {} cached item(s)", count);
        self.state.send_modify(|s| {
            s.collection = collection;
            s.cursor = cursor;
        });
        count
    }

    /// Hydrate from the cache, then refresh unless offline
    pub async fn initialize(&self) -> StartupOutcome {
        let cached_count = self.hydrate().await;

        if self.is_offline() {
            if cached_count > 0 {
                info!("Offline, serving cached items");
                return StartupOutcome::CachedOffline {
                    count: cached_count,
                };
            }
            warn!("Offline with no cached items");
            self.state
                .send_modify(|s| s.last_error = Some(ErrorKind::NoCachedData));
            return StartupOutcome::NoCachedData;
        }

        StartupOutcome::Fetched(self.refresh().await)
    }

    /// Fetch page 1 and replace the collection
    ///
    /// Rejected while offline; see [`force_refresh`](Self::force_refresh).
    pub async fn refresh(&self) -> FetchOutcome {
        self.run_refresh(false).await
    }

    /// Fetch page 1 and replace the collection, ignoring the offline flag
    pub async fn force_refresh(&self) -> FetchOutcome {
        self.run_refresh(true).await
    }

    async fn run_refresh(&self, force: bool) -> FetchOutcome {
        if let Err(reason) = self.begin("refresh", false, force) {
            return FetchOutcome::Skipped(reason);
        }
        let _guard = FetchGuard { state: &self.state };

        info!("Refreshing from page 1");
        let page = match self.source.fetch_page(1, self.page_size).await {
            Ok(page) => page,
            Err(e) => return self.fail(e).await,
        };

        let received = page.items.len();
        let total = page.total_results;
        let mut count = 0;
        let mut exhausted = true;

        self.state.send_modify(|s| {
            s.collection.replace(page.items);
            count = s.collection.len();
            exhausted = received == 0 || total_reached(total, count);
            s.cursor = PageCursor {
                next_page: 2,
                exhausted,
            };
            s.last_error = None;
            s.is_fetching = false;
        });

        info!(
            "Refresh complete: {} item(s), total={}, exhausted={}",
            count, total, exhausted
        );
        self.persist();

        FetchOutcome::Replaced { count, exhausted }
    }

    /// Fetch the next page and append its new items
    pub async fn load_more(&self) -> FetchOutcome {
        let page_number = match self.begin("load_more", true, false) {
            Ok(page_number) => page_number,
            Err(reason) => return FetchOutcome::Skipped(reason),
        };
        let _guard = FetchGuard { state: &self.state };

        debug!("Loading page {}", page_number);
        let page = match self.source.fetch_page(page_number, self.page_size).await {
            Ok(page) => page,
            Err(e) => return self.fail(e).await,
        };

        let total = page.total_results;
        let mut added = 0;
        let mut exhausted = true;

        self.state.send_modify(|s| {
            added = s.collection.append(page.items);
            if added == 0 {
                s.cursor.exhausted = true;
            } else {
                s.cursor.next_page = page_number + 1;
                s.cursor.exhausted = total_reached(total, s.collection.len());
            }
            exhausted = s.cursor.exhausted;
            s.last_error = None;
            s.is_fetching = false;
        });

        if added == 0 {
            info!("Page {} brought no new items, source exhausted", page_number);
        } else {
            debug!(
                "Appended {} item(s) from page {}, exhausted={}",
                added, page_number, exhausted
            );
        }
        self.persist();

        FetchOutcome::Appended { added, exhausted }
    }

    /// Atomically move from idle to fetching
    ///
    /// Returns the page `load_more` should request.
    fn begin(&self, op: &str, paging: bool, force: bool) -> Result<u32, SkipReason> {
        let mut verdict = Err(SkipReason::InFlight);

        self.state.send_if_modified(|s| {
            if s.is_fetching {
                verdict = Err(SkipReason::InFlight);
                return false;
            }
            if s.is_offline && !force {
                verdict = Err(SkipReason::Offline);
                let changed = s.last_error != Some(ErrorKind::Offline);
                s.last_error = Some(ErrorKind::Offline);
                return changed;
            }
            if paging && s.cursor.exhausted {
                verdict = Err(SkipReason::Exhausted);
                return false;
            }
            s.is_fetching = true;
            verdict = Ok(s.cursor.next_page);
            true
        });

        if let Err(reason) = verdict {
            debug!("Dropped {} request: {:?}", op, reason);
        }
        verdict
    }

    /// Record a failed fetch, falling back to the cache when nothing is shown
    async fn fail(&self, error: SourceError) -> FetchOutcome {
        warn!("Fetch failed: {}", error);

        let fallback = if self.is_empty() {
            match self.load_cached().await {
                Some((collection, cursor)) if !collection.is_empty() => {
                    let count = collection.len();
                    info!("Re-hydrated {} cached item(s) after failure", count);
                    self.state.send_modify(|s| {
                        s.collection = collection;
                        s.cursor = cursor;
                    });
                    Fallback::Rehydrated(count)
                }
                _ => Fallback::Empty,
            }
        } else {
            Fallback::Retained
        };

        self.state.send_modify(|s| {
            s.last_error = Some(ErrorKind::FetchFailed);
            s.is_fetching = false;
        });

        FetchOutcome::Failed(fallback)
    }

    /// Queue the current collection and cursor for persistence
    fn persist(&self) {
        let state = self.state.borrow();
        self.writer.submit_json(
            ARTICLES_KEY,
            &CachedFeedRef {
                items: &state.collection,
                cursor: state.cursor,
            },
        );
    }

    /// Read the cached collection, after any queued writes have landed
    async fn load_cached(&self) -> Option<(Collection, PageCursor)> {
        self.writer.flush().await;

        let store = Arc::clone(&self.store);
        let cached = tokio::task::spawn_blocking(move || {
            read_json::<CachedFeed>(store.as_ref(), ARTICLES_KEY)
        })
        .await;

        match cached {
            Ok(cached) => cached.map(|c| c.into_parts(self.page_size)),
            Err(e) => {
                warn!("Cache read task failed: {}", e);
                None
            }
        }
    }
}

fn total_reached(total: u64, held: usize) -> bool {
    total <= held as u64
}
