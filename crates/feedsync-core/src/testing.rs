//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::io;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::models::Item;
use crate::source::{ContentSource, Page, SourceError, SourceResult};
use crate::storage::{PersistentStore, StorageError, StorageResult};

/// Items `item-{i}` titled `Item {i}` for every `i` in `range`
pub fn items(range: Range<usize>) -> Vec<Item> {
    range
        .map(|i| {
            Item::new(format!("item-{}", i), format!("Item {}", i))
                .with_description(format!("Description of item {}", i))
                .with_source("Test Wire")
        })
        .collect()
}

pub fn page(range: Range<usize>, total: u64) -> Page {
    Page::new(items(range), total)
}

/// Content source answering from a queue of scripted responses
///
/// An exhausted script answers with an empty page. With a gate set, every
/// call waits for a `notify_one` before answering.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<SourceResult<Page>>>,
    requests: Mutex<Vec<(u32, u32)>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push_page(&self, page: Page) {
        self.responses.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(SourceError::Status(500)));
    }

    /// Number of fetches started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(page, page_size)` of every fetch, in call order
    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ContentSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> SourceResult<Page> {
        self.requests.lock().unwrap().push((page, page_size));
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Page::default()))
    }
}

/// Store whose writes always fail
#[derive(Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls seen
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl PersistentStore for FailingStore {
    fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn set(&self, key: &str, _bytes: &[u8]) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::DiskFull {
            path: PathBuf::from(format!("{}.json", key)),
            source: io::Error::new(io::ErrorKind::Other, "no space left on device"),
        })
    }
}
