//! feedsync Core Library
//!
//! This crate provides the core functionality for feedsync, an
//! offline-tolerant client that pages a remote headline feed into a local,
//! deduplicated collection and keeps per-item user annotations.
//!
//! # Architecture
//!
//! - **SyncEngine**: paging, merge, exhaustion and cache fallback
//! - **PersistentStore**: durable key/value blobs behind an ordered write queue
//! - **ConnectivityMonitor**: online/offline transitions driving refresh
//!
//! The in-memory collection is the source of truth while running; the store
//! only hydrates it at startup or after a failed fetch.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(FileStore::open(config.store_dir())?);
//! let source = NewsApiSource::from_config(&config)?;
//!
//! let mut session = FeedSession::open(source, store, EngineOptions::default()).await;
//! session.initialize().await;
//! session.load_more().await;
//! session.toggle_like("https://example.com/story");
//! let snapshot = session.snapshot();
//! ```
//!
//! # Modules
//!
//! - `session`: Renderer-facing facade (main entry point)
//! - `models`: Items, the collection and the paging cursor
//! - `sync`: Sync engine and connectivity monitoring
//! - `source`: Content source trait and the HTTP implementation
//! - `storage`: Key/value persistence and the write queue
//! - `annotations`: Liked and bookmarked id sets
//! - `query`: Search projection
//! - `config`: Application configuration

pub mod annotations;
pub mod config;
pub mod models;
pub mod query;
pub mod session;
pub mod source;
pub mod storage;
pub mod sync;

#[cfg(test)]
mod testing;

pub use annotations::{AnnotationKind, AnnotationSet};
pub use config::Config;
pub use models::{Collection, Item, PageCursor};
pub use query::{filter_indexed, filter_items, QueryView};
pub use session::{FeedSession, ItemView, Snapshot};
pub use source::{ContentSource, NewsApiSource, Page, SourceError};
pub use storage::{FileStore, MemoryStore, PersistentStore, StorageError, WriteQueue};
pub use sync::{
    spawn_monitor, Connectivity, ConnectivityMonitor, EngineOptions, ErrorKind, FetchOutcome,
    MonitorEvent, StartupOutcome, SyncEngine, SyncState, TcpProbe,
};
