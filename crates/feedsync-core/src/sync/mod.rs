//! Content synchronization
//!
//! Pages through a content source, merges results into a locally cached
//! collection and degrades to that cache when the network is unavailable.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = SyncEngine::new(source, store, writer, EngineOptions::default());
//! engine.initialize().await;
//! engine.load_more().await;
//! ```

mod connectivity;
mod engine;
mod state;

pub use connectivity::{
    spawn_monitor, Connectivity, ConnectivityMonitor, MonitorEvent, MonitorHandle, TcpProbe,
};
pub use engine::{EngineOptions, SyncEngine, DEFAULT_PAGE_SIZE};
pub use state::{
    ErrorKind, Fallback, FetchOutcome, SkipReason, StartupOutcome, SyncPhase, SyncState,
};
