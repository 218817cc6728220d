//! Connectivity monitoring
//!
//! Turns a stream of raw reachability samples into `Online`/`Offline`
//! transitions. Repeated identical samples produce no transition.
//!
//! The monitor task keeps the engine's offline flag current and, when the
//! device comes back online with nothing to show, triggers exactly one
//! refresh per transition.
//!
//! [`TcpProbe`] is the platform signal used by the CLI: it periodically
//! tries to open a TCP connection to the content host.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::engine::SyncEngine;
use super::state::FetchOutcome;
use crate::source::ContentSource;

/// Network reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

/// Events emitted by the monitor task
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Connectivity changed
    Transition(Connectivity),
    /// A refresh was run because the device came online with an empty collection
    RefreshTriggered(FetchOutcome),
}

/// Two-state connectivity tracker
pub struct ConnectivityMonitor {
    state: watch::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Current connectivity
    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Subscribe to connectivity changes
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    /// Feed a reachability sample
    ///
    /// Returns the new state only if it differs from the previous one.
    pub fn observe(&self, reachable: bool) -> Option<Connectivity> {
        let next = Connectivity::from_reachable(reachable);
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        changed.then_some(next)
    }
}

/// Handle to a running monitor task
pub struct MonitorHandle {
    /// Transition and refresh events
    pub event_rx: mpsc::UnboundedReceiver<MonitorEvent>,
    /// Watch connectivity
    pub status_rx: watch::Receiver<Connectivity>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the monitor task
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn the monitor task
///
/// Consumes reachability samples until the sample channel closes.
pub fn spawn_monitor<S>(
    engine: Arc<SyncEngine<S>>,
    monitor: ConnectivityMonitor,
    samples: mpsc::Receiver<bool>,
) -> MonitorHandle
where
    S: ContentSource + 'static,
{
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let status_rx = monitor.subscribe();

    engine.set_offline(!monitor.current().is_online());
    let task = tokio::spawn(monitor_loop(engine, monitor, samples, event_tx));

    MonitorHandle {
        event_rx,
        status_rx,
        task,
    }
}

async fn monitor_loop<S: ContentSource>(
    engine: Arc<SyncEngine<S>>,
    monitor: ConnectivityMonitor,
    mut samples: mpsc::Receiver<bool>,
    event_tx: mpsc::UnboundedSender<MonitorEvent>,
) {
    while let Some(reachable) = samples.recv().await {
        let Some(next) = monitor.observe(reachable) else {
            continue;
        };

        info!("Connectivity changed: {:?}", next);
        engine.set_offline(!next.is_online());
        let _ = event_tx.send(MonitorEvent::Transition(next));

        if next.is_online() && engine.is_empty() {
            let outcome = engine.refresh().await;
            let _ = event_tx.send(MonitorEvent::RefreshTriggered(outcome));
        }
    }
    debug!("Reachability samples closed, monitor stopping");
}

/// Reachability probe based on TCP connects
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    interval: Duration,
    timeout: Duration,
}

impl TcpProbe {
    /// Probe `addr` (`host:port`) every `interval`
    pub fn new(addr: impl Into<String>, interval: Duration) -> Self {
        Self {
            addr: addr.into(),
            interval,
            timeout: Duration::from_secs(3).min(interval.max(Duration::from_millis(100))),
        }
    }

    /// Probe the host serving `url`
    pub fn for_url(url: &str, interval: Duration) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(format!("{}:{}", host, port), interval))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Try one connection
    pub async fn is_reachable(&self) -> bool {
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await,
            Ok(Ok(_))
        )
    }

    /// Spawn a task that samples reachability until `tx` is closed
    pub fn spawn(self, tx: mpsc::Sender<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let reachable = self.is_reachable().await;
                debug!("Probe {} reachable={}", self.addr, reachable);
                if tx.send(reachable).await.is_err() {
                    break;
                }
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}
