//! Watch command handler
//!
//! Keeps the feed on screen and lets the connectivity monitor drive it:
//! going offline is reported, coming back online with nothing shown
//! triggers a refresh. Runs until Ctrl-C.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use feedsync_core::{
    spawn_monitor, Connectivity, ConnectivityMonitor, ContentSource, FeedSession, MonitorEvent,
    TcpProbe,
};

use super::feed::{describe_fetch, report_startup};
use crate::output::{Output, OutputFormat};

pub async fn run<S: ContentSource + 'static>(
    session: &mut FeedSession<S>,
    probe: Option<TcpProbe>,
    search: Option<String>,
    output: &Output,
) -> Result<()> {
    if let Some(term) = search {
        session.set_search_term(term);
    }

    let outcome = session.initialize().await;
    report_startup(outcome, output);

    let initial = if session.snapshot().is_offline {
        Connectivity::Offline
    } else {
        Connectivity::Online
    };

    // Without a probe the sample channel closes at once and the monitor
    // stops; the view still follows engine state.
    let (sample_tx, sample_rx) = mpsc::channel(4);
    let probe_task = match probe {
        Some(probe) => {
            debug!("Watching reachability of {}", probe.addr());
            Some(probe.spawn(sample_tx))
        }
        None => {
            drop(sample_tx);
            None
        }
    };

    let mut monitor = spawn_monitor(
        session.engine().clone(),
        ConnectivityMonitor::new(initial),
        sample_rx,
    );
    let mut state_rx = session.engine().subscribe();

    render(session, output);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                render(session, output);
            }
            Some(event) = monitor.event_rx.recv() => match event {
                MonitorEvent::Transition(Connectivity::Online) => {
                    output.message("Back online.");
                }
                MonitorEvent::Transition(Connectivity::Offline) => {
                    output.warn("Connection lost, showing cached articles");
                }
                MonitorEvent::RefreshTriggered(outcome) => {
                    output.message(&describe_fetch(outcome));
                }
            },
        }
    }

    monitor.abort();
    if let Some(task) = probe_task {
        task.abort();
    }
    Ok(())
}

fn render<S: ContentSource>(session: &FeedSession<S>, output: &Output) {
    let snapshot = session.snapshot();
    if snapshot.is_loading {
        if output.format == OutputFormat::Human {
            println!("Loading...");
        }
        return;
    }
    if output.format == OutputFormat::Human {
        println!();
        println!("── {} ──", chrono::Local::now().format("%H:%M:%S"));
    }
    output.print_snapshot(&snapshot, session.search_term());
}
