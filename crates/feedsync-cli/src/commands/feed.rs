//! Feed command handlers (list, refresh, more)

use anyhow::{bail, Result};
use tracing::debug;

use feedsync_core::sync::{Fallback, SkipReason};
use feedsync_core::{ContentSource, FeedSession, FetchOutcome, StartupOutcome};

use crate::output::Output;

/// Load the feed the way the app starts, then print it
pub async fn list<S: ContentSource>(
    session: &mut FeedSession<S>,
    search: Option<String>,
    output: &Output,
) -> Result<()> {
    let outcome = session.initialize().await;
    debug!("Startup outcome: {:?}", outcome);
    report_startup(outcome, output);

    if let Some(term) = search {
        session.set_search_term(term);
    }
    output.print_snapshot(&session.snapshot(), session.search_term());
    Ok(())
}

/// Replace the local feed with the first page
///
/// With `force` the request is sent even if the probe reported the host
/// unreachable.
pub async fn refresh<S: ContentSource>(
    session: &FeedSession<S>,
    force: bool,
    output: &Output,
) -> Result<()> {
    // Cached items stay visible if the fetch fails
    session.hydrate().await;

    let outcome = if force {
        session.force_refresh().await
    } else {
        session.refresh().await
    };
    match outcome {
        FetchOutcome::Replaced { .. } => output.success(&describe_fetch(outcome)),
        FetchOutcome::Skipped(SkipReason::Offline) => {
            bail!("Offline; run `feedsync list` to see cached articles")
        }
        _ => bail!("{}", describe_fetch(outcome)),
    }
    Ok(())
}

/// Append up to `pages` further pages
pub async fn more<S: ContentSource>(
    session: &FeedSession<S>,
    pages: u32,
    output: &Output,
) -> Result<()> {
    session.hydrate().await;

    let mut added_total = 0;
    for _ in 0..pages.max(1) {
        let outcome = session.load_more().await;
        match outcome {
            FetchOutcome::Appended { added, exhausted } => {
                added_total += added;
                if exhausted {
                    break;
                }
            }
            FetchOutcome::Skipped(SkipReason::Exhausted) => break,
            _ => bail!("{}", describe_fetch(outcome)),
        }
    }

    let snapshot = session.snapshot();
    output.success(&format!(
        "Loaded {} new article(s), {} held",
        added_total, snapshot.total_held
    ));
    if !snapshot.has_more {
        output.message("No more articles to load.");
    }
    Ok(())
}

/// Warn about anything other than a clean startup fetch
pub(crate) fn report_startup(outcome: StartupOutcome, output: &Output) {
    match outcome {
        StartupOutcome::Fetched(fetch) if !fetch.is_success() => {
            output.warn(&describe_fetch(fetch))
        }
        StartupOutcome::CachedOffline { count } => {
            output.warn(&format!("Offline, showing {} cached article(s)", count))
        }
        _ => {}
    }
}

/// Human description of a fetch outcome
pub(crate) fn describe_fetch(outcome: FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Replaced { count, exhausted } => {
            let suffix = if exhausted { " (no more pages)" } else { "" };
            format!("Fetched {} article(s){}", count, suffix)
        }
        FetchOutcome::Appended { added: 0, .. } => "No new articles".to_string(),
        FetchOutcome::Appended { added, .. } => format!("Loaded {} more article(s)", added),
        FetchOutcome::Failed(Fallback::Retained) => {
            "Fetch failed, keeping the articles already shown".to_string()
        }
        FetchOutcome::Failed(Fallback::Rehydrated(count)) => {
            format!("Fetch failed, showing {} cached article(s)", count)
        }
        FetchOutcome::Failed(Fallback::Empty) => {
            "Fetch failed and no cached articles are available".to_string()
        }
        FetchOutcome::Skipped(SkipReason::InFlight) => "A fetch is already running".to_string(),
        FetchOutcome::Skipped(SkipReason::Offline) => "Offline, request not sent".to_string(),
        FetchOutcome::Skipped(SkipReason::Exhausted) => "No more articles to load".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_fetch() {
        assert_eq!(
            describe_fetch(FetchOutcome::Replaced {
                count: 4,
                exhausted: true
            }),
            "Fetched 4 article(s) (no more pages)"
        );
        assert_eq!(
            describe_fetch(FetchOutcome::Appended {
                added: 0,
                exhausted: true
            }),
            "No new articles"
        );
        assert_eq!(
            describe_fetch(FetchOutcome::Failed(Fallback::Rehydrated(12))),
            "Fetch failed, showing 12 cached article(s)"
        );
    }
}
