//! Status command handler

use anyhow::Result;

use feedsync_core::{Config, ContentSource, FeedSession};

use crate::output::{Output, OutputFormat};

/// Show sync and storage status from the local cache
pub async fn show<S: ContentSource>(
    session: &FeedSession<S>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let cached = session.hydrate().await;
    let state = session.engine().state();
    let cursor = state.cursor();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "offline": state.is_offline(),
                    "source_url": config.source_url,
                    "page_size": session.engine().page_size(),
                    "store_dir": config.store_dir(),
                    "cache": {
                        "articles": cached,
                        "next_page": cursor.next_page,
                        "exhausted": cursor.exhausted,
                    },
                    "annotations": {
                        "liked": session.liked().len(),
                        "bookmarked": session.bookmarked().len(),
                    },
                    "last_error": state.last_error(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", cached);
        }
        OutputFormat::Human => {
            println!("feedsync Status");
            println!("===============");
            println!();
            println!("Source:");
            println!("  URL:       {}", config.source_url);
            println!(
                "  Network:   {}",
                if state.is_offline() {
                    "offline"
                } else {
                    "online"
                }
            );
            println!("  Page size: {}", session.engine().page_size());
            println!(
                "  API key:   {}",
                if config.api_key.is_some() {
                    "set"
                } else {
                    "(not set)"
                }
            );
            println!();
            println!("Cache:");
            println!("  Location:  {}", config.store_dir().display());
            println!("  Articles:  {}", cached);
            if cursor.exhausted {
                println!("  Paging:    complete");
            } else {
                println!("  Paging:    next page {}", cursor.next_page);
            }
            println!();
            println!("Annotations:");
            println!("  Liked:      {}", session.liked().len());
            println!("  Bookmarked: {}", session.bookmarked().len());
        }
    }

    Ok(())
}
