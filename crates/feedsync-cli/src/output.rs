//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use feedsync_core::{ErrorKind, ItemView, Snapshot};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - ids only
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the item listing of a snapshot
    pub fn print_snapshot(&self, snapshot: &Snapshot, search: &str) {
        match self.format {
            OutputFormat::Human => {
                if let Some(error) = snapshot.error {
                    print_banner(error);
                }
                if snapshot.items.is_empty() {
                    if !snapshot.is_error_state() {
                        if search.trim().is_empty() {
                            println!("No articles.");
                        } else {
                            println!("No articles match '{}'.", search);
                        }
                    }
                    return;
                }
                for view in &snapshot.items {
                    println!("{}", format_row(view));
                }
                println!();
                if search.trim().is_empty() {
                    println!("{} article(s)", snapshot.total_held);
                } else {
                    println!(
                        "{} of {} article(s) match '{}'",
                        snapshot.items.len(),
                        snapshot.total_held,
                        search
                    );
                }
                if snapshot.has_more {
                    println!("More available: feedsync more");
                }
            }
            OutputFormat::Json => print_json(snapshot),
            OutputFormat::Quiet => {
                for view in &snapshot.items {
                    println!("{}", view.item.id);
                }
            }
        }
    }

    /// Print a single item in detail
    pub fn print_item(&self, view: &ItemView) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", view.item.id);
                println!("Title:       {}", view.item.title);
                println!("Source:      {}", view.item.source_name);
                println!("Description: {}", view.item.description);
                if let Some(published) = view.item.published_at {
                    println!("Published:   {}", published.format("%Y-%m-%d %H:%M"));
                }
                println!("Liked:       {}", yes_no(view.liked));
                println!("Bookmarked:  {}", yes_no(view.bookmarked));
            }
            OutputFormat::Json => print_json(view),
            OutputFormat::Quiet => println!("{}", view.item.id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", msg);
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_banner(error: ErrorKind) {
    println!("! {}", error);
    println!();
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// One listing line: position, flags, title, source
fn format_row(view: &ItemView) -> String {
    let flags = format!(
        "{}{}",
        if view.liked { '♥' } else { ' ' },
        if view.bookmarked { '★' } else { ' ' }
    );
    format!(
        "{:>3} {} {} | {}",
        view.position,
        flags,
        truncate(&view.item.title, 60),
        truncate(&view.item.source_name, 20)
    )
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
