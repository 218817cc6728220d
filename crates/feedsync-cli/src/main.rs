//! feedsync CLI
//!
//! Command-line interface for feedsync - offline-tolerant headline reader.

use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedsync_core::{
    AnnotationKind, Config, EngineOptions, FeedSession, FileStore, NewsApiSource, TcpProbe,
};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "feedsync - Offline-tolerant headline reader")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - ids only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Assume no network; serve cached articles only
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List articles (refreshes first when online)
    #[command(alias = "ls")]
    List {
        /// Only show articles whose title or description contains this
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Fetch the first page again, replacing the local feed
    Refresh,
    /// Load further pages
    More {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },
    /// Toggle the liked flag on an article
    Like {
        /// Article id or its position in `list`
        target: String,
    },
    /// Toggle the bookmarked flag on an article
    Bookmark {
        /// Article id or its position in `list`
        target: String,
    },
    /// Show sync and storage status
    Status,
    /// Live view following connectivity changes (Ctrl-C to quit)
    Watch {
        /// Only show articles whose title or description contains this
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, source_url, api_key, page_size,
        /// request_timeout_secs, probe_interval_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store or the network
    let command = match cli.command {
        Some(Commands::Config { command }) => return handle_config_command(command, &output),
        Some(command) => command,
        None => Commands::List { search: None },
    };

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    let store = FileStore::open(config.store_dir()).context("Failed to open local store")?;
    let source = NewsApiSource::from_config(&config).context("Invalid source configuration")?;
    let offline = detect_offline(&config, cli.offline).await;
    if offline && !cli.offline {
        output.warn("Source host unreachable, working offline");
    }

    let options = EngineOptions {
        page_size: config.page_size,
        offline,
    };
    let mut session = FeedSession::open(source, Arc::new(store), options).await;

    let result = match command {
        Commands::List { search } => commands::feed::list(&mut session, search, &output).await,
        Commands::Refresh => commands::feed::refresh(&session, !cli.offline, &output).await,
        Commands::More { pages } => commands::feed::more(&session, pages, &output).await,
        Commands::Like { target } => {
            commands::annotate::toggle(&mut session, AnnotationKind::Liked, &target, &output).await
        }
        Commands::Bookmark { target } => {
            commands::annotate::toggle(&mut session, AnnotationKind::Bookmarked, &target, &output)
                .await
        }
        Commands::Status => commands::status::show(&session, &config, &output).await,
        Commands::Watch { search } => {
            let probe = if cli.offline {
                None
            } else {
                probe_for(&config)
            };
            commands::watch::run(&mut session, probe, search, &output).await
        }
        Commands::Config { .. } => Ok(()),
    };

    // Queued writes must land before the process exits
    session.flush().await;

    result
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

fn probe_for(config: &Config) -> Option<TcpProbe> {
    TcpProbe::for_url(
        &config.source_url,
        Duration::from_secs(config.probe_interval_secs.max(1)),
    )
}

/// One reachability sample decides the starting connectivity
async fn detect_offline(config: &Config, forced: bool) -> bool {
    if forced {
        return true;
    }
    match probe_for(config) {
        Some(probe) => !probe.is_reachable().await,
        None => false,
    }
}

/// Initialize logging
///
/// Only initializes if FEEDSYNC_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("FEEDSYNC_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "feedsync_core={},feedsync={}",
        log_level, log_level
    ));

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
