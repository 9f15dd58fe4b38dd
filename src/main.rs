//! wellfeed - browse health videos from trusted sources
//!
//! A command-line front end over the content orchestrator. Results come from
//! the provider when quota allows, from the on-disk cache otherwise, and from a
//! curated list when nothing else is available.

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wellfeed::cache::{DiskStore, KeyValueStore, MemoryStore};
use wellfeed::cli::{Cli, Command};
use wellfeed::clock::SystemClock;
use wellfeed::config::Config;
use wellfeed::data::{sort_items, ContentResult, SortOrder, YouTubeClient};
use wellfeed::orchestrator::Orchestrator;

/// Installs the stderr log subscriber, honouring `RUST_LOG`
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wellfeed=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Picks the persistent store, falling back to memory when no cache dir exists
fn open_store(cli: &Cli) -> (Arc<dyn KeyValueStore>, Option<String>) {
    let disk = match &cli.cache_dir {
        Some(dir) => Some(DiskStore::with_dir(dir.clone())),
        None => DiskStore::new(),
    };
    match disk {
        Some(store) => {
            let location = store.dir().display().to_string();
            (Arc::new(store), Some(location))
        }
        None => {
            warn!("no cache directory available, state will not persist");
            (Arc::new(MemoryStore::new()), None)
        }
    }
}

/// Prints a result as JSON or as a numbered list
fn print_result(
    mut result: ContentResult,
    sort: SortOrder,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    sort_items(&mut result.items, sort);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.quota_exceeded {
        println!("Provider quota exceeded, live fetching is paused.");
    }
    if result.origin.is_degraded() {
        println!("Offline: showing {} content.", result.origin.label());
    }
    if let Some(error) = &result.error {
        println!("Could not fetch content: {error}");
    }
    if result.items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (n, item) in result.items.iter().enumerate() {
        println!("{:>3}. {}", n + 1, item.title);
        println!(
            "     {} | {} | {} views | {}",
            source_label(&item.source_label),
            item.published_at.format("%Y-%m-%d"),
            item.popularity_score,
            item.id
        );
    }
    println!();
    println!("({} items, {})", result.items.len(), result.origin.label());
    if let Some(token) = &result.next_page_token {
        println!("Next page: --page-token {token}");
    }
    Ok(())
}

fn source_label(label: &str) -> &str {
    if label.is_empty() {
        "unknown source"
    } else {
        label
    }
}

fn print_status(
    orchestrator: &Orchestrator,
    location: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let breaker = orchestrator.breaker();
    let exceeded_at = breaker.exceeded_at().filter(|_| breaker.is_open());
    let quota_remaining = breaker.remaining().map(|d| d.num_seconds());
    let refresh_after = orchestrator.governor().retry_after().map(|d| d.num_seconds());
    let cached = orchestrator.cache().len();

    if json {
        let status = serde_json::json!({
            "quota_exceeded": orchestrator.is_quota_exceeded(),
            "quota_exceeded_at": exceeded_at,
            "quota_retry_after_secs": quota_remaining,
            "can_refresh": orchestrator.can_refresh_now(),
            "refresh_retry_after_secs": refresh_after,
            "cached_entries": cached,
            "cache_dir": location,
            "trusted_sources": orchestrator.trusted_sources(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match (exceeded_at, quota_remaining) {
        (Some(at), Some(secs)) => println!(
            "Quota:          exceeded at {}, live fetching resumes in {}",
            at.format("%Y-%m-%d %H:%M UTC"),
            format_secs(secs)
        ),
        _ => println!("Quota:          ok"),
    }
    match refresh_after {
        Some(secs) => println!("Manual refresh: available in {}", format_secs(secs)),
        None => println!("Manual refresh: available"),
    }
    println!("Cached pages:   {cached}");
    println!("Cache dir:      {}", location.unwrap_or("(memory only)"));
    println!("Trusted:        {} sources", orchestrator.trusted_sources().len());
    Ok(())
}

fn format_secs(secs: i64) -> String {
    let secs = secs.max(0);
    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(cli.config.as_deref())?;
    let (store, location) = open_store(&cli);

    let mut client =
        YouTubeClient::new(config.api_key.clone()).with_base_url(config.api_base_url.clone());
    if !config.fetch_view_counts {
        client = client.without_statistics();
    }
    let orchestrator = Orchestrator::new(Arc::new(client), store, Arc::new(SystemClock), &config);

    match cli.command {
        Command::Search { query, page, sort } => {
            let result = orchestrator
                .fetch_content(&query, page.page_token.as_deref(), page.page_size)
                .await;
            print_result(result, sort, cli.json)
        }
        Command::Trusted { sources, page, sort } => {
            let sources = if sources.is_empty() {
                orchestrator.trusted_sources().to_vec()
            } else {
                sources
            };
            if sources.is_empty() {
                return Err(
                    "No trusted sources configured; pass --source or add them to the config".into(),
                );
            }
            let result = orchestrator
                .fetch_from_trusted_sources(&sources, page.page_token.as_deref(), page.page_size)
                .await;
            print_result(result, sort, cli.json)
        }
        Command::Refresh { page_size } => {
            let result = orchestrator.refresh_trusted_sources(page_size).await?;
            print_result(result, SortOrder::Newest, cli.json)
        }
        Command::Status => print_status(&orchestrator, location.as_deref(), cli.json),
        Command::Clear => {
            orchestrator.clear_storage()?;
            if !cli.json {
                println!("Cleared cached content and quota state.");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
