//! Command-line interface parsing for wellfeed
//!
//! This module handles parsing of CLI arguments using clap: global options for
//! config and cache location, and one subcommand per orchestrator operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::SortOrder;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified sort order is not recognized
    #[error("Invalid sort order: '{0}'. Valid orders: newest, popular, least-popular")]
    InvalidSort(String),
}

/// wellfeed - health videos from trusted sources, with caching and offline fallback
#[derive(Parser, Debug)]
#[command(name = "wellfeed")]
#[command(about = "Quota-aware health video feed with caching and offline fallback")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to config.toml in the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for cached pages and quota state
    #[arg(long, global = true, value_name = "DIR", env = "WELLFEED_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search trusted sources first, then the whole provider
    Search {
        /// Keywords to look for
        query: String,

        #[command(flatten)]
        page: PageArgs,

        /// Result ordering: newest, popular, least-popular
        #[arg(long, value_parser = parse_sort_arg, default_value = "newest")]
        sort: SortOrder,
    },

    /// Latest items from trusted sources
    Trusted {
        /// Source id to include; repeat for several (defaults to the configured list)
        #[arg(long = "source", value_name = "ID")]
        sources: Vec<String>,

        #[command(flatten)]
        page: PageArgs,

        /// Result ordering: newest, popular, least-popular
        #[arg(long, value_parser = parse_sort_arg, default_value = "newest")]
        sort: SortOrder,
    },

    /// Refetch the configured trusted sources, skipping the cache
    Refresh {
        /// Items per page
        #[arg(long, value_name = "N")]
        page_size: Option<usize>,
    },

    /// Show quota, refresh and cache state
    Status,

    /// Delete all cached pages and quota/refresh state
    Clear,
}

/// Pagination options shared by listing commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Continuation token from a previous result
    #[arg(long, value_name = "TOKEN")]
    pub page_token: Option<String>,

    /// Items per page
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,
}

/// Parses a sort order string argument into a SortOrder.
///
/// # Arguments
/// * `s` - The sort string from CLI
///
/// # Returns
/// * `Ok(SortOrder)` if the string matches a known order or alias
/// * `Err(CliError::InvalidSort)` if the string doesn't match
pub fn parse_sort_arg(s: &str) -> Result<SortOrder, CliError> {
    SortOrder::parse(s).ok_or_else(|| CliError::InvalidSort(s.to_string()))
}
