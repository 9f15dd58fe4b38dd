//! Core content models for wellfeed
//!
//! This module holds the normalized shapes handed to consumers, plus the
//! provider seam and the pipeline that turns provider payloads into them.

pub mod normalize;
pub mod payload;
pub mod provider;
pub mod youtube;

pub use normalize::{dedup_by_id, normalize_item, normalize_page, sort_items};
pub use payload::{RawId, RawItem, RawPage};
pub use provider::{ContentProvider, FetchError, SearchRequest};
pub use youtube::YouTubeClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single piece of content, normalized across provider payload shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Provider-unique identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Short description, possibly empty
    pub description: String,
    /// Thumbnail image URL, empty if the provider had none
    pub thumbnail_url: String,
    /// Name of the originating channel or feed
    pub source_label: String,
    /// When the provider published the item
    pub published_at: DateTime<Utc>,
    /// View count, 0 when unknown
    pub popularity_score: u64,
}

/// A page of items plus the provider's pagination cursors
///
/// This is the unit stored in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub next_page_token: Option<String>,
    pub prev_page_token: Option<String>,
}

/// Where the items in a `ContentResult` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// Fetched from the provider during this call
    Live,
    /// Served from a valid cache entry for the same request
    Cache,
    /// Aggregated from every valid cache entry by the fallback resolver
    CachedAggregate,
    /// The built-in curated list
    Curated,
    /// Nothing could be produced
    Empty,
}

impl ResultOrigin {
    /// Whether the UI should show an offline/cached indicator
    pub fn is_degraded(&self) -> bool {
        matches!(self, ResultOrigin::CachedAggregate | ResultOrigin::Curated)
    }

    /// Returns a short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ResultOrigin::Live => "live",
            ResultOrigin::Cache => "cached",
            ResultOrigin::CachedAggregate => "offline (cached history)",
            ResultOrigin::Curated => "offline (curated)",
            ResultOrigin::Empty => "empty",
        }
    }
}

/// Outcome of a fetch, always renderable
///
/// Failures are reported through `quota_exceeded` and `error` rather than as
/// `Err`, so callers can always show something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResult {
    pub items: Vec<ContentItem>,
    pub next_page_token: Option<String>,
    pub prev_page_token: Option<String>,
    /// Set when the provider quota is exhausted and fallback content is shown
    pub quota_exceeded: bool,
    /// Soft error message when every acquisition tier failed
    pub error: Option<String>,
    pub origin: ResultOrigin,
}

impl ContentResult {
    /// Wraps a page with the given origin
    pub fn from_page(page: ContentPage, origin: ResultOrigin) -> Self {
        Self {
            items: page.items,
            next_page_token: page.next_page_token,
            prev_page_token: page.prev_page_token,
            quota_exceeded: false,
            error: None,
            origin,
        }
    }

    /// An empty result, optionally carrying a soft error
    pub fn empty(error: Option<String>) -> Self {
        Self {
            items: Vec::new(),
            next_page_token: None,
            prev_page_token: None,
            quota_exceeded: false,
            error,
            origin: ResultOrigin::Empty,
        }
    }
}

/// Presentation orderings for a result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently published first
    #[default]
    Newest,
    /// Highest view count first
    MostPopular,
    /// Lowest view count first
    LeastPopular,
}

impl SortOrder {
    /// Parses a sort order from a string (case-insensitive)
    ///
    /// Supports aliases: "newest"/"recent"/"date", "popular"/"most-popular"/"views",
    /// "least-popular"/"unpopular"
    pub fn parse(s: &str) -> Option<SortOrder> {
        match s.to_lowercase().trim() {
            "newest" | "recent" | "date" => Some(SortOrder::Newest),
            "popular" | "most-popular" | "views" => Some(SortOrder::MostPopular),
            "least-popular" | "unpopular" => Some(SortOrder::LeastPopular),
            _ => None,
        }
    }
}
