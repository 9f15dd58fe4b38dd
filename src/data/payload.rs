//! Raw provider payload shapes
//!
//! These mirror the JSON returned by a YouTube Data API v3 style provider.
//! Every field is optional; the normalizer decides what a missing value means.
//! Search results carry `id` as an object, video resources as a plain string.

use serde::{Deserialize, Serialize};

/// One page of provider results (`search` and `videos` list responses)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    #[serde(default)]
    pub items: Vec<RawItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub prev_page_token: Option<String>,
}

/// A single result as the provider sends it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
    #[serde(default)]
    pub statistics: Option<Statistics>,
}

impl RawItem {
    /// The identifier this item normalizes to, if any
    pub fn item_id(&self) -> Option<&str> {
        match self.id.as_ref()? {
            RawId::Plain(id) => Some(id.as_str()).filter(|id| !id.is_empty()),
            RawId::Resource(resource) => resource
                .video_id
                .as_deref()
                .or(resource.playlist_id.as_deref())
                .or(resource.channel_id.as_deref())
                .filter(|id| !id.is_empty()),
        }
    }
}

/// The two shapes an item id comes in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// `videos` resources: `"id": "abc123"`
    Plain(String),
    /// `search` results: `"id": {"kind": "youtube#video", "videoId": "abc123"}`
    Resource(ResourceId),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub view_count: Option<Count>,
}

/// Counters arrive as decimal strings from YouTube, as numbers elsewhere
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(u64),
    Text(String),
}

impl Count {
    /// The numeric value, if it parses
    pub fn value(&self) -> Option<u64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
        }
    }
}
