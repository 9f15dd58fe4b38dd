//! YouTube Data API v3 client
//!
//! Runs `search` calls for keyword and channel-scoped queries and enriches the
//! results with view counts from a follow-up `videos?part=statistics` call.
//! Failure bodies are classified so quota exhaustion can be told apart from
//! ordinary errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::payload::{RawPage, Statistics};
use super::provider::{ContentProvider, FetchError, SearchRequest};

/// Base URL for the YouTube Data API
pub const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest `maxResults` the API accepts
const MAX_RESULTS_PER_CALL: usize = 50;

/// Error reasons (lowercased) that mean the quota is used up
const QUOTA_MARKERS: [&str; 4] = [
    "quotaexceeded",
    "ratelimitexceeded",
    "dailylimitexceeded",
    "quota",
];

/// Client for the YouTube Data API
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    /// Whether to spend a `videos` call on view counts after each search
    fetch_statistics: bool,
}

impl YouTubeClient {
    /// Creates a client against the public API
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: YOUTUBE_BASE_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            fetch_statistics: true,
        }
    }

    /// Points the client at a different API root (a proxy or a test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Skips the view-count enrichment call; popularity is then always 0
    pub fn without_statistics(mut self) -> Self {
        self.fetch_statistics = false;
        self
    }

    fn api_key(&self) -> Result<&str, FetchError> {
        self.api_key.as_deref().ok_or(FetchError::MissingApiKey)
    }

    /// Query parameters for a `search` call
    fn search_params(&self, request: &SearchRequest, key: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("type", "video".to_string()),
            (
                "maxResults",
                request.page_size.clamp(1, MAX_RESULTS_PER_CALL).to_string(),
            ),
        ];

        match &request.query {
            Some(query) => params.push(("q", query.clone())),
            None => params.push(("order", "date".to_string())),
        }
        if let Some(channel_id) = &request.channel_id {
            params.push(("channelId", channel_id.clone()));
        }
        if let Some(token) = &request.page_token {
            params.push(("pageToken", token.clone()));
        }
        params.push(("key", key.to_string()));
        params
    }

    async fn get_page(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawPage, FetchError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);

        let response = self.http_client.get(&url).query(params).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn fetch_view_counts(&self, ids: &[String], key: &str) -> Result<RawPage, FetchError> {
        let params = vec![
            ("part", "statistics".to_string()),
            ("id", ids.join(",")),
            ("maxResults", ids.len().clamp(1, MAX_RESULTS_PER_CALL).to_string()),
            ("key", key.to_string()),
        ];
        self.get_page("videos", &params).await
    }
}

#[async_trait]
impl ContentProvider for YouTubeClient {
    async fn search(&self, request: &SearchRequest) -> Result<RawPage, FetchError> {
        let key = self.api_key()?;
        let mut page = self.get_page("search", &self.search_params(request, key)).await?;
        debug!(
            items = page.items.len(),
            channel = request.channel_id.as_deref().unwrap_or("-"),
            "provider search returned"
        );

        if !self.fetch_statistics {
            return Ok(page);
        }

        let ids: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.item_id())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Ok(page);
        }

        match self.fetch_view_counts(&ids, key).await {
            Ok(stats) => merge_statistics(&mut page, stats),
            Err(e) if e.is_quota_exhausted() => return Err(e),
            Err(e) => warn!(error = %e, "view counts unavailable, keeping items without them"),
        }
        Ok(page)
    }
}

/// Attaches `statistics` from a `videos` response to matching search items
fn merge_statistics(page: &mut RawPage, stats: RawPage) {
    let mut by_id: HashMap<String, Statistics> = stats
        .items
        .into_iter()
        .filter_map(|item| {
            let id = item.item_id()?.to_string();
            Some((id, item.statistics?))
        })
        .collect();

    for item in &mut page.items {
        if let Some(id) = item.item_id().map(str::to_string) {
            if let Some(statistics) = by_id.remove(&id) {
                item.statistics = Some(statistics);
            }
        }
    }
}

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

/// Maps a failed response to a `FetchError`
///
/// A rate-limit status (403 or 429) counts as quota exhaustion only when the
/// body also mentions a quota reason; a bare 403 is usually a bad key.
pub fn classify_failure(status: u16, body: &str) -> FetchError {
    let message = error_message(body);

    let rate_limited = status == 403 || status == 429;
    let lowered = body.to_lowercase();
    let mentions_quota = QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker));

    if rate_limited && mentions_quota {
        FetchError::QuotaExhausted(message)
    } else {
        FetchError::Status { status, message }
    }
}

/// Pulls a readable message out of an error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope.error.errors.iter().find_map(|e| e.reason.clone());
            match (envelope.error.message, reason) {
                (Some(message), Some(reason)) => format!("{message} ({reason})"),
                (Some(message), None) => message,
                (None, Some(reason)) => reason,
                (None, None) => "unknown error".to_string(),
            }
        }
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        }
    }
}
