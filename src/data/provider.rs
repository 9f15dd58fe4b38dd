//! The seam between the orchestrator and an upstream content provider

use async_trait::async_trait;
use thiserror::Error;

use super::payload::RawPage;

/// Errors that can occur when fetching from the provider
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider rejected the call because the quota is used up
    #[error("Content provider quota exhausted: {0}")]
    QuotaExhausted(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The provider answered with a non-success status that is not a quota signal
    #[error("Provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Failed to parse JSON response
    #[error("Failed to parse provider response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// No API key is configured for a provider that needs one
    #[error("No API key configured for the content provider")]
    MissingApiKey,
}

impl FetchError {
    /// Whether this failure should arm the quota breaker
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, FetchError::QuotaExhausted(_))
    }
}

/// One provider query
///
/// With a `channel_id` the query is scoped to that source; without a `query`
/// the provider returns the latest items by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub channel_id: Option<String>,
    pub page_token: Option<String>,
    pub page_size: usize,
}

impl SearchRequest {
    /// A general keyword query against the whole index
    pub fn keyword(query: &str, page_token: Option<&str>, page_size: usize) -> Self {
        Self {
            query: Some(query.to_string()),
            channel_id: None,
            page_token: page_token.map(str::to_string),
            page_size,
        }
    }

    /// A query scoped to one source, or its latest items when `query` is `None`
    pub fn in_source(
        channel_id: &str,
        query: Option<&str>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Self {
        Self {
            query: query.map(str::to_string),
            channel_id: Some(channel_id.to_string()),
            page_token: page_token.map(str::to_string),
            page_size,
        }
    }
}

/// A quota-metered source of paginated items
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Runs one search and returns the raw page the provider produced
    async fn search(&self, request: &SearchRequest) -> Result<RawPage, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_classification() {
        assert!(FetchError::QuotaExhausted("daily".to_string()).is_quota_exhausted());
        assert!(!FetchError::MissingApiKey.is_quota_exhausted());
        assert!(!FetchError::Status {
            status: 500,
            message: "oops".to_string()
        }
        .is_quota_exhausted());
    }

    #[test]
    fn test_request_constructors() {
        let keyword = SearchRequest::keyword("flu", Some("T1"), 10);
        assert_eq!(keyword.query.as_deref(), Some("flu"));
        assert!(keyword.channel_id.is_none());
        assert_eq!(keyword.page_token.as_deref(), Some("T1"));

        let latest = SearchRequest::in_source("UC1", None, None, 5);
        assert!(latest.query.is_none());
        assert_eq!(latest.channel_id.as_deref(), Some("UC1"));
        assert_eq!(latest.page_size, 5);
    }
}
