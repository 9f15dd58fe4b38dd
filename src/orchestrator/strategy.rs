//! Acquisition strategies
//!
//! The orchestrator walks an ordered list of strategies. Each one either finds
//! a page, says "nothing here, try the next tier", or fails. Changing the order
//! or adding a tier means changing the list, not the orchestrator.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::data::{normalize_page, ContentPage, ContentProvider, FetchError, SearchRequest};

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub query: String,
    pub page_token: Option<String>,
    pub page_size: usize,
}

/// Result of one strategy
#[derive(Debug)]
pub enum Attempt {
    /// A normalized page with at least one item; stop here
    Found(ContentPage),
    /// Nothing found; move on to the next strategy
    Continue,
}

/// One tier of the acquisition chain
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Tries to satisfy `query` from `provider`
    ///
    /// Quota exhaustion must be returned as an error immediately so the caller
    /// can arm the breaker; other errors mean this tier failed.
    async fn attempt(
        &self,
        provider: &dyn ContentProvider,
        query: &ContentQuery,
    ) -> Result<Attempt, FetchError>;
}

/// Searches trusted sources one at a time, in priority order
///
/// Stops at the first source with at least one item left after
/// normalization. A failing source is
/// skipped; if no source produced anything, the last failure is returned.
#[derive(Debug, Clone)]
pub struct TrustedSourceStrategy {
    source_ids: Vec<String>,
}

impl TrustedSourceStrategy {
    pub fn new(source_ids: Vec<String>) -> Self {
        Self { source_ids }
    }
}

#[async_trait]
impl FetchStrategy for TrustedSourceStrategy {
    fn name(&self) -> &'static str {
        "trusted_sources"
    }

    async fn attempt(
        &self,
        provider: &dyn ContentProvider,
        query: &ContentQuery,
    ) -> Result<Attempt, FetchError> {
        let mut last_error = None;

        for source_id in &self.source_ids {
            let request = SearchRequest::in_source(
                source_id,
                Some(&query.query),
                query.page_token.as_deref(),
                query.page_size,
            );

            match provider.search(&request).await.map(normalize_page) {
                Ok(page) if !page.items.is_empty() => {
                    info!(
                        source = %source_id,
                        items = page.items.len(),
                        "trusted source matched"
                    );
                    return Ok(Attempt::Found(page));
                }
                Ok(_) => debug!(source = %source_id, "trusted source had no usable items"),
                Err(e) if e.is_quota_exhausted() => return Err(e),
                Err(e) => {
                    warn!(source = %source_id, error = %e, "trusted source failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Attempt::Continue),
        }
    }
}

/// A general keyword query across the whole provider index
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStrategy;

#[async_trait]
impl FetchStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn attempt(
        &self,
        provider: &dyn ContentProvider,
        query: &ContentQuery,
    ) -> Result<Attempt, FetchError> {
        let request =
            SearchRequest::keyword(&query.query, query.page_token.as_deref(), query.page_size);
        let page = normalize_page(provider.search(&request).await?);

        if page.items.is_empty() {
            Ok(Attempt::Continue)
        } else {
            Ok(Attempt::Found(page))
        }
    }
}

/// Trusted sources first, then keyword search
pub fn default_strategies(trusted_source_ids: Vec<String>) -> Vec<Box<dyn FetchStrategy>> {
    vec![
        Box::new(TrustedSourceStrategy::new(trusted_source_ids)),
        Box::new(KeywordStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawPage;
    use serde_json::json;

    /// Serves id-less items from channels and one real item from keyword search
    struct SparseProvider;

    #[async_trait]
    impl ContentProvider for SparseProvider {
        async fn search(&self, request: &SearchRequest) -> Result<RawPage, FetchError> {
            let page = match request.channel_id {
                Some(_) => json!({"items": [{"snippet": {"title": "no id"}}, {"id": ""}]}),
                None => json!({"items": [{"id": "kw-1"}, {"id": "kw-1"}]}),
            };
            Ok(serde_json::from_value(page)?)
        }
    }

    fn query() -> ContentQuery {
        ContentQuery {
            query: "fever".to_string(),
            page_token: None,
            page_size: 10,
        }
    }

    #[tokio::test]
    async fn test_trusted_sources_without_usable_items_continue() {
        let strategy = TrustedSourceStrategy::new(vec!["a".to_string(), "b".to_string()]);
        let attempt = strategy.attempt(&SparseProvider, &query()).await.unwrap();
        assert!(matches!(attempt, Attempt::Continue));
    }

    #[tokio::test]
    async fn test_keyword_page_is_normalized() {
        let attempt = KeywordStrategy.attempt(&SparseProvider, &query()).await;
        match attempt.unwrap() {
            Attempt::Found(page) => {
                let ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
                assert_eq!(ids, vec!["kw-1"]);
            }
            Attempt::Continue => panic!("Expected a page from keyword search"),
        }
    }
}
