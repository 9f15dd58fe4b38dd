//! Fetch orchestration
//!
//! Every request goes through the same gates before the network: the quota
//! breaker, then the cache. Live results are normalized, deduplicated and
//! written through to the cache. Quota exhaustion arms the breaker and answers
//! with fallback content; other failures fall through to the next tier and only
//! surface as a soft `error` when nothing worked.

mod strategy;

pub use strategy::{
    default_strategies, Attempt, ContentQuery, FetchStrategy, KeywordStrategy,
    TrustedSourceStrategy,
};

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::breaker::QuotaBreaker;
use crate::cache::{fingerprint, CacheManager, KeyValueStore, StorageError};
use crate::clock::Clock;
use crate::config::Config;
use crate::data::{
    dedup_by_id, normalize_page, ContentItem, ContentPage, ContentProvider, ContentResult,
    FetchError, ResultOrigin, SearchRequest,
};
use crate::fallback::FallbackResolver;
use crate::refresh::RefreshGovernor;

const FETCH_CONTENT_OP: &str = "fetch_content";
const TRUSTED_SOURCES_OP: &str = "fetch_from_trusted_sources";

/// A manual refresh asked for inside the cooldown window
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Refresh is cooling down, try again in {retry_after_secs}s")]
pub struct RefreshRejected {
    /// Whole seconds until a refresh is allowed, rounded up
    pub retry_after_secs: i64,
}

/// Entry point for consumers that need content
pub struct Orchestrator {
    provider: Arc<dyn ContentProvider>,
    store: Arc<dyn KeyValueStore>,
    cache: CacheManager,
    breaker: QuotaBreaker,
    governor: RefreshGovernor,
    fallback: FallbackResolver,
    strategies: Vec<Box<dyn FetchStrategy>>,
    trusted_sources: Vec<String>,
    default_page_size: usize,
    early_termination_multiplier: f64,
}

impl Orchestrator {
    /// Wires the cache, breaker, governor and fallback over one store
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let cache = CacheManager::new(store.clone(), clock.clone(), config.cache_ttl());
        let breaker = QuotaBreaker::new(store.clone(), clock.clone(), config.quota_block());
        let governor = RefreshGovernor::new(store.clone(), clock, config.refresh_cooldown());
        let fallback = FallbackResolver::new(cache.clone(), config.fallback_page_size);
        let trusted_sources = config.trusted_source_ids();

        Self {
            provider,
            store,
            cache,
            breaker,
            governor,
            fallback,
            strategies: default_strategies(trusted_sources.clone()),
            trusted_sources,
            default_page_size: config.page_size.max(1),
            early_termination_multiplier: config.early_termination_multiplier,
        }
    }

    /// Replaces the acquisition chain used by `fetch_content`
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn breaker(&self) -> &QuotaBreaker {
        &self.breaker
    }

    pub fn governor(&self) -> &RefreshGovernor {
        &self.governor
    }

    /// Configured trusted source ids, in priority order
    pub fn trusted_sources(&self) -> &[String] {
        &self.trusted_sources
    }

    /// Fetches items matching `query`
    ///
    /// Order: breaker, cache, then each strategy in turn. Never fails; see
    /// `ContentResult::quota_exceeded` and `ContentResult::error`.
    pub async fn fetch_content(
        &self,
        query: &str,
        page_token: Option<&str>,
        page_size: Option<usize>,
    ) -> ContentResult {
        let page_size = self.page_size(page_size);

        if self.breaker.is_open() {
            debug!(query, "quota breaker open, serving fallback");
            return self.quota_fallback();
        }

        let key = fingerprint(
            FETCH_CONTENT_OP,
            [
                ("query", query.to_string()),
                ("page_token", page_token.unwrap_or_default().to_string()),
                ("page_size", page_size.to_string()),
            ],
        );
        if let Some(page) = self.cache.get(&key) {
            return ContentResult::from_page(page, ResultOrigin::Cache);
        }

        let request = ContentQuery {
            query: query.to_string(),
            page_token: page_token.map(str::to_string),
            page_size,
        };

        let mut last_error: Option<FetchError> = None;
        for strategy in &self.strategies {
            match strategy.attempt(self.provider.as_ref(), &request).await {
                Ok(Attempt::Found(page)) if !page.items.is_empty() => {
                    info!(
                        strategy = strategy.name(),
                        items = page.items.len(),
                        "live fetch succeeded"
                    );
                    self.cache.put(&key, &page);
                    return ContentResult::from_page(page, ResultOrigin::Live);
                }
                Ok(_) => {
                    debug!(strategy = strategy.name(), "no results, trying next strategy");
                }
                Err(e) if e.is_quota_exhausted() => {
                    self.breaker.record_quota_exceeded();
                    return self.quota_fallback();
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "strategy failed");
                    last_error = Some(e);
                }
            }
        }

        ContentResult::empty(last_error.map(|e| e.to_string()))
    }

    /// Gathers the latest items from several sources (cache warming)
    ///
    /// Sources are queried one after another until the raw item count passes
    /// `page_size × early_termination_multiplier`; the merged list is then
    /// deduplicated and cut to `page_size`.
    pub async fn fetch_from_trusted_sources(
        &self,
        source_ids: &[String],
        page_token: Option<&str>,
        page_size: Option<usize>,
    ) -> ContentResult {
        let page_size = self.page_size(page_size);

        if self.breaker.is_open() {
            debug!("quota breaker open, serving fallback");
            return self.quota_fallback();
        }

        let key = Self::trusted_key(source_ids, page_token, page_size);
        if let Some(page) = self.cache.get(&key) {
            return ContentResult::from_page(page, ResultOrigin::Cache);
        }

        self.gather_from_sources(source_ids, page_token, page_size, &key)
            .await
    }

    /// Manual refresh of the configured trusted sources
    ///
    /// Rejected inside the refresh cooldown. Otherwise skips the cache lookup
    /// (the breaker still applies) and writes fresh results through.
    pub async fn refresh_trusted_sources(
        &self,
        page_size: Option<usize>,
    ) -> Result<ContentResult, RefreshRejected> {
        if let Some(wait) = self.governor.retry_after() {
            let millis = wait.num_milliseconds().max(0);
            return Err(RefreshRejected {
                retry_after_secs: (millis + 999) / 1000,
            });
        }
        self.governor.record_refresh();

        let page_size = self.page_size(page_size);
        if self.breaker.is_open() {
            return Ok(self.quota_fallback());
        }

        let key = Self::trusted_key(&self.trusted_sources, None, page_size);
        Ok(self
            .gather_from_sources(&self.trusted_sources, None, page_size, &key)
            .await)
    }

    /// Whether live fetching is suspended (for UI banners)
    pub fn is_quota_exceeded(&self) -> bool {
        self.breaker.is_open()
    }

    /// Whether a manual refresh would be accepted now
    pub fn can_refresh_now(&self) -> bool {
        self.governor.can_refresh()
    }

    pub fn record_user_refresh(&self) {
        self.governor.record_refresh();
    }

    /// Wipes cached pages, quota state and refresh state together
    pub fn clear_storage(&self) -> Result<(), StorageError> {
        self.store.clear()
    }

    async fn gather_from_sources(
        &self,
        source_ids: &[String],
        page_token: Option<&str>,
        page_size: usize,
        key: &str,
    ) -> ContentResult {
        let threshold = self.early_termination_threshold(page_size);
        let mut gathered: Vec<ContentItem> = Vec::new();
        let mut raw_count = 0usize;
        let mut next_page_token = None;
        let mut prev_page_token = None;
        let mut last_error: Option<FetchError> = None;

        for (index, source_id) in source_ids.iter().enumerate() {
            if raw_count > threshold {
                debug!(
                    gathered = raw_count,
                    skipped = source_ids.len() - index,
                    "enough items gathered, skipping remaining sources"
                );
                break;
            }

            let request = SearchRequest::in_source(source_id, None, page_token, page_size);
            match self.provider.search(&request).await {
                Ok(raw) => {
                    raw_count += raw.items.len();
                    let page = normalize_page(raw);
                    debug!(source = %source_id, items = page.items.len(), "source fetched");
                    if next_page_token.is_none() {
                        next_page_token = page.next_page_token;
                    }
                    if prev_page_token.is_none() {
                        prev_page_token = page.prev_page_token;
                    }
                    gathered.extend(page.items);
                }
                Err(e) if e.is_quota_exhausted() => {
                    self.breaker.record_quota_exceeded();
                    if gathered.is_empty() {
                        return self.quota_fallback();
                    }
                    let mut items = dedup_by_id(gathered);
                    items.truncate(page_size);
                    let page = ContentPage {
                        items,
                        next_page_token,
                        prev_page_token,
                    };
                    return ContentResult {
                        quota_exceeded: true,
                        ..ContentResult::from_page(page, ResultOrigin::Live)
                    };
                }
                Err(e) => {
                    warn!(source = %source_id, error = %e, "source failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        let mut items = dedup_by_id(gathered);
        items.truncate(page_size);
        if items.is_empty() {
            return ContentResult::empty(last_error.map(|e| e.to_string()));
        }

        let page = ContentPage {
            items,
            next_page_token,
            prev_page_token,
        };
        if last_error.is_none() {
            self.cache.put(key, &page);
        } else {
            debug!("some sources failed, not caching partial result");
        }
        info!(items = page.items.len(), "trusted source fetch succeeded");
        ContentResult::from_page(page, ResultOrigin::Live)
    }

    fn quota_fallback(&self) -> ContentResult {
        let resolved = self.fallback.resolve();
        ContentResult {
            items: resolved.items,
            next_page_token: None,
            prev_page_token: None,
            quota_exceeded: true,
            error: None,
            origin: resolved.origin,
        }
    }

    fn page_size(&self, requested: Option<usize>) -> usize {
        requested.filter(|n| *n > 0).unwrap_or(self.default_page_size)
    }

    fn early_termination_threshold(&self, page_size: usize) -> usize {
        (page_size as f64 * self.early_termination_multiplier.max(1.0)).ceil() as usize
    }

    fn trusted_key(source_ids: &[String], page_token: Option<&str>, page_size: usize) -> String {
        fingerprint(
            TRUSTED_SOURCES_OP,
            [
                ("sources", serde_json::to_string(source_ids).unwrap_or_default()),
                ("page_token", page_token.unwrap_or_default().to_string()),
                ("page_size", page_size.to_string()),
            ],
        )
    }
}
