//! Normalization, deduplication and ranking
//!
//! Provider payloads become `ContentItem`s here. Missing optional fields fall
//! back to fixed defaults instead of rejecting the item:
//! - title, description, source label: empty string
//! - thumbnail: best of `high`, `medium`, `default`, else empty string
//! - published date: Unix epoch when missing or unparsable
//! - popularity: 0 when the view count is missing or unparsable
//!
//! Only items without any usable id are dropped.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::payload::{RawItem, RawPage, Snippet};
use super::{ContentItem, ContentPage, SortOrder};

/// Converts one provider item, or `None` if it has no id
pub fn normalize_item(raw: &RawItem) -> Option<ContentItem> {
    let id = raw.item_id()?.to_string();
    let empty = Snippet::default();
    let snippet = raw.snippet.as_ref().unwrap_or(&empty);

    let thumbnail_url = snippet
        .thumbnails
        .as_ref()
        .and_then(|t| {
            [&t.high, &t.medium, &t.default]
                .into_iter()
                .flatten()
                .find_map(|thumb| thumb.url.clone().filter(|url| !url.is_empty()))
        })
        .unwrap_or_default();

    let published_at = snippet
        .published_at
        .as_deref()
        .and_then(parse_published_at)
        .unwrap_or_default();

    let popularity_score = raw
        .statistics
        .as_ref()
        .and_then(|s| s.view_count.as_ref())
        .and_then(|c| c.value())
        .unwrap_or(0);

    Some(ContentItem {
        id,
        title: decode_text(snippet.title.as_deref()),
        description: decode_text(snippet.description.as_deref()),
        thumbnail_url,
        source_label: decode_text(snippet.channel_title.as_deref()),
        published_at,
        popularity_score,
    })
}

/// Converts a provider page, dropping id-less items and duplicates
pub fn normalize_page(raw: RawPage) -> ContentPage {
    let items = raw.items.iter().filter_map(normalize_item).collect();
    ContentPage {
        items: dedup_by_id(items),
        next_page_token: raw.next_page_token,
        prev_page_token: raw.prev_page_token,
    }
}

/// Removes repeated ids, keeping the first occurrence and the original order
pub fn dedup_by_id(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Sorts items for display. The sort is stable, so ties keep fetch order.
pub fn sort_items(items: &mut [ContentItem], order: SortOrder) {
    match order {
        SortOrder::Newest => items.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortOrder::MostPopular => {
            items.sort_by(|a, b| b.popularity_score.cmp(&a.popularity_score))
        }
        SortOrder::LeastPopular => {
            items.sort_by(|a, b| a.popularity_score.cmp(&b.popularity_score))
        }
    }
}

fn parse_published_at(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decodes HTML entities (`&#39;`, `&amp;`) that the provider leaves in text
fn decode_text(value: Option<&str>) -> String {
    value
        .map(|s| html_escape::decode_html_entities(s.trim()).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, title: &str) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            source_label: String::new(),
            published_at: DateTime::<Utc>::default(),
            popularity_score: 0,
        }
    }

    fn dated(id: &str, y: i32, m: u32, d: u32) -> ContentItem {
        ContentItem {
            published_at: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            ..item(id, id)
        }
    }

    fn viewed(id: &str, views: u64) -> ContentItem {
        ContentItem {
            popularity_score: views,
            ..item(id, id)
        }
    }

    const SEARCH_ITEM: &str = r#"{
        "kind": "youtube#searchResult",
        "id": {"kind": "youtube#video", "videoId": "abc123"},
        "snippet": {
            "publishedAt": "2024-03-01T15:30:00Z",
            "channelId": "UC_test",
            "title": "Why sleep matters &amp; how to get more",
            "description": "A doctor&#39;s guide",
            "thumbnails": {
                "default": {"url": "https://img.example/default.jpg"},
                "medium": {"url": "https://img.example/medium.jpg"},
                "high": {"url": "https://img.example/high.jpg"}
            },
            "channelTitle": "Health Channel"
        },
        "statistics": {"viewCount": "98765"}
    }"#;

    #[test]
    fn test_normalize_full_search_item() {
        let raw: RawItem = serde_json::from_str(SEARCH_ITEM).unwrap();
        let item = normalize_item(&raw).expect("Item with id should normalize");

        assert_eq!(item.id, "abc123");
        assert_eq!(item.title, "Why sleep matters & how to get more");
        assert_eq!(item.description, "A doctor's guide");
        assert_eq!(item.thumbnail_url, "https://img.example/high.jpg");
        assert_eq!(item.source_label, "Health Channel");
        assert_eq!(item.published_at, Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap());
        assert_eq!(item.popularity_score, 98765);
    }

    #[test]
    fn test_normalize_applies_defaults_for_missing_fields() {
        let raw: RawItem = serde_json::from_str(r#"{"id": "bare"}"#).unwrap();
        let item = normalize_item(&raw).unwrap();

        assert_eq!(item.id, "bare");
        assert_eq!(item.title, "");
        assert_eq!(item.thumbnail_url, "");
        assert_eq!(item.source_label, "");
        assert_eq!(item.published_at, DateTime::<Utc>::default());
        assert_eq!(item.popularity_score, 0);
    }

    #[test]
    fn test_normalize_thumbnail_falls_back_to_smaller_sizes() {
        let raw: RawItem = serde_json::from_str(
            r#"{"id": "t", "snippet": {"thumbnails": {
                "default": {"url": "d.jpg"},
                "high": {"url": ""}
            }}}"#,
        )
        .unwrap();
        assert_eq!(normalize_item(&raw).unwrap().thumbnail_url, "d.jpg");
    }

    #[test]
    fn test_normalize_bad_date_and_views_default() {
        let raw: RawItem = serde_json::from_str(
            r#"{
                "id": "x",
                "snippet": {"publishedAt": "last tuesday"},
                "statistics": {"viewCount": "n/a"}
            }"#,
        )
        .unwrap();
        let item = normalize_item(&raw).unwrap();
        assert_eq!(item.published_at, DateTime::<Utc>::default());
        assert_eq!(item.popularity_score, 0);
    }

    #[test]
    fn test_normalize_page_drops_idless_items_and_duplicates() {
        let page: RawPage = serde_json::from_str(
            r#"{
                "nextPageToken": "N1",
                "items": [
                    {"id": {"videoId": "a"}, "snippet": {"title": "first"}},
                    {"snippet": {"title": "no id"}},
                    {"id": "a", "snippet": {"title": "dup"}},
                    {"id": "b"}
                ]
            }"#,
        )
        .unwrap();

        let normalized = normalize_page(page);

        let ids: Vec<&str> = normalized.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(normalized.items[0].title, "first");
        assert_eq!(normalized.next_page_token.as_deref(), Some("N1"));
    }

    #[test]
    fn test_dedup_first_seen_wins_across_sources() {
        let first = vec![item("1", "X"), item("2", "Y")];
        let second = vec![item("2", "Y-dup"), item("3", "Z")];

        let merged = dedup_by_id(first.into_iter().chain(second).collect());

        assert_eq!(merged.len(), 3);
        let two = merged.iter().find(|i| i.id == "2").unwrap();
        assert_eq!(two.title, "Y");
    }

    #[test]
    fn test_sort_newest_first() {
        let mut items = vec![
            dated("jan", 2024, 1, 1),
            dated("mar", 2024, 3, 1),
            dated("feb", 2024, 2, 1),
        ];

        sort_items(&mut items, SortOrder::Newest);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["mar", "feb", "jan"]);
    }

    #[test]
    fn test_sort_by_popularity_both_directions() {
        let mut items = vec![viewed("mid", 50), viewed("low", 1), viewed("high", 900)];

        sort_items(&mut items, SortOrder::MostPopular);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);

        sort_items(&mut items, SortOrder::LeastPopular);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["low", "mid", "high"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut items = vec![viewed("a", 5), viewed("b", 5), viewed("c", 10)];
        sort_items(&mut items, SortOrder::MostPopular);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
