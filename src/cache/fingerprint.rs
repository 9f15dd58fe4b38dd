//! Cache key construction
//!
//! A fingerprint identifies a logical request: the operation name plus its
//! parameter set. Parameters are canonicalized through an ordered map before
//! hashing, so the order in which a caller supplies them never matters.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::store::CACHE_PREFIX;

/// Builds the cache key for `operation` called with `params`
///
/// The key has the form `cache:<operation>:<sha256 hex>`. Later duplicates of a
/// parameter name replace earlier ones.
///
/// # Example
/// ```
/// use wellfeed::cache::fingerprint;
///
/// let a = fingerprint("fetch_content", [("query", "sleep"), ("page_size", "24")]);
/// let b = fingerprint("fetch_content", [("page_size", "24"), ("query", "sleep")]);
/// assert_eq!(a, b);
/// ```
pub fn fingerprint<I, K, V>(operation: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let canonical: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    // A JSON object of an ordered map is unambiguous even when values contain
    // separators such as '&' or '='.
    let encoded = serde_json::to_string(&canonical).unwrap_or_default();
    let digest = Sha256::digest(encoded.as_bytes());

    format!("{}{}:{}", CACHE_PREFIX, operation, hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = fingerprint("op", [("a", "1"), ("b", "2")]);
        let b = fingerprint("op", [("b", "2"), ("a", "1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let params = vec![("query".to_string(), "flu symptoms".to_string())];
        assert_eq!(fingerprint("op", params.clone()), fingerprint("op", params));
    }

    #[test]
    fn test_fingerprint_differs_by_operation_and_values() {
        let base = fingerprint("fetch_content", [("query", "sleep")]);
        assert_ne!(base, fingerprint("fetch_from_trusted_sources", [("query", "sleep")]));
        assert_ne!(base, fingerprint("fetch_content", [("query", "sleeping")]));
        assert_ne!(base, fingerprint("fetch_content", [("q", "sleep")]));
    }

    #[test]
    fn test_fingerprint_separators_do_not_collide() {
        let a = fingerprint("op", [("a", "1&b=2")]);
        let b = fingerprint("op", [("a", "1"), ("b", "2")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_shape() {
        let key = fingerprint("fetch_content", [("query", "x")]);
        assert!(key.starts_with("cache:fetch_content:"));
        assert_eq!(key.len(), "cache:fetch_content:".len() + 64);
    }
}
