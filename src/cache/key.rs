//! Cache key derivation

use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::fetch::FetchOptions;

/// Derives the store key for a request
///
/// The key is the URL followed by a compact JSON object of the options that
/// identify the response: a fixed `"json": true` marker, the query parameters
/// and `maxAge` in milliseconds. Object keys serialize in sorted order, so the
/// order parameters were inserted in never changes the key.
///
/// The transform is not part of the key. Two requests that differ only in their
/// transform share one entry, and whichever transformed value was stored first
/// is what both get back. Use separate stores (or distinct URLs) when that is
/// not wanted.
pub fn cache_key(url: &str, options: &FetchOptions) -> Result<String, FetchError> {
    if url.is_empty() {
        return Err(FetchError::invalid_argument(
            "url",
            "non-empty string",
            "empty string",
        ));
    }

    let mut identity = Map::new();
    identity.insert("json".to_string(), Value::Bool(true));

    if let Some(query) = &options.query {
        identity.insert("query".to_string(), query.to_json());
    }

    if let Some(max_age) = options.max_age {
        let millis = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        identity.insert("maxAge".to_string(), Value::from(millis));
    }

    Ok(format!("{}{}", url, Value::Object(identity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Query, Transform};
    use std::time::Duration;

    const URL: &str = "http://foo.bar/cache-key";

    #[test]
    fn test_key_without_options() {
        let key = cache_key(URL, &FetchOptions::new()).unwrap();
        assert_eq!(key, r#"http://foo.bar/cache-key{"json":true}"#);
    }

    #[test]
    fn test_key_with_query_and_max_age() {
        let options = FetchOptions::new()
            .query(Query::new().param("unicorn", "rainbow"))
            .max_age(Duration::from_millis(5000));

        let key = cache_key(URL, &options).unwrap();

        assert_eq!(
            key,
            r#"http://foo.bar/cache-key{"json":true,"maxAge":5000,"query":{"unicorn":"rainbow"}}"#
        );
    }

    #[test]
    fn test_key_ignores_query_insertion_order() {
        let a = FetchOptions::new().query(Query::new().param("a", "1").param("b", true).param("c", 3));
        let b = FetchOptions::new().query(Query::new().param("c", 3).param("a", "1").param("b", true));

        assert_eq!(cache_key(URL, &a).unwrap(), cache_key(URL, &b).unwrap());
    }

    #[test]
    fn test_key_is_deterministic() {
        let options = FetchOptions::new()
            .query(Query::new().param("page", 2))
            .max_age(Duration::from_secs(60));

        let first = cache_key(URL, &options).unwrap();
        for _ in 0..10 {
            assert_eq!(cache_key(URL, &options).unwrap(), first);
        }
    }

    #[test]
    fn test_key_differs_by_query() {
        let a = FetchOptions::new().query(Query::new().param("unicorn", "rainbow"));
        let b = FetchOptions::new().query(Query::new().param("unicorn", "pegasus"));

        assert_ne!(cache_key(URL, &a).unwrap(), cache_key(URL, &b).unwrap());
    }

    #[test]
    fn test_key_keeps_query_value_types_apart() {
        let text = FetchOptions::new().query(Query::new().param("n", "1"));
        let number = FetchOptions::new().query(Query::new().param("n", 1));

        assert_ne!(cache_key(URL, &text).unwrap(), cache_key(URL, &number).unwrap());
    }

    #[test]
    fn test_key_differs_by_max_age() {
        let a = FetchOptions::new().max_age(Duration::from_millis(5000));
        let b = FetchOptions::new().max_age(Duration::from_millis(6000));

        assert_ne!(cache_key(URL, &a).unwrap(), cache_key(URL, &b).unwrap());
        assert_ne!(
            cache_key(URL, &a).unwrap(),
            cache_key(URL, &FetchOptions::new()).unwrap()
        );
    }

    #[test]
    fn test_key_ignores_transform() {
        let plain = FetchOptions::new().max_age(Duration::from_millis(5000));
        let transformed = plain.clone().transform(Transform::new(|_| Value::Null));

        assert_eq!(
            cache_key(URL, &plain).unwrap(),
            cache_key(URL, &transformed).unwrap()
        );
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let err = cache_key("", &FetchOptions::new()).unwrap_err();

        assert!(matches!(err, FetchError::InvalidArgument { .. }));
        assert_eq!(
            err.to_string(),
            "Expected `url` to be a `non-empty string`, got `empty string`"
        );
    }
}
