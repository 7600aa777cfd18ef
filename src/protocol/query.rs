//! Request URL construction.
//!
//! A paged request is `<base><path>?<filter params>&limit=<n>&offset=<m>`.
//! The filter params are fixed for the lifetime of a fetcher; only `limit`
//! and `offset` change between pages.

use super::{LIMIT_PARAM, OFFSET_PARAM};
use crate::error::Result;
use url::Url;

/// Ordered query parameters forming a request's fixed filter suffix.
///
/// # Examples
///
/// ```
/// use entity_graph_client::protocol::QueryParams;
///
/// let params = QueryParams::new()
///     .with("artist", "5b11f4ce-a62d-471e-81fc-a69a8278c7da")
///     .with_list("inc", ["labels", "recordings"]);
/// assert_eq!(params.get("inc"), Some("labels+recordings"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single `key=value` pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Append a list joined with `+`, the service's separator for `inc` and `type`.
    ///
    /// Empty lists add nothing.
    pub fn with_list<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join("+");
        if joined.is_empty() {
            self
        } else {
            self.with(key, joined)
        }
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over the pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A copy of these parameters followed by `limit` and `offset`.
    pub fn with_page(&self, offset: u32, limit: u32) -> Self {
        self.clone()
            .with(LIMIT_PARAM, limit.to_string())
            .with(OFFSET_PARAM, offset.to_string())
    }

    /// Append these pairs to `url`'s query string.
    pub fn apply(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (key, value) in &self.pairs {
            query.append_pair(key, value);
        }
    }
}

/// Resolve `path` against `base` and append `params`.
pub fn resource_url(base: &Url, path: &str, params: &QueryParams) -> Result<Url> {
    // A leading slash would replace the base path (`/ws/2/`) instead of extending it.
    let mut url = base.join(path.trim_start_matches('/'))?;
    params.apply(&mut url);
    Ok(url)
}
