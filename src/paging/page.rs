//! One fetched page and the decoders that produce it.

use crate::error::{QueryError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Turns a successful response body into a page.
///
/// Supplied per entity type by the model layer; [`json_decoder`] covers the
/// service's usual envelope shape.
pub type PageDecoder<T> = Arc<dyn Fn(&str) -> Result<PagedResult<T>> + Send + Sync>;

/// Snapshot of one page as the service reported it.
///
/// `offset + count <= total` usually holds but is not guaranteed: the total
/// is whatever the service counted at the moment this page was served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResult<T> {
    items: Vec<T>,
    offset: u32,
    total: u32,
}

impl<T> PagedResult<T> {
    /// Assemble a page.
    pub fn new(items: Vec<T>, offset: u32, total: u32) -> Self {
        PagedResult { items, offset, total }
    }

    /// A page with no items.
    pub fn empty(offset: u32, total: u32) -> Self {
        Self::new(Vec::new(), offset, total)
    }

    /// The items, in service order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take ownership of the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Offset of the first item in the full result set.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of items actually in this page.
    pub fn count(&self) -> u32 {
        self.items.len() as u32
    }

    /// Size of the full result set when this page was served.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Whether this page reaches the reported end of the result set.
    pub fn is_last(&self) -> bool {
        self.offset.saturating_add(self.count()) >= self.total
    }

    /// Convert the items, keeping offset and total.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            offset: self.offset,
            total: self.total,
        }
    }
}

impl<T> IntoIterator for PagedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Decode a JSON page envelope.
///
/// The envelope is an object holding the items under `items_key`, the total
/// under `count_key` and the echoed offset under `offset_key`:
///
/// ```
/// use entity_graph_client::paging::PagedResult;
///
/// let body = r#"{"release-count": 3, "release-offset": 1, "releases": ["b", "c"]}"#;
/// let page: PagedResult<String> =
///     PagedResult::from_json(body, "releases", "release-count", "release-offset").unwrap();
/// assert_eq!(page.count(), 2);
/// assert_eq!(page.total(), 3);
/// assert!(page.is_last());
/// ```
impl<T: DeserializeOwned> PagedResult<T> {
    /// Decode `body`; any shape mismatch is a [`QueryError::Decode`].
    pub fn from_json(body: &str, items_key: &str, count_key: &str, offset_key: &str) -> Result<Self> {
        let mut envelope: Value =
            serde_json::from_str(body).map_err(|e| QueryError::decode("page envelope", e))?;
        let object = envelope
            .as_object_mut()
            .ok_or_else(|| QueryError::decode("page envelope", "expected a json object"))?;

        let total = read_u32(object.get(count_key), count_key)?;
        let offset = read_u32(object.get(offset_key), offset_key)?;
        let items = match object.remove(items_key) {
            Some(items @ Value::Array(_)) => serde_json::from_value::<Vec<T>>(items)
                .map_err(|e| QueryError::decode("page items", e))?,
            Some(_) => {
                return Err(QueryError::decode(
                    "page envelope",
                    format!("'{}' is not an array", items_key),
                ))
            }
            None => {
                return Err(QueryError::decode(
                    "page envelope",
                    format!("missing '{}'", items_key),
                ))
            }
        };

        Ok(PagedResult::new(items, offset, total))
    }
}

fn read_u32(value: Option<&Value>, key: &str) -> Result<u32> {
    let value = value.ok_or_else(|| QueryError::decode("page envelope", format!("missing '{}'", key)))?;
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| QueryError::decode("page envelope", format!("'{}' is not a non-negative integer", key)))
}

/// A [`PageDecoder`] for envelopes readable by [`PagedResult::from_json`].
pub fn json_decoder<T>(items_key: &str, count_key: &str, offset_key: &str) -> PageDecoder<T>
where
    T: DeserializeOwned + 'static,
{
    let items_key = items_key.to_string();
    let count_key = count_key.to_string();
    let offset_key = offset_key.to_string();
    Arc::new(move |body: &str| PagedResult::from_json(body, &items_key, &count_key, &offset_key))
}

/// Decoder for browse envelopes, which name their fields after the entity:
/// `<entity>s`, `<entity>-count`, `<entity>-offset`.
pub fn browse_decoder<T>(entity: &str) -> PageDecoder<T>
where
    T: DeserializeOwned + 'static,
{
    json_decoder(
        &format!("{}s", entity),
        &format!("{}-count", entity),
        &format!("{}-offset", entity),
    )
}

/// Decoder for search envelopes: items under `items_key`, `count`, `offset`.
pub fn search_decoder<T>(items_key: &str) -> PageDecoder<T>
where
    T: DeserializeOwned + 'static,
{
    json_decoder(items_key, "count", "offset")
}
