//! Offset pagination over the service's bounded pages.
//!
//! The service never returns more than 100 items per request. Each response
//! carries the page's items, the total size of the result set and the offset
//! of the first item. This module builds three levels on top of that:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PageFetcher`] | One request, one [`PagedResult`] (a *browse*) |
//! | [`PageCursor`] | Repeated fetches with offset bookkeeping |
//! | [`StreamingSequence`] | A flat, lazy sequence over every page |
//!
//! # Consistency
//!
//! Pagination is by offset against live data. Items added or removed while a
//! walk is in progress shift later pages, so an item near a page boundary can
//! be returned twice or not at all. Totals can change from page to page too.
//! Nothing here tries to hide that; callers that need exact results should
//! de-duplicate by id and tolerate small differences from the first total.
//!
//! # Examples
//!
//! ```ignore
//! use entity_graph_client::paging::{browse_decoder, PageFetcher};
//! use entity_graph_client::protocol::QueryParams;
//! use futures::StreamExt;
//!
//! let fetcher = PageFetcher::new(
//!     dispatcher,
//!     "recording",
//!     QueryParams::new().with("release", release_id),
//!     browse_decoder::<serde_json::Value>("recording"),
//! );
//!
//! // One page with metadata
//! let page = fetcher.browse(Some(100), None).await?;
//!
//! // Every item, fetched as needed
//! let mut all = fetcher.stream(0, Some(100))?.into_stream();
//! while let Some(recording) = all.next().await {
//!     let recording = recording?;
//! }
//! ```

mod cursor;
mod fetcher;
mod page;
mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use cursor::{CursorState, PageCursor};
pub use fetcher::{PageFetcher, PageSource};
pub use page::{browse_decoder, json_decoder, search_decoder, PageDecoder, PagedResult};
pub use stream::{BlockingIter, StreamingSequence};
