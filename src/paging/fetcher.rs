//! Single-page fetching.
//!
//! [`PageSource`] is the seam the cursor and the stream drive. The production
//! implementation, [`PageFetcher`], issues one `GET` per page through a
//! [`RequestDispatcher`] and decodes the body with a [`PageDecoder`].

use super::cursor::PageCursor;
use super::page::{PageDecoder, PagedResult};
use super::stream::StreamingSequence;
use crate::client::{blocking, RequestDispatcher};
use crate::error::Result;
use crate::protocol::{self, QueryParams};
use crate::types::DispatchRequest;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Anything that can serve a page of `T` at an offset.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch up to `limit` items starting at `offset`.
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PagedResult<T>>;

    /// Like [`fetch_page`](Self::fetch_page), abandoning the request when
    /// the token fires. Sources that cannot be interrupted fetch normally.
    async fn fetch_page_with_cancel(
        &self,
        offset: u32,
        limit: u32,
        _cancel: &CancellationToken,
    ) -> Result<PagedResult<T>> {
        self.fetch_page(offset, limit).await
    }
}

/// Fetches pages of one resource with a fixed filter.
///
/// # Examples
///
/// ```ignore
/// use entity_graph_client::paging::{browse_decoder, PageFetcher};
/// use entity_graph_client::protocol::QueryParams;
///
/// let fetcher = PageFetcher::new(
///     dispatcher,
///     "release",
///     QueryParams::new().with("artist", artist_id),
///     browse_decoder::<serde_json::Value>("release"),
/// );
/// let first = fetcher.browse(None, None).await?;
/// println!("{} of {}", first.count(), first.total());
/// ```
pub struct PageFetcher<T> {
    dispatcher: RequestDispatcher,
    path: String,
    params: QueryParams,
    decoder: PageDecoder<T>,
}

impl<T> Clone for PageFetcher<T> {
    fn clone(&self) -> Self {
        PageFetcher {
            dispatcher: self.dispatcher.clone(),
            path: self.path.clone(),
            params: self.params.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<T> std::fmt::Debug for PageFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("path", &self.path)
            .field("params", &self.params)
            .finish()
    }
}

impl<T: Send + 'static> PageFetcher<T> {
    /// Create a fetcher for `path` with the fixed filter `params`.
    pub fn new(
        dispatcher: RequestDispatcher,
        path: impl Into<String>,
        params: QueryParams,
        decoder: PageDecoder<T>,
    ) -> Self {
        PageFetcher {
            dispatcher,
            path: path.into(),
            params,
            decoder,
        }
    }

    /// Fetch one page. `limit` outside `1..=100` is rejected before any
    /// request is made.
    pub async fn fetch(&self, offset: u32, limit: u32) -> Result<PagedResult<T>> {
        self.fetch_inner(offset, limit, None).await
    }

    /// Blocking form of [`fetch`](Self::fetch).
    pub fn fetch_blocking(&self, offset: u32, limit: u32) -> Result<PagedResult<T>> {
        blocking::block_on(self.fetch_inner(offset, limit, None))?
    }

    /// Browse: fetch one page, defaulting the limit to the configured page
    /// size and the offset to 0.
    pub async fn browse(&self, limit: Option<u32>, offset: Option<u32>) -> Result<PagedResult<T>> {
        let limit = limit.unwrap_or_else(|| self.default_page_size());
        self.fetch(offset.unwrap_or(0), limit).await
    }

    /// Blocking form of [`browse`](Self::browse).
    pub fn browse_blocking(&self, limit: Option<u32>, offset: Option<u32>) -> Result<PagedResult<T>> {
        blocking::block_on(self.browse(limit, offset))?
    }

    /// A cursor over this resource starting at `offset`.
    pub fn cursor(&self, offset: u32, page_size: Option<u32>) -> Result<PageCursor<T>> {
        let page_size = page_size.unwrap_or_else(|| self.default_page_size());
        PageCursor::new(Arc::new(self.clone()), offset, page_size)
    }

    /// A lazy stream over every item from `offset` on.
    pub fn stream(&self, offset: u32, page_size: Option<u32>) -> Result<StreamingSequence<T>> {
        Ok(StreamingSequence::new(self.cursor(offset, page_size)?))
    }

    /// Resource path this fetcher pages over.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The fixed filter parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    fn default_page_size(&self) -> u32 {
        self.dispatcher.config().default_page_size
    }

    async fn fetch_inner(
        &self,
        offset: u32,
        limit: u32,
        cancel: Option<&CancellationToken>,
    ) -> Result<PagedResult<T>> {
        let limit = protocol::validate_page_size(limit)?;
        let request = DispatchRequest::get(self.path.as_str()).with_params(self.params.with_page(offset, limit));

        let body = match cancel {
            Some(token) => self.dispatcher.execute_with_cancel(&request, token).await?,
            None => self.dispatcher.execute(&request).await?,
        };
        let page = (self.decoder)(&body)?;

        tracing::debug!(
            path = %self.path,
            offset = page.offset(),
            count = page.count(),
            total = page.total(),
            "fetched page"
        );
        Ok(page)
    }
}

#[async_trait]
impl<T: Send + 'static> PageSource<T> for PageFetcher<T> {
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PagedResult<T>> {
        self.fetch_inner(offset, limit, None).await
    }

    async fn fetch_page_with_cancel(
        &self,
        offset: u32,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<PagedResult<T>> {
        self.fetch_inner(offset, limit, Some(cancel)).await
    }
}
