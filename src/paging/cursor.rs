//! Stateful page cursor.
//!
//! # State Machine
//!
//! ```text
//!  Fresh ──next()──> HasPage ──next()──> ... ──> Exhausted
//!    └──────────────next()──────────────────────────┘
//! ```
//!
//! - **Fresh**: nothing fetched yet; the offset is the one requested at construction
//! - **HasPage**: at least one page fetched and more are reported
//! - **Exhausted**: the last page reached the reported total, or came back empty
//!
//! Calling [`PageCursor::next`] when exhausted is a no-op: it returns an
//! empty page at the current offset without touching the network.
//!
//! A failed fetch leaves the offset where it was, so calling `next` again
//! retries the same position. The cursor never retries by itself.
//!
//! # Consistency
//!
//! Offsets refer to a live result set. If items are inserted before the
//! cursor's position between two fetches, the next page repeats items; if
//! items are removed, the next page skips items. The service offers no
//! snapshot to page against, so this is reported as-is rather than hidden.

use super::fetcher::PageSource;
use super::page::PagedResult;
use crate::client::blocking;
use crate::error::{QueryError, Result};
use crate::protocol;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Position of a [`PageCursor`] in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No page fetched yet.
    Fresh,
    /// At least one page fetched, more remain.
    HasPage,
    /// The end of the result set was reached.
    Exhausted,
}

/// Walks a [`PageSource`] page by page.
pub struct PageCursor<T> {
    source: Arc<dyn PageSource<T>>,
    offset: u32,
    page_size: u32,
    state: CursorState,
    total: Option<u32>,
    pages_fetched: usize,
}

impl<T> std::fmt::Debug for PageCursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCursor")
            .field("offset", &self.offset)
            .field("page_size", &self.page_size)
            .field("state", &self.state)
            .field("total", &self.total)
            .finish()
    }
}

impl<T: Send + 'static> PageCursor<T> {
    /// Create a cursor starting at `offset`. `page_size` must be in `1..=100`.
    pub fn new(source: Arc<dyn PageSource<T>>, offset: u32, page_size: u32) -> Result<Self> {
        let page_size = protocol::validate_page_size(page_size)?;
        Ok(PageCursor {
            source,
            offset,
            page_size,
            state: CursorState::Fresh,
            total: None,
            pages_fetched: 0,
        })
    }

    /// Fetch the next page and advance past it.
    pub async fn next(&mut self) -> Result<PagedResult<T>> {
        if let Some(done) = self.exhausted_page() {
            return Ok(done);
        }
        let page = self.source.fetch_page(self.offset, self.page_size).await?;
        Ok(self.advance(page))
    }

    /// Like [`next`](Self::next), but fails with [`QueryError::Cancelled`]
    /// when `cancel` has fired or fires during the fetch.
    pub async fn next_with_cancel(&mut self, cancel: &CancellationToken) -> Result<PagedResult<T>> {
        if let Some(done) = self.exhausted_page() {
            return Ok(done);
        }
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        let page = self
            .source
            .fetch_page_with_cancel(self.offset, self.page_size, cancel)
            .await?;
        Ok(self.advance(page))
    }

    /// Blocking form of [`next`](Self::next).
    pub fn next_blocking(&mut self) -> Result<PagedResult<T>> {
        blocking::block_on(self.next())?
    }

    fn exhausted_page(&self) -> Option<PagedResult<T>> {
        (self.state == CursorState::Exhausted)
            .then(|| PagedResult::empty(self.offset, self.total.unwrap_or(self.offset)))
    }

    fn advance(&mut self, page: PagedResult<T>) -> PagedResult<T> {
        let count = page.count();
        self.offset = self.offset.saturating_add(count);
        self.total = Some(page.total());
        self.pages_fetched += 1;

        // An empty page means the result set shrank below our offset.
        self.state = if count == 0 || self.offset >= page.total() {
            CursorState::Exhausted
        } else {
            CursorState::HasPage
        };
        page
    }

    /// Offset the next fetch will start at.
    pub fn current_offset(&self) -> u32 {
        self.offset
    }

    /// Items requested per fetch.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Whether the end of the result set has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Total reported by the most recent page.
    pub fn total(&self) -> Option<u32> {
        self.total
    }

    /// Number of successful fetches so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::testing::{FailingSource, VecSource};

    #[tokio::test]
    async fn test_walks_to_exhaustion() {
        let source = Arc::new(VecSource::<u32>::new((0..237).collect()));
        let mut cursor = PageCursor::new(source.clone(), 0, 50).unwrap();
        assert_eq!(cursor.state(), CursorState::Fresh);

        let mut counts = Vec::new();
        while !cursor.is_exhausted() {
            counts.push(cursor.next().await.unwrap().count());
        }
        assert_eq!(counts, vec![50, 50, 50, 50, 37]);
        assert_eq!(cursor.current_offset(), 237);
        assert_eq!(source.fetches(), 5);
    }

    #[tokio::test]
    async fn test_partial_last_page_then_noop() {
        let source = Arc::new(VecSource::<u32>::new((0..237).collect()));
        let mut cursor = PageCursor::new(source.clone(), 200, 50).unwrap();

        let last = cursor.next().await.unwrap();
        assert_eq!((last.offset(), last.count(), last.total()), (200, 37, 237));
        assert_eq!(cursor.state(), CursorState::Exhausted);

        let after = cursor.next().await.unwrap();
        assert_eq!(after.count(), 0);
        assert_eq!(after.offset(), 237);
        assert_eq!(after.total(), 237);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_has_page_state() {
        let source = Arc::new(VecSource::<u32>::new((0..10).collect()));
        let mut cursor = PageCursor::new(source, 0, 4).unwrap();
        cursor.next().await.unwrap();
        assert_eq!(cursor.state(), CursorState::HasPage);
        assert_eq!(cursor.total(), Some(10));
        assert_eq!(cursor.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_offset_unchanged() {
        let source = Arc::new(FailingSource::<u32>::new((0..30).collect(), 1));
        let mut cursor = PageCursor::new(source, 0, 10).unwrap();

        cursor.next().await.unwrap();
        assert_eq!(cursor.current_offset(), 10);

        assert!(cursor.next().await.is_err());
        assert_eq!(cursor.current_offset(), 10);
        assert_eq!(cursor.state(), CursorState::HasPage);

        let retried = cursor.next().await.unwrap();
        assert_eq!(retried.offset(), 10);
        assert_eq!(retried.items()[0], 10);
    }

    #[tokio::test]
    async fn test_empty_page_exhausts() {
        let source = Arc::new(VecSource::<u32>::new(Vec::new()));
        let mut cursor = PageCursor::new(source, 0, 25).unwrap();
        let page = cursor.next().await.unwrap();
        assert_eq!(page.count(), 0);
        assert!(cursor.is_exhausted());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let source = Arc::new(VecSource::<u32>::new((0..10).collect()));
        let mut cursor = PageCursor::new(source.clone(), 0, 5).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(cursor.next_with_cancel(&cancel).await, Err(QueryError::Cancelled)));
        assert_eq!(cursor.state(), CursorState::Fresh);
        assert_eq!(source.fetches(), 0);
    }

    #[test]
    fn test_rejects_page_size() {
        let source: Arc<dyn PageSource<u32>> = Arc::new(VecSource::<u32>::new(Vec::new()));
        assert!(matches!(PageCursor::new(source.clone(), 0, 0), Err(QueryError::InvalidPageSize(0))));
        assert!(matches!(PageCursor::new(source, 0, 101), Err(QueryError::InvalidPageSize(101))));
    }

    #[test]
    fn test_next_blocking() {
        let source = Arc::new(VecSource::<u32>::new((0..3).collect()));
        let mut cursor = PageCursor::new(source, 0, 2).unwrap();
        assert_eq!(cursor.next_blocking().unwrap().items(), &[0, 1]);
        assert_eq!(cursor.next_blocking().unwrap().items(), &[2]);
        assert!(cursor.is_exhausted());
    }
}
