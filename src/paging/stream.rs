//! Lazy multi-page streams.
//!
//! A [`StreamingSequence`] turns a [`PageCursor`] into a flat sequence of
//! items. Pages are fetched on demand: the next request goes out only once
//! every item of the current page has been handed to the consumer.
//!
//! The sequence ends when the cursor reaches the total reported by the most
//! recent page, when a page comes back empty, after the first error (which
//! is yielded), or when its cancellation token fires. It is single-pass: to
//! walk the result set again, build a new sequence.
//!
//! # Examples
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut releases = fetcher.stream(0, Some(100))?.into_stream();
//! while let Some(release) = releases.next().await {
//!     println!("{:?}", release?);
//! }
//! ```
//!
//! Like the cursor it drives, a stream over a changing result set may skip
//! or repeat items near page boundaries.

use super::cursor::PageCursor;
use crate::client::blocking;
use crate::error::{QueryError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// Single-pass sequence of every item a cursor can reach.
#[derive(Debug)]
pub struct StreamingSequence<T> {
    cursor: PageCursor<T>,
    cancel: Option<CancellationToken>,
}

struct StreamState<T> {
    cursor: PageCursor<T>,
    buffer: VecDeque<T>,
    cancel: Option<CancellationToken>,
    failed: bool,
}

impl<T: Send + 'static> StreamingSequence<T> {
    /// Wrap `cursor`; the sequence starts wherever the cursor is.
    pub fn new(cursor: PageCursor<T>) -> Self {
        StreamingSequence { cursor, cancel: None }
    }

    /// Stop cleanly once `cancel` fires.
    ///
    /// The token is checked before every page fetch and interrupts a fetch
    /// in flight. Items of a page that was fully received are still yielded;
    /// a page that was cut off yields nothing.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Consume the sequence as an async stream.
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        let state = StreamState {
            cursor: self.cursor,
            buffer: VecDeque::new(),
            cancel: self.cancel,
            failed: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Some((Ok(item), state));
                }
                if state.failed || state.cursor.is_exhausted() {
                    return None;
                }

                let fetched = match &state.cancel {
                    Some(token) if token.is_cancelled() => return None,
                    Some(token) => state.cursor.next_with_cancel(token).await,
                    None => state.cursor.next().await,
                };

                match fetched {
                    Ok(page) => state.buffer.extend(page.into_items()),
                    Err(QueryError::Cancelled) => return None,
                    Err(e) => {
                        state.failed = true;
                        return Some((Err(e), state));
                    }
                }
            }
        })
        .boxed()
    }

    /// Consume the sequence as a blocking iterator.
    ///
    /// Each call to `next` may block on a page fetch. Must not be used from
    /// inside an async runtime; doing so yields a single
    /// [`QueryError::Runtime`] error.
    pub fn into_blocking_iter(self) -> BlockingIter<T> {
        BlockingIter {
            stream: Some(self.into_stream()),
        }
    }

    /// Collect every remaining item, stopping at the first error.
    pub async fn collect_all(self) -> Result<Vec<T>> {
        let mut stream = self.into_stream();
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}

/// Blocking iterator over a [`StreamingSequence`].
pub struct BlockingIter<T> {
    stream: Option<BoxStream<'static, Result<T>>>,
}

impl<T> Iterator for BlockingIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.stream.as_mut()?;
        match blocking::block_on(stream.next()) {
            Ok(Some(item)) => Some(item),
            Ok(None) => {
                self.stream = None;
                None
            }
            Err(e) => {
                self.stream = None;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::testing::{FailingSource, VecSource};
    use std::sync::Arc;

    fn sequence(source: Arc<VecSource<u32>>, page_size: u32) -> StreamingSequence<u32> {
        StreamingSequence::new(PageCursor::new(source, 0, page_size).unwrap())
    }

    #[tokio::test]
    async fn test_yields_every_item_in_order() {
        let source = Arc::new(VecSource::new((0..237).collect()));
        let items = sequence(source.clone(), 50).collect_all().await.unwrap();
        assert_eq!(items, (0..237).collect::<Vec<_>>());
        assert_eq!(source.fetches(), 5);
    }

    #[tokio::test]
    async fn test_fetches_on_demand() {
        let source = Arc::new(VecSource::new((0..100).collect()));
        let mut stream = sequence(source.clone(), 10).into_stream();

        assert_eq!(source.fetches(), 0);
        for expected in 0..10 {
            assert_eq!(stream.next().await.unwrap().unwrap(), expected);
        }
        assert_eq!(source.fetches(), 1);
        stream.next().await.unwrap().unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_shrinking_dataset_skips_at_most_one() {
        // One item before the cursor disappears after the first page.
        let source = Arc::new(VecSource::mutating((0..237).collect(), |fetch, data: &mut Vec<u32>| {
            if fetch == 1 {
                data.remove(0);
            }
        }));
        let items = sequence(source, 50).collect_all().await.unwrap();
        assert!((236..=238).contains(&items.len()), "got {}", items.len());
        assert!(!items.contains(&50), "item shifted across the page boundary is skipped");
    }

    #[tokio::test]
    async fn test_growing_dataset_repeats_at_most_one() {
        let source = Arc::new(VecSource::mutating((0..237).collect(), |fetch, data: &mut Vec<u32>| {
            if fetch == 1 {
                data.insert(0, 1000);
            }
        }));
        let items = sequence(source, 50).collect_all().await.unwrap();
        assert!((236..=238).contains(&items.len()), "got {}", items.len());
        assert_eq!(items.iter().filter(|&&n| n == 49).count(), 2);
    }

    #[tokio::test]
    async fn test_dataset_emptied_midway_terminates() {
        let source = Arc::new(VecSource::mutating((0..500).collect(), |fetch, data: &mut Vec<u32>| {
            if fetch == 2 {
                data.clear();
            }
        }));
        let items = sequence(source.clone(), 100).collect_all().await.unwrap();
        assert_eq!(items.len(), 200);
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_error_is_yielded_then_stream_ends() {
        let source = Arc::new(FailingSource::<u32>::new((0..30).collect(), 1));
        let cursor = PageCursor::new(source, 0, 10).unwrap();
        let results: Vec<_> = StreamingSequence::new(cursor).into_stream().collect().await;

        assert_eq!(results.len(), 11);
        assert!(results[..10].iter().all(|r| r.is_ok()));
        assert!(matches!(results[10], Err(QueryError::Status(_))));
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_page() {
        let source = Arc::new(VecSource::new((0..100).collect()));
        let cancel = CancellationToken::new();
        let mut stream = sequence(source.clone(), 10)
            .with_cancellation(cancel.clone())
            .into_stream();

        for _ in 0..5 {
            stream.next().await.unwrap().unwrap();
        }
        cancel.cancel();

        let rest: Vec<_> = stream.collect().await;
        assert_eq!(rest.len(), 5);
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn test_blocking_iter() {
        let source = Arc::new(VecSource::new((0..7).collect()));
        let items: Result<Vec<u32>> = sequence(source, 3).into_blocking_iter().collect();
        assert_eq!(items.unwrap(), (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_blocking_iter_inside_runtime_reports_error() {
        let source = Arc::new(VecSource::new((0..7).collect()));
        let mut iter = sequence(source, 3).into_blocking_iter();
        assert!(matches!(iter.next(), Some(Err(QueryError::Runtime(_)))));
        assert!(iter.next().is_none());
    }
}
