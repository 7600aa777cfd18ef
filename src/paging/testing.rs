//! In-memory page sources for tests.

use super::fetcher::PageSource;
use super::page::PagedResult;
use crate::error::{HttpFailure, QueryError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Mutation<T> = Box<dyn Fn(usize, &mut Vec<T>) + Send + Sync>;

/// Serves pages out of a vector that may change between fetches.
pub(crate) struct VecSource<T> {
    data: Mutex<Vec<T>>,
    fetches: AtomicUsize,
    after_fetch: Option<Mutation<T>>,
}

impl<T: Clone + Send + Sync + 'static> VecSource<T> {
    pub(crate) fn new(data: Vec<T>) -> Self {
        VecSource {
            data: Mutex::new(data),
            fetches: AtomicUsize::new(0),
            after_fetch: None,
        }
    }

    /// Run `mutation(fetch_number, data)` after every served page.
    pub(crate) fn mutating<F>(data: Vec<T>, mutation: F) -> Self
    where
        F: Fn(usize, &mut Vec<T>) + Send + Sync + 'static,
    {
        VecSource {
            after_fetch: Some(Box::new(mutation)),
            ..Self::new(data)
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn serve(&self, offset: u32, limit: u32) -> PagedResult<T> {
        let mut data = self.data.lock();
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(limit as usize).min(data.len());
        let page = PagedResult::new(data[start..end].to_vec(), offset, data.len() as u32);

        let fetch_number = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(mutation) = &self.after_fetch {
            mutation(fetch_number, &mut data);
        }
        page
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> PageSource<T> for VecSource<T> {
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PagedResult<T>> {
        Ok(self.serve(offset, limit))
    }
}

/// A [`VecSource`] whose `fail_on`-th fetch (0-based) fails once with a 503.
pub(crate) struct FailingSource<T> {
    inner: VecSource<T>,
    attempts: AtomicUsize,
    fail_on: usize,
}

impl<T: Clone + Send + Sync + 'static> FailingSource<T> {
    pub(crate) fn new(data: Vec<T>, fail_on: usize) -> Self {
        FailingSource {
            inner: VecSource::new(data),
            attempts: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> PageSource<T> for FailingSource<T> {
    async fn fetch_page(&self, offset: u32, limit: u32) -> Result<PagedResult<T>> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == self.fail_on {
            return Err(QueryError::Status(HttpFailure::new(503, None, Vec::new())));
        }
        self.inner.fetch_page(offset, limit).await
    }
}
