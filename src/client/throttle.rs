//! Request pacing shared between dispatchers.
//!
//! A [`RequestThrottle`] guarantees that the *starts* of any two requests
//! passing through it are at least `min_interval` apart. It never rejects a
//! request, it only delays it. Blocking and async callers share the same
//! state, so mixing [`RequestThrottle::acquire_blocking`] and
//! [`RequestThrottle::acquire`] still paces them against each other.
//!
//! Waiting is done by polling: a caller that is too early sleeps for a
//! fraction of `min_interval` and re-checks. Callers may therefore see slightly
//! more than the minimum delay, never less.
//!
//! # Examples
//!
//! ```
//! use entity_graph_client::client::RequestThrottle;
//! use std::time::Duration;
//!
//! let throttle = RequestThrottle::new(Duration::ZERO);
//! let permit = throttle.acquire_blocking();
//! assert_eq!(permit.waited(), Duration::ZERO);
//! ```

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{QueryError, Result};

/// Interval used by [`RequestThrottle::process_wide`] until changed.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Poll granularity as a fraction of the minimum interval.
const POLL_DIVISOR: u32 = 10;

/// Lower bound for a single poll sleep.
const MIN_POLL: Duration = Duration::from_millis(1);

static PROCESS_WIDE: OnceLock<Arc<RequestThrottle>> = OnceLock::new();

#[derive(Debug)]
struct ThrottleState {
    last_request_start: Option<Instant>,
    min_interval: Duration,
}

/// Gate enforcing a minimum spacing between request starts.
#[derive(Debug)]
pub struct RequestThrottle {
    state: Mutex<ThrottleState>,
}

/// Proof that a request was admitted by the throttle.
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePermit {
    started_at: Instant,
    waited: Duration,
}

impl ThrottlePermit {
    /// The start time stamped for this request.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// How long the caller was held back.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl RequestThrottle {
    /// Create an independent throttle. `Duration::ZERO` disables pacing.
    pub fn new(min_interval: Duration) -> Self {
        RequestThrottle {
            state: Mutex::new(ThrottleState {
                last_request_start: None,
                min_interval,
            }),
        }
    }

    /// The throttle shared by every dispatcher that is not given its own.
    pub fn process_wide() -> Arc<RequestThrottle> {
        PROCESS_WIDE
            .get_or_init(|| Arc::new(RequestThrottle::new(DEFAULT_MIN_INTERVAL)))
            .clone()
    }

    /// Current minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.state.lock().min_interval
    }

    /// Change the minimum interval for every subsequent request.
    pub fn set_min_interval(&self, min_interval: Duration) {
        self.state.lock().min_interval = min_interval;
    }

    /// Whether pacing is switched off.
    pub fn is_disabled(&self) -> bool {
        self.min_interval().is_zero()
    }

    /// Wait until a request may start, suspending the task between polls.
    pub async fn acquire(&self) -> ThrottlePermit {
        let begun = Instant::now();
        let mut held = false;
        loop {
            match self.try_stamp(held.then_some(begun)) {
                Ok(permit) => return permit,
                Err(poll) => {
                    held = true;
                    tracing::trace!(poll_ms = poll.as_millis() as u64, "throttle: waiting");
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up when `cancel` fires.
    ///
    /// The token is checked before every poll, so a cancelled caller never
    /// consumes a slot.
    pub async fn acquire_with_cancel(&self, cancel: &CancellationToken) -> Result<ThrottlePermit> {
        let begun = Instant::now();
        let mut held = false;
        loop {
            if cancel.is_cancelled() {
                return Err(QueryError::Cancelled);
            }
            match self.try_stamp(held.then_some(begun)) {
                Ok(permit) => return Ok(permit),
                Err(poll) => {
                    held = true;
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(QueryError::Cancelled),
                        _ = tokio::time::sleep(poll) => {}
                    }
                }
            }
        }
    }

    /// Wait until a request may start, blocking the current thread.
    pub fn acquire_blocking(&self) -> ThrottlePermit {
        let begun = Instant::now();
        let mut held = false;
        loop {
            match self.try_stamp(held.then_some(begun)) {
                Ok(permit) => return permit,
                Err(poll) => {
                    held = true;
                    std::thread::sleep(poll);
                }
            }
        }
    }

    /// Check and stamp under the lock. On refusal returns how long to sleep
    /// before the next check.
    ///
    /// `held_since` is `None` on the first check; a caller admitted then
    /// waited for nothing.
    fn try_stamp(&self, held_since: Option<Instant>) -> std::result::Result<ThrottlePermit, Duration> {
        let mut state = self.state.lock();
        let now = Instant::now();

        let admitted = state.min_interval.is_zero()
            || match state.last_request_start {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= state.min_interval,
            };

        if admitted {
            state.last_request_start = Some(now);
            Ok(ThrottlePermit {
                started_at: now,
                waited: held_since.map_or(Duration::ZERO, |begun| now.saturating_duration_since(begun)),
            })
        } else {
            Err((state.min_interval / POLL_DIVISOR).max(MIN_POLL))
        }
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_throttle_passes_through() {
        let throttle = RequestThrottle::new(Duration::ZERO);
        assert!(throttle.is_disabled());
        let begun = Instant::now();
        for _ in 0..50 {
            throttle.acquire_blocking();
        }
        assert!(begun.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_first_admission_reports_no_wait() {
        let disabled = RequestThrottle::new(Duration::ZERO);
        assert_eq!(disabled.acquire_blocking().waited(), Duration::ZERO);
        assert_eq!(disabled.acquire().await.waited(), Duration::ZERO);

        let paced = RequestThrottle::new(Duration::from_millis(30));
        assert_eq!(paced.acquire().await.waited(), Duration::ZERO);
        let second = paced.acquire().await;
        assert!(second.waited() > Duration::ZERO);
    }

    #[test]
    fn test_blocking_spacing() {
        let interval = Duration::from_millis(30);
        let throttle = RequestThrottle::new(interval);
        let starts: Vec<Instant> = (0..4).map(|_| throttle.acquire_blocking().started_at()).collect();
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[tokio::test]
    async fn test_async_spacing_across_tasks() {
        let interval = Duration::from_millis(25);
        let throttle = Arc::new(RequestThrottle::new(interval));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.acquire().await.started_at() })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let throttle = RequestThrottle::new(Duration::from_secs(60));
        throttle.acquire().await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = throttle.acquire_with_cancel(&cancel).await;
        assert!(matches!(result, Err(QueryError::Cancelled)));
    }

    #[test]
    fn test_set_min_interval() {
        let throttle = RequestThrottle::default();
        assert_eq!(throttle.min_interval(), DEFAULT_MIN_INTERVAL);
        throttle.set_min_interval(Duration::ZERO);
        assert!(throttle.is_disabled());
    }

    #[test]
    fn test_process_wide_is_shared() {
        let a = RequestThrottle::process_wide();
        let b = RequestThrottle::process_wide();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
