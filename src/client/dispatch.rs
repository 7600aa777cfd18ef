//! Request dispatcher.
//!
//! [`RequestDispatcher`] performs single HTTP exchanges with the service:
//! it waits for the shared [`RequestThrottle`], sets the standard headers,
//! sends the request and turns non-2xx responses into errors through the
//! [`ErrorTranslator`].
//!
//! # Examples
//!
//! ## Lookup
//!
//! ```ignore
//! use entity_graph_client::{ClientConfig, DispatchRequest, RequestDispatcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = RequestDispatcher::new(ClientConfig::default())?;
//!     let body = dispatcher
//!         .execute(&DispatchRequest::get("artist/5b11f4ce-a62d-471e-81fc-a69a8278c7da"))
//!         .await?;
//!     println!("{}", body);
//!     Ok(())
//! }
//! ```
//!
//! ## Private budget
//!
//! ```ignore
//! use entity_graph_client::{ClientConfig, RequestDispatcher, RequestThrottle};
//! use std::{sync::Arc, time::Duration};
//!
//! let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(250)));
//! let a = RequestDispatcher::with_throttle(ClientConfig::default(), throttle.clone())?;
//! let b = RequestDispatcher::with_throttle(ClientConfig::default(), throttle)?;
//! // `a` and `b` share one request budget, independent of every other dispatcher.
//! ```

use crate::client::blocking;
use crate::client::config::ClientConfig;
use crate::client::throttle::RequestThrottle;
use crate::client::translate::ErrorTranslator;
use crate::error::{HttpFailure, QueryError, Result};
use crate::protocol;
use crate::types::DispatchRequest;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

struct DispatcherInner {
    config: ClientConfig,
    base_url: Url,
    user_agent: String,
    throttle: Arc<RequestThrottle>,
    bearer_token: RwLock<Option<String>>,
    /// Lazily created connection handle; `None` until first use or after `close`.
    handle: Mutex<Option<reqwest::Client>>,
    disposed: AtomicBool,
    last_status: AtomicU16,
}

/// Executes HTTP exchanges against the service.
///
/// Cloning is cheap and clones share the connection handle, the bearer
/// token and the disposed flag.
#[derive(Clone)]
pub struct RequestDispatcher {
    inner: Arc<DispatcherInner>,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.inner.base_url.as_str())
            .field("user_agent", &self.inner.user_agent)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl RequestDispatcher {
    /// Create a dispatcher on the process-wide throttle.
    ///
    /// The process-wide throttle takes its interval from `config`; the most
    /// recently created dispatcher's setting applies to all of them.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let throttle = RequestThrottle::process_wide();
        throttle.set_min_interval(config.min_request_interval());
        Self::with_throttle(config, throttle)
    }

    /// Create a dispatcher that paces its requests on `throttle`.
    ///
    /// The throttle's interval is left as it is.
    pub fn with_throttle(config: ClientConfig, throttle: Arc<RequestThrottle>) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;
        let user_agent = config.user_agent();
        let bearer_token = config.bearer_token.clone().filter(|t| !t.is_empty());

        Ok(RequestDispatcher {
            inner: Arc::new(DispatcherInner {
                config,
                base_url,
                user_agent,
                throttle,
                bearer_token: RwLock::new(bearer_token),
                handle: Mutex::new(None),
                disposed: AtomicBool::new(false),
                last_status: AtomicU16::new(0),
            }),
        })
    }

    /// Perform one exchange and return the response body as text.
    pub async fn execute(&self, request: &DispatchRequest) -> Result<String> {
        self.exchange(request, None).await
    }

    /// Like [`execute`](Self::execute), giving up when `cancel` fires before
    /// the response arrives.
    pub async fn execute_with_cancel(
        &self,
        request: &DispatchRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.exchange(request, Some(cancel)).await
    }

    /// Blocking form of [`execute`](Self::execute).
    ///
    /// Must not be called from inside an async runtime.
    pub fn execute_blocking(&self, request: &DispatchRequest) -> Result<String> {
        blocking::block_on(self.exchange(request, None))?
    }

    async fn exchange(
        &self,
        request: &DispatchRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<String> {
        self.ensure_open()?;
        let url = protocol::resource_url(&self.inner.base_url, &request.path, &request.params)?;

        let permit = match cancel {
            Some(token) => self.inner.throttle.acquire_with_cancel(token).await?,
            None => self.inner.throttle.acquire().await,
        };
        // Fails if the dispatcher was disposed while we waited.
        let client = self.handle()?;

        if self.inner.config.enable_logging {
            tracing::debug!(
                method = %request.method,
                url = %url,
                throttled_ms = permit.waited().as_millis() as u64,
                "dispatching request"
            );
        }

        let mut builder = client
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, request.accept.as_str());
        if let Some(token) = self.inner.bearer_token.read().as_deref() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            if let Some(content_type) = &request.content_type {
                builder = builder.header(CONTENT_TYPE, content_type.as_str());
            }
            builder = builder.body(body.clone());
        }

        let response = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(QueryError::Cancelled),
                sent = builder.send() => sent?,
            },
            None => builder.send().await?,
        };

        let status = response.status();
        self.inner.last_status.store(status.as_u16(), Ordering::Relaxed);

        if status.is_success() {
            return Ok(response.text().await?);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        // An unreadable error body is treated as no body at all.
        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let failure = HttpFailure::new(status.as_u16(), content_type, body);
        let err = ErrorTranslator::raise(failure);

        if self.inner.config.enable_logging {
            tracing::debug!(
                method = %request.method,
                url = %url,
                status = status.as_u16(),
                translated = err.structured().is_some(),
                "request failed"
            );
        }
        Err(err)
    }

    /// Get or create the connection handle under the instance lock.
    ///
    /// The disposed flag is re-checked under the same lock `dispose` takes,
    /// so a disposed dispatcher never gets a fresh handle.
    fn handle(&self) -> Result<reqwest::Client> {
        let mut slot = self.inner.handle.lock();
        if self.is_disposed() {
            return Err(QueryError::Disposed);
        }
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.inner.config.request_timeout())
            .user_agent(self.inner.user_agent.as_str());
        if !self.inner.config.proxy_url.is_empty() {
            match reqwest::Proxy::all(&self.inner.config.proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => return Err(QueryError::Config(format!("invalid proxy url: {}", e))),
            }
        }

        let client = builder.build()?;
        *slot = Some(client.clone());
        Ok(client)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_disposed() {
            Err(QueryError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Drop the cached connection handle. The next request creates a new one.
    pub fn close(&self) {
        self.inner.handle.lock().take();
    }

    /// Close the dispatcher for good. Every later call fails with
    /// [`QueryError::Disposed`].
    pub fn dispose(&self) {
        let mut slot = self.inner.handle.lock();
        self.inner.disposed.store(true, Ordering::SeqCst);
        slot.take();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Whether a connection handle is currently cached.
    pub fn has_open_handle(&self) -> bool {
        self.inner.handle.lock().is_some()
    }

    /// Set or clear the bearer token sent with later requests.
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self.inner.bearer_token.write() = token.filter(|t| !t.is_empty());
    }

    /// HTTP status of the most recent completed exchange, if any.
    pub fn last_status(&self) -> Option<u16> {
        match self.inner.last_status.load(Ordering::Relaxed) {
            0 => None,
            status => Some(status),
        }
    }

    /// The throttle this dispatcher paces on.
    pub fn throttle(&self) -> &Arc<RequestThrottle> {
        &self.inner.throttle
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The base URL resource paths are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The `User-Agent` sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dispatcher() -> RequestDispatcher {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:1/ws/2".into(),
            application_name: Some("tests".into()),
            ..Default::default()
        };
        RequestDispatcher::with_throttle(config, Arc::new(RequestThrottle::new(Duration::ZERO))).unwrap()
    }

    #[test]
    fn test_dispatcher_creation() {
        let d = dispatcher();
        assert_eq!(d.base_url().as_str(), "http://127.0.0.1:1/ws/2/");
        assert!(d.user_agent().starts_with("tests "));
        assert!(!d.has_open_handle());
        assert_eq!(d.last_status(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig {
            default_page_size: 0,
            ..Default::default()
        };
        let result = RequestDispatcher::with_throttle(config, Arc::new(RequestThrottle::default()));
        assert!(matches!(result, Err(QueryError::InvalidPageSize(0))));
    }

    #[test]
    fn test_close_drops_handle_and_recreates() {
        let d = dispatcher();
        d.handle().unwrap();
        assert!(d.has_open_handle());
        d.close();
        assert!(!d.has_open_handle());
        d.handle().unwrap();
        assert!(d.has_open_handle());
    }

    #[test]
    fn test_dispose_blocks_handle_creation() {
        let d = dispatcher();
        d.handle().unwrap();
        let other = d.clone();
        other.dispose();
        assert!(matches!(d.handle(), Err(QueryError::Disposed)));
        assert!(!d.has_open_handle());
    }

    #[test]
    fn test_dispose_racing_handle_never_leaves_handle_cached() {
        for _ in 0..50 {
            let d = dispatcher();
            let racer = d.clone();
            let creator = std::thread::spawn(move || {
                let _ = racer.handle();
            });
            d.dispose();
            creator.join().unwrap();
            assert!(!d.has_open_handle());
            assert!(matches!(d.handle(), Err(QueryError::Disposed)));
        }
    }

    #[tokio::test]
    async fn test_disposed_fails_fast() {
        let d = dispatcher();
        d.dispose();
        assert!(d.is_disposed());
        assert!(!d.has_open_handle());
        let result = d.execute(&DispatchRequest::get("artist/x")).await;
        assert!(matches!(result, Err(QueryError::Disposed)));
    }

    #[tokio::test]
    async fn test_blocking_inside_runtime_is_refused() {
        let d = dispatcher();
        let result = d.execute_blocking(&DispatchRequest::get("artist/x"));
        assert!(matches!(result, Err(QueryError::Runtime(_))));
    }
}
