//! Request execution.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config    - ClientConfig and environment overrides
//! ├── throttle  - RequestThrottle, the shared request pacing gate
//! ├── dispatch  - RequestDispatcher, one HTTP exchange at a time
//! ├── translate - ErrorTranslator for non-2xx bodies
//! └── blocking  - runtime bridge behind the *_blocking methods
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestDispatcher`] | Executes requests through the throttle |
//! | [`RequestThrottle`] | Minimum spacing between request starts |
//! | [`ErrorTranslator`] | Reads XML/JSON error bodies |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ```
//! use entity_graph_client::client::{ClientConfig, RequestDispatcher, RequestThrottle};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = ClientConfig {
//!     application_name: Some("tagger".into()),
//!     application_version: Some("1.2".into()),
//!     ..Default::default()
//! };
//! let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(500)));
//! let dispatcher = RequestDispatcher::with_throttle(config, throttle).unwrap();
//! assert!(dispatcher.user_agent().starts_with("tagger/1.2 "));
//! ```

pub(crate) mod blocking;
mod config;
mod dispatch;
mod throttle;
mod translate;

pub use config::{ClientConfig, DEFAULT_BASE_URL, ENV_PREFIX};
pub use dispatch::RequestDispatcher;
pub use throttle::{RequestThrottle, ThrottlePermit, DEFAULT_MIN_INTERVAL};
pub use translate::{ErrorTranslator, Translation};
