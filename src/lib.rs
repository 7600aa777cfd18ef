#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Request dispatch and pagination for entity-graph web services
//!
//! This crate is the core a service binding is built on: it sends requests,
//! paces them, reads the service's error bodies, and walks its paged listings.
//! Entity models, per-entity lookup/browse/search methods and authorization
//! flows live on top of it.
//!
//! ## Overview
//!
//! 1. **Throttling** - a shared [`RequestThrottle`] spaces out request starts
//! 2. **Dispatch** - a [`RequestDispatcher`] performs one exchange and maps failures to [`QueryError`]
//! 3. **Error translation** - XML and JSON error bodies become a [`StructuredError`]
//! 4. **Paging** - [`PageFetcher`], [`PageCursor`] and [`StreamingSequence`] turn bounded pages into browses and streams
//!
//! Every operation is async; each has a `*_blocking` twin that drives the same
//! future on a shared runtime.
//!
//! ## Client Usage
//!
//! ```ignore
//! use entity_graph_client::{ClientConfig, RequestDispatcher};
//! use entity_graph_client::paging::{browse_decoder, PageFetcher};
//! use entity_graph_client::protocol::QueryParams;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = RequestDispatcher::new(ClientConfig {
//!         application_name: Some("my-app".into()),
//!         application_version: Some("0.1".into()),
//!         contact: Some("me@example.org".into()),
//!         ..Default::default()
//!     })?;
//!
//!     let releases = PageFetcher::new(
//!         dispatcher,
//!         "release",
//!         QueryParams::new().with("artist", "5b11f4ce-a62d-471e-81fc-a69a8278c7da"),
//!         browse_decoder::<serde_json::Value>("release"),
//!     );
//!
//!     let mut stream = releases.stream(0, Some(100))?.into_stream();
//!     while let Some(release) = stream.next().await {
//!         println!("{}", release?["title"]);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - The request description ([`DispatchRequest`])
//! - **[error]** - Error types and result handling
//! - **[client]** - Configuration, throttle, dispatcher, error translation
//! - **[paging]** - Pages, cursors and streams
//! - **[protocol]** - Wire constants, header and query helpers

pub mod client;
pub mod error;
pub mod paging;
pub mod protocol;
pub mod types;

pub use client::{ClientConfig, ErrorTranslator, RequestDispatcher, RequestThrottle, Translation};
pub use error::{HttpFailure, QueryError, Result, StructuredError};
pub use paging::{PageCursor, PageFetcher, PagedResult, StreamingSequence};
pub use types::DispatchRequest;
