//! Wire-level constants and helpers shared by the dispatcher and the pager.
//!
//! # Wire Contract
//!
//! | Header | Value |
//! |--------|-------|
//! | `Accept` | `application/json` (or the caller's accept type) |
//! | `Content-Type` | only when a body is sent |
//! | `User-Agent` | application token followed by [`LIBRARY_USER_AGENT`] |
//! | `Authorization` | `Bearer <token>` when a token is configured |
//!
//! Paged resources take `limit` (1 to 100) and `offset` (0 or more) query
//! parameters and answer with an envelope carrying the page's items, a total
//! count and the echoed offset.

pub mod headers;
pub mod query;

pub use headers::{decode_text, user_agent, ContentType};
pub use query::{resource_url, QueryParams};

/// Media type requested for every entity and page response.
pub const ACCEPT_JSON: &str = "application/json";

/// Media type for requests that want an XML response.
pub const ACCEPT_XML: &str = "application/xml";

/// Library token appended to every user agent.
pub const LIBRARY_USER_AGENT: &str = concat!("entity_graph_client/", env!("CARGO_PKG_VERSION"));

/// Smallest page size the service accepts.
pub const MIN_PAGE_SIZE: u32 = 1;

/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Query parameter carrying the page size.
pub const LIMIT_PARAM: &str = "limit";

/// Query parameter carrying the page offset.
pub const OFFSET_PARAM: &str = "offset";

/// Check a page size against the service's accepted range.
pub fn validate_page_size(limit: u32) -> crate::Result<u32> {
    if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(limit)
    } else {
        Err(crate::QueryError::InvalidPageSize(limit))
    }
}

/// Check if status code indicates a transient failure
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}
