//! Request description passed to the dispatcher.

use crate::protocol::{QueryParams, ACCEPT_JSON};
use reqwest::Method;

/// One HTTP exchange to perform against the service.
///
/// # Examples
///
/// ```
/// use entity_graph_client::{DispatchRequest, protocol::QueryParams};
/// use reqwest::Method;
///
/// let lookup = DispatchRequest::get("artist/5b11f4ce-a62d-471e-81fc-a69a8278c7da")
///     .with_params(QueryParams::new().with_list("inc", ["aliases"]));
/// assert_eq!(lookup.method, Method::GET);
///
/// let add = DispatchRequest::new(Method::PUT, "collection/abc/releases/def")
///     .with_body("application/xml; charset=utf-8", Vec::new());
/// assert!(add.content_type.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// HTTP method.
    pub method: Method,
    /// Resource path relative to the configured base URL.
    pub path: String,
    /// Query parameters appended to the path.
    pub params: QueryParams,
    /// `Accept` header value.
    pub accept: String,
    /// `Content-Type` of `body`; only sent together with a body.
    pub content_type: Option<String>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl DispatchRequest {
    /// Create a request accepting JSON.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        DispatchRequest {
            method,
            path: path.into(),
            params: QueryParams::new(),
            accept: ACCEPT_JSON.to_string(),
            content_type: None,
            body: None,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Replace the query parameters.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Override the `Accept` header.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Attach a body and its content type.
    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = Some(body.into());
        self
    }
}
