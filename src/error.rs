//! Error types for entity-graph requests.
//!
//! Callers see exactly one of three shapes when a request fails:
//!
//! - [`QueryError::Transport`] for failures below HTTP (connect, DNS, timeout)
//! - [`QueryError::Structured`] when the service returned an error body we could read
//! - [`QueryError::Status`] when it returned an error body we could not read
//!
//! Everything else ([`QueryError::Decode`], [`QueryError::Disposed`], ...) is raised
//! by this crate itself, never by the remote service.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QueryError>;

/// A non-2xx response as it came off the wire.
///
/// This is the "raw" failure the error translator starts from. When no
/// structured message can be derived it is surfaced unchanged as
/// [`QueryError::Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for `status`, if it has one.
    pub reason: Option<String>,
    /// Declared `Content-Type` of the response, verbatim.
    pub content_type: Option<String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpFailure {
    /// Build a failure from its parts.
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<Vec<u8>>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map(str::to_string);
        Self {
            status,
            reason,
            content_type,
            body: body.into(),
        }
    }

    /// Whether the response carried any body at all.
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "HTTP {} {}", self.status, reason),
            None => write!(f, "HTTP {}", self.status),
        }
    }
}

/// Caller-facing form of a failed request, derived from the response body.
///
/// Only the error translator constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredError {
    /// Human-readable message reported by the service.
    pub message: String,
    /// Optional pointer to documentation about the failure.
    pub help: Option<String>,
    /// The failure the message was derived from.
    pub failure: HttpFailure,
}

impl StructuredError {
    pub(crate) fn new(message: String, help: Option<String>, failure: HttpFailure) -> Self {
        Self {
            message,
            help,
            failure,
        }
    }

    /// HTTP status of the underlying failure.
    pub fn status(&self) -> u16 {
        self.failure.status
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.failure)?;
        if let Some(help) = &self.help {
            write!(f, " - {}", help)?;
        }
        Ok(())
    }
}

impl std::error::Error for StructuredError {}

/// Errors raised by the dispatcher and the paging machinery.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Connection, DNS, TLS or timeout failure. Never translated.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response whose body was absent or unreadable.
    #[error("request failed: {0}")]
    Status(HttpFailure),

    /// Non-2xx response translated from its body.
    #[error("service error: {0}")]
    Structured(#[from] StructuredError),

    /// A 2xx response whose body did not have the expected shape.
    #[error("failed to decode {what}: {reason}")]
    Decode {
        /// What was being decoded (e.g. "page envelope").
        what: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The dispatcher was disposed before this call.
    #[error("dispatcher has already been closed")]
    Disposed,

    /// Page size outside the accepted `1..=100` range.
    #[error("page size {0} is outside 1..=100")]
    InvalidPageSize(u32),

    /// Base URL or resource path could not be turned into a request URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The operation observed its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// The blocking bridge could not run the request.
    #[error("blocking runtime error: {0}")]
    Runtime(String),
}

impl QueryError {
    pub(crate) fn decode(what: &'static str, reason: impl fmt::Display) -> Self {
        QueryError::Decode {
            what,
            reason: reason.to_string(),
        }
    }

    /// HTTP status of a protocol failure, translated or not.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Status(failure) => Some(failure.status),
            QueryError::Structured(err) => Some(err.status()),
            QueryError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether a caller could reasonably try the same request again.
    ///
    /// The dispatcher itself never retries; this is advisory only.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Transport(err) => err.is_timeout() || err.is_connect(),
            QueryError::Status(_) | QueryError::Structured(_) => self
                .status()
                .map(crate::protocol::is_retryable_status)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The structured message, when the failure was translated.
    pub fn structured(&self) -> Option<&StructuredError> {
        match self {
            QueryError::Structured(err) => Some(err),
            _ => None,
        }
    }
}
