//! Header parsing and formatting.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Content-Type | `type/subtype; param=value` | `application/json; charset=utf-8` |
//! | User-Agent | `app/version (contact) lib/version` | `tagger/1.2 (me@example.org) entity_graph_client/0.1.0` |
//!
//! # Examples
//!
//! ```
//! use entity_graph_client::protocol::ContentType;
//!
//! let ct = ContentType::parse("application/json; charset=UTF-8").unwrap();
//! assert!(ct.is_json());
//! assert_eq!(ct.charset(), Some("utf-8"));
//! ```

use super::LIBRARY_USER_AGENT;
use crate::error::{QueryError, Result};

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    charset: Option<String>,
}

impl ContentType {
    /// Parse a header value.
    ///
    /// Returns `None` for a value without a `type/subtype` pair. Media type and
    /// charset are lowercased; other parameters are ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let media_type = parts.next()?.trim().to_ascii_lowercase();
        let (kind, subtype) = media_type.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let charset = parts.find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches('"').to_ascii_lowercase())
            } else {
                None
            }
        });

        Some(ContentType {
            media_type,
            charset,
        })
    }

    /// The `type/subtype` part, lowercased.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The declared charset, lowercased.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// `application/json` or any `+json` structured suffix.
    pub fn is_json(&self) -> bool {
        self.media_type == "application/json" || self.media_type.ends_with("+json")
    }

    /// `application/xml`, `text/xml` or any `+xml` structured suffix.
    pub fn is_xml(&self) -> bool {
        self.media_type == "application/xml"
            || self.media_type == "text/xml"
            || self.media_type.ends_with("+xml")
    }
}

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Decode a body using a declared charset, assuming UTF-8 when none is given.
///
/// Only UTF-8, US-ASCII and ISO-8859-1 are understood. A leading UTF-8
/// byte order mark is dropped.
pub fn decode_text(body: &[u8], charset: Option<&str>) -> Result<String> {
    match charset.unwrap_or("utf-8") {
        "utf-8" | "utf8" => {
            let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
            String::from_utf8(body.to_vec()).map_err(|e| QueryError::decode("response text", e))
        }
        "us-ascii" | "ascii" => {
            if body.is_ascii() {
                Ok(body.iter().map(|&b| b as char).collect())
            } else {
                Err(QueryError::decode("response text", "non-ascii byte in us-ascii body"))
            }
        }
        // Latin-1 maps every byte onto the code point of the same value.
        "iso-8859-1" | "latin1" | "l1" => Ok(body.iter().map(|&b| b as char).collect()),
        other => Err(QueryError::decode(
            "response text",
            format!("unsupported charset '{}'", other),
        )),
    }
}

/// Compose the `User-Agent` header.
///
/// The application token is omitted when no application name is configured.
pub fn user_agent(application: Option<&str>, version: Option<&str>, contact: Option<&str>) -> String {
    let application = match application.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name,
        None => return LIBRARY_USER_AGENT.to_string(),
    };

    let mut agent = application.to_string();
    if let Some(version) = version.map(str::trim).filter(|s| !s.is_empty()) {
        agent.push('/');
        agent.push_str(version);
    }
    if let Some(contact) = contact.map(str::trim).filter(|s| !s.is_empty()) {
        agent.push_str(" (");
        agent.push_str(contact);
        agent.push(')');
    }
    agent.push(' ');
    agent.push_str(LIBRARY_USER_AGENT);
    agent
}
