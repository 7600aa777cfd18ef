//! Translation of failed responses into structured errors.
//!
//! The service reports errors in one of two body formats:
//!
//! | Content type | Body | Message | Help |
//! |--------------|------|---------|------|
//! | XML | `<error><text>..</text><text>..</text></error>` | all `text` nodes joined by newlines | none |
//! | JSON | `{"error": .., "help": ..}` | `error` (or `message`) | `help` |
//!
//! Translation is best effort. Whatever goes wrong while reading an error
//! body is reported as [`Translation::Malformed`] and the caller falls back
//! to the original [`HttpFailure`]; the translator itself never fails.
//!
//! # Examples
//!
//! ```
//! use entity_graph_client::client::{ErrorTranslator, Translation};
//! use entity_graph_client::HttpFailure;
//!
//! let failure = HttpFailure::new(
//!     400,
//!     Some("application/json".into()),
//!     br#"{"error":"invalid mbid","help":"see docs"}"#.to_vec(),
//! );
//! match ErrorTranslator::translate(&failure) {
//!     Translation::Translated { message, help } => {
//!         assert_eq!(message, "invalid mbid");
//!         assert_eq!(help.as_deref(), Some("see docs"));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use crate::error::{HttpFailure, QueryError, StructuredError};
use crate::protocol::{decode_text, ContentType};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

/// Element path holding error text in XML error documents.
const XML_ERROR_PATH: [&str; 2] = ["error", "text"];

/// Outcome of inspecting a failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// A message (and maybe a help reference) was read from the body.
    Translated {
        /// Message reported by the service.
        message: String,
        /// Help reference, when the format carries one.
        help: Option<String>,
    },
    /// The content type was understood but the body could not be read.
    Malformed {
        /// Why reading failed.
        reason: String,
    },
    /// The content type is neither XML nor JSON, or none was declared.
    Unrecognized,
    /// The response had no body.
    NoBody,
}

impl Translation {
    /// Turn this outcome into the error the caller should see.
    ///
    /// A translated body becomes [`QueryError::Structured`]; every other
    /// outcome surfaces `failure` unchanged as [`QueryError::Status`].
    pub fn into_error(self, failure: HttpFailure) -> QueryError {
        match self {
            Translation::Translated { message, help } => {
                QueryError::Structured(StructuredError::new(message, help, failure))
            }
            _ => QueryError::Status(failure),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
    help: Option<String>,
}

/// Reads error bodies. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Inspect `failure` and report what could be derived from it.
    pub fn translate(failure: &HttpFailure) -> Translation {
        if !failure.has_body() {
            return Translation::NoBody;
        }

        let content_type = match failure.content_type.as_deref().and_then(ContentType::parse) {
            Some(ct) => ct,
            None => return Translation::Unrecognized,
        };

        let outcome = if content_type.is_xml() {
            Self::translate_xml(&failure.body, content_type.charset())
        } else if content_type.is_json() {
            Self::translate_json(&failure.body, content_type.charset())
        } else {
            return Translation::Unrecognized;
        };

        match outcome {
            Ok((message, help)) => Translation::Translated { message, help },
            Err(reason) => {
                tracing::warn!(
                    status = failure.status,
                    content_type = content_type.media_type(),
                    "could not read error body: {}",
                    reason
                );
                Translation::Malformed { reason }
            }
        }
    }

    /// Produce the error to raise for `failure`.
    ///
    /// Agrees with [`translate`](Self::translate) on message and help.
    pub fn raise(failure: HttpFailure) -> QueryError {
        Self::translate(&failure).into_error(failure)
    }

    fn translate_json(
        body: &[u8],
        charset: Option<&str>,
    ) -> std::result::Result<(String, Option<String>), String> {
        let text = decode_text(body, charset).map_err(|e| e.to_string())?;
        let envelope: JsonErrorEnvelope = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        match envelope.error.or(envelope.message) {
            Some(message) => Ok((message, envelope.help)),
            None => Err("json error body has no 'error' field".to_string()),
        }
    }

    fn translate_xml(
        body: &[u8],
        charset: Option<&str>,
    ) -> std::result::Result<(String, Option<String>), String> {
        let text = decode_text(body, charset).map_err(|e| e.to_string())?;
        let mut reader = Reader::from_str(&text);

        let mut path: Vec<String> = Vec::new();
        let mut messages: Vec<String> = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match reader.read_event().map_err(|e| e.to_string())? {
                Event::Start(start) => {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    path.push(name);
                    if path == XML_ERROR_PATH {
                        current = Some(String::new());
                    }
                }
                Event::End(_) => {
                    if path == XML_ERROR_PATH {
                        if let Some(message) = current.take() {
                            messages.push(message.trim().to_string());
                        }
                    }
                    path.pop();
                }
                Event::Empty(empty) => {
                    let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                    path.push(name);
                    if path == XML_ERROR_PATH {
                        messages.push(String::new());
                    }
                    path.pop();
                }
                Event::Text(content) => {
                    if let Some(message) = current.as_mut() {
                        message.push_str(&content.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Event::CData(content) => {
                    if let Some(message) = current.as_mut() {
                        message.push_str(&String::from_utf8_lossy(&content.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if messages.is_empty() {
            return Err("xml error body has no error/text element".to_string());
        }
        Ok((messages.join("\n"), None))
    }
}
