//! Error records and the outbound wire envelopes.
//!
//! These types define the protocol the bridge speaks to its embedding
//! host. Field names and tag values are part of the protocol and must
//! not change: the host discriminates on the `type` tag.

use serde::{Deserialize, Serialize};

/// Maximum characters kept in any transmitted message.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Characters of a message used when building a dedup key.
pub const KEY_SNIPPET_LEN: usize = 100;

/// Which signal source produced an [`ErrorRecord`].
///
/// Serialized values are wire-protocol strings; the overlay kind keeps
/// its historical `nextjs-overlay` name on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A thrown error surfaced through the page's global `error` event.
    #[serde(rename = "runtime")]
    Runtime,
    /// An unhandled promise rejection.
    #[serde(rename = "unhandled-rejection")]
    UnhandledRejection,
    /// An intercepted `console.error` call classified as error-worthy.
    #[serde(rename = "console-error")]
    ConsoleError,
    /// The framework's development-time error overlay became visible.
    #[serde(rename = "nextjs-overlay")]
    Overlay,
}

impl ErrorKind {
    /// The wire-protocol string for this kind.
    #[must_use]
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ErrorKind::Runtime => "runtime",
            ErrorKind::UnhandledRejection => "unhandled-rejection",
            ErrorKind::ConsoleError => "console-error",
            ErrorKind::Overlay => "nextjs-overlay",
        }
    }
}

/// A normalized description of one observed problem.
///
/// Immutable once constructed; the message is truncated to
/// [`MAX_MESSAGE_LEN`] at construction time, before transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable message, truncated to [`MAX_MESSAGE_LEN`].
    pub message: String,

    /// Originating file, when the signal source knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// 1-based line number within `filename`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,

    /// 1-based column number within `filename`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,

    /// Stack trace text, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    /// Signal source, serialized as the wire `type` field.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl ErrorRecord {
    /// Creates a record with only a message and kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: truncate_chars(&message.into(), MAX_MESSAGE_LEN),
            filename: None,
            lineno: None,
            colno: None,
            stack: None,
            kind,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(
        mut self,
        filename: Option<String>,
        lineno: Option<u32>,
        colno: Option<u32>,
    ) -> Self {
        self.filename = filename;
        self.lineno = lineno;
        self.colno = colno;
        self
    }

    /// Attaches a stack trace.
    #[must_use]
    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }
}

/// One outbound message to the embedding host.
///
/// Internally tagged on `type` so serialization produces exactly the
/// shapes the host expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// A deduplicated error observation.
    #[serde(rename = "PREVIEW_ERROR")]
    ErrorReported {
        /// The normalized record.
        error: ErrorRecord,
    },

    /// A previously-reported error source went away.
    #[serde(rename = "PREVIEW_ERROR_CLEAR")]
    ErrorCleared {
        /// Which source cleared. Currently always the overlay.
        #[serde(rename = "errorType")]
        error_type: String,
    },

    /// The page finished loading. Sent at most once per page lifetime.
    #[serde(rename = "PREVIEW_READY")]
    Ready,
}

impl Envelope {
    /// Builds the clear envelope for `kind`.
    #[must_use]
    pub fn cleared(kind: ErrorKind) -> Self {
        Envelope::ErrorCleared {
            error_type: kind.as_wire_str().to_string(),
        }
    }
}

/// Truncates `text` to at most `max` characters, on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// The first [`KEY_SNIPPET_LEN`] characters of `text`, for key building.
#[must_use]
pub fn key_snippet(text: &str) -> String {
    truncate_chars(text, KEY_SNIPPET_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_envelope_wire_shape() {
        let record = ErrorRecord::new(ErrorKind::Runtime, "boom")
            .with_location(Some("app.js".into()), Some(3), Some(7))
            .with_stack(Some("Error: boom\n    at app.js:3:7".into()));
        let envelope = Envelope::ErrorReported { error: record };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "PREVIEW_ERROR",
                "error": {
                    "message": "boom",
                    "filename": "app.js",
                    "lineno": 3,
                    "colno": 7,
                    "stack": "Error: boom\n    at app.js:3:7",
                    "type": "runtime",
                }
            })
        );
    }

    #[test]
    fn absent_fields_are_omitted() {
        let envelope = Envelope::ErrorReported {
            error: ErrorRecord::new(ErrorKind::ConsoleError, "Failed to fetch"),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "PREVIEW_ERROR",
                "error": { "message": "Failed to fetch", "type": "console-error" }
            })
        );
    }

    #[test]
    fn clear_envelope_wire_shape() {
        let value = serde_json::to_value(Envelope::cleared(ErrorKind::Overlay)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "PREVIEW_ERROR_CLEAR", "errorType": "nextjs-overlay" })
        );
    }

    #[test]
    fn ready_envelope_wire_shape() {
        let value = serde_json::to_value(Envelope::Ready).unwrap();
        assert_eq!(value, json!({ "type": "PREVIEW_READY" }));
    }

    #[test]
    fn message_is_truncated_at_construction() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 500);
        let record = ErrorRecord::new(ErrorKind::Overlay, long);
        assert_eq!(record.message.chars().count(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let text = "é".repeat(10);
        assert_eq!(truncate_chars(&text, 4), "éééé");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
