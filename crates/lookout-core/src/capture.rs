//! Normalization and classification of captured signals.
//!
//! The browser side hands raw event data to these functions; each one
//! either produces a `(dedup key, ErrorRecord)` pair or decides the
//! signal is ignorable noise. Nothing here touches the registry or the
//! messenger; that sequencing lives in [`crate::bridge`], which keeps
//! these rules independently testable.

use crate::record::{key_snippet, ErrorKind, ErrorRecord};
use crate::registry::{CONSOLE_PREFIX, RUNTIME_PREFIX};

/// Filename fragment identifying browser-extension-injected scripts.
///
/// Matches both `chrome-extension://` and `moz-extension://` origins.
const EXTENSION_ORIGIN_MARKER: &str = "extension://";

/// The cross-engine placeholder message for opaque cross-origin errors.
const OPAQUE_CROSS_ORIGIN_MESSAGE: &str = "Script error.";

/// Substrings that flag a console message as error-worthy.
const ERROR_MARKERS: &[&str] = &["Error", "Uncaught", "Invalid", "Failed", "Cannot"];

/// Substrings that mark framework-internal diagnostics, which are
/// development-mode noise rather than real defects.
const NOISE_MARKERS: &[&str] = &[
    "Warning:",
    "React does not recognize",
    "validateDOMNesting",
];

/// Raw data from the page's global `error` event.
#[derive(Debug, Clone, Default)]
pub struct RuntimeErrorEvent {
    /// The event's message, if any.
    pub message: Option<String>,
    /// Script URL the error originated from, if known.
    pub filename: Option<String>,
    /// Line number within `filename`.
    pub lineno: Option<u32>,
    /// Column number within `filename`.
    pub colno: Option<u32>,
    /// Stack trace from the underlying error object, if present.
    pub stack: Option<String>,
}

/// Raw data from the global `unhandledrejection` event.
///
/// The caller extracts the reason's `message` property when one exists,
/// else string-coerces the reason; either way `message` arrives here as
/// plain text.
#[derive(Debug, Clone, Default)]
pub struct RejectionEvent {
    /// Message text extracted from the rejection reason.
    pub message: Option<String>,
    /// Stack trace from the rejection reason, if present.
    pub stack: Option<String>,
}

/// Normalizes a runtime error event, or returns None for ignorable noise.
///
/// Filter rules run before deduplication: extension-origin scripts are
/// discarded, and the opaque `"Script error."` placeholder is discarded
/// when no originating file is known (the real detail is unavailable
/// cross-origin, so the report would not be actionable).
#[must_use]
pub fn normalize_runtime(event: RuntimeErrorEvent) -> Option<(String, ErrorRecord)> {
    if let Some(filename) = event.filename.as_deref() {
        if filename.contains(EXTENSION_ORIGIN_MARKER) {
            tracing::trace!(filename, "ignoring extension-origin error");
            return None;
        }
    }

    let message = event.message.as_deref().unwrap_or("");
    if message == OPAQUE_CROSS_ORIGIN_MESSAGE && event.filename.is_none() {
        tracing::trace!("ignoring opaque cross-origin error");
        return None;
    }

    let message = if message.is_empty() {
        "Unknown error".to_string()
    } else {
        message.to_string()
    };

    let key = format!(
        "{RUNTIME_PREFIX}{message}:{}:{}",
        event.lineno.unwrap_or(0),
        event.colno.unwrap_or(0)
    );
    let record = ErrorRecord::new(ErrorKind::Runtime, message)
        .with_location(event.filename, event.lineno, event.colno)
        .with_stack(event.stack);
    Some((key, record))
}

/// Normalizes an unhandled rejection event.
///
/// The dedup key is the message text itself; rejections carry no
/// location information.
#[must_use]
pub fn normalize_rejection(event: RejectionEvent) -> (String, ErrorRecord) {
    let message = match event.message {
        Some(m) if !m.is_empty() => m,
        _ => "Unknown rejection".to_string(),
    };
    let record = ErrorRecord::new(ErrorKind::UnhandledRejection, message.clone())
        .with_stack(event.stack);
    (message, record)
}

/// Joins already-coerced console arguments with single spaces.
///
/// The caller converts each argument to text first (strings pass
/// through, other values are JSON-serialized with a string-coercion
/// fallback); this keeps the join rule in one place.
#[must_use]
pub fn format_console_message(parts: &[String]) -> String {
    parts.join(" ")
}

/// Returns true if a formatted console message should be reported.
///
/// A message is error-worthy when it contains one of the error markers
/// and none of the framework-diagnostic noise markers.
#[must_use]
pub fn is_error_worthy(message: &str) -> bool {
    let flagged = ERROR_MARKERS.iter().any(|m| message.contains(m));
    if !flagged {
        return false;
    }
    if NOISE_MARKERS.iter().any(|m| message.contains(m)) {
        tracing::trace!("suppressing framework-diagnostic console message");
        return false;
    }
    true
}

/// Normalizes a formatted console message, or None when not error-worthy.
#[must_use]
pub fn normalize_console(formatted: &str) -> Option<(String, ErrorRecord)> {
    if !is_error_worthy(formatted) {
        return None;
    }
    let key = format!("{CONSOLE_PREFIX}{}", key_snippet(formatted));
    let record = ErrorRecord::new(ErrorKind::ConsoleError, formatted);
    Some((key, record))
}
