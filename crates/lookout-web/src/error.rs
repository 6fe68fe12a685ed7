//! Installation errors.
//!
//! Installation is the only fallible surface of the bridge: once the
//! hooks are in place, every later failure (formatting, delivery) is
//! swallowed so the host page keeps running. These errors cross the
//! WASM boundary as JavaScript `Error` objects.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Why the bridge could not be installed into the current page.
#[derive(Debug, Error)]
pub enum InstallError {
    /// No global `window` object. The module is probably running in a
    /// worker or a non-browser host.
    #[error("no global window object (not running in a browser page)")]
    NoWindow,

    /// The window has no document attached.
    #[error("window has no document")]
    NoDocument,

    /// Replacing `console.error` with the intercepting wrapper failed.
    #[error("failed to patch console.error: {0}")]
    ConsolePatch(String),

    /// Registering a listener or observer failed.
    #[error("failed to install {hook} hook: {detail}")]
    Hook {
        /// Which hook was being installed.
        hook: &'static str,
        /// Browser-reported detail.
        detail: String,
    },
}

impl InstallError {
    /// Builds a [`InstallError::Hook`] from a thrown `JsValue`.
    pub(crate) fn hook(hook: &'static str, thrown: &JsValue) -> Self {
        InstallError::Hook {
            hook,
            detail: js_detail(thrown),
        }
    }
}

impl From<InstallError> for JsValue {
    fn from(err: InstallError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

/// Best-effort human-readable text for a thrown `JsValue`.
pub(crate) fn js_detail(thrown: &JsValue) -> String {
    if let Some(text) = thrown.as_string() {
        return text;
    }
    js_sys::Object::try_from(thrown)
        .map(|obj| String::from(obj.to_string()))
        .unwrap_or_else(|| "unknown error".to_string())
}
