//! `postMessage` delivery to the embedding host.

use lookout_core::{Envelope, Messenger};
use serde::Serialize;
use web_sys::Window;

/// Delivers envelopes to `window.parent` with a wildcard target origin.
///
/// The preview relationship is same-origin-agnostic, so no
/// target-origin restriction is applied. Every failure mode (absent
/// parent, sandboxed frame, a throwing `postMessage`, serialization)
/// is swallowed: a dropped notification is simply lost.
#[derive(Debug, Clone)]
pub struct PostMessageMessenger {
    window: Window,
}

impl PostMessageMessenger {
    /// Creates a messenger posting from `window` to its parent.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl Messenger for PostMessageMessenger {
    fn notify(&self, envelope: &Envelope) {
        let Some(payload) = wire_payload(envelope) else {
            return;
        };
        // At the top level window.parent is the window itself; posting
        // there is harmless and keeps the hot path branch-free.
        if let Ok(Some(parent)) = self.window.parent() {
            let _ = parent.post_message(&payload, "*");
        }
    }
}

/// Serializes an envelope into the JS value that goes over the wire.
///
/// Uses the JSON-compatible serializer so the payload is a plain
/// object tree; the default serializer would emit ES Maps, which the
/// host's message handlers do not speak.
#[must_use]
pub fn wire_payload(envelope: &Envelope) -> Option<wasm_bindgen::JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    envelope.serialize(&serializer).ok()
}
