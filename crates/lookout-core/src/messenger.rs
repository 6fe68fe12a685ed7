//! Outbound delivery seam.
//!
//! The bridge never learns whether a notification arrived. Delivery is
//! fire-and-forget: implementations must swallow every failure (absent
//! parent, sandboxing, a throwing post) so the host page keeps running.

use crate::record::Envelope;

/// Fire-and-forget notifier toward the embedding host.
///
/// `notify` is infallible by contract: a dropped notification is simply
/// lost. The consumer is a live developer-facing preview, not an audit
/// log.
pub trait Messenger {
    /// Delivers `envelope` on a best-effort basis.
    fn notify(&self, envelope: &Envelope);
}

/// In-memory messenger that records every envelope, for tests.
///
/// Interior mutability keeps the `notify(&self)` contract while letting
/// tests inspect what was sent.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: std::cell::RefCell<Vec<Envelope>>,
}

impl RecordingMessenger {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.borrow().clone()
    }

    /// Number of envelopes sent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    /// Returns true if nothing was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

impl Messenger for RecordingMessenger {
    fn notify(&self, envelope: &Envelope) {
        self.sent.borrow_mut().push(envelope.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_messenger_preserves_order() {
        let messenger = RecordingMessenger::new();
        messenger.notify(&Envelope::Ready);
        messenger.notify(&Envelope::cleared(crate::record::ErrorKind::Overlay));

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Envelope::Ready);
        assert!(matches!(sent[1], Envelope::ErrorCleared { .. }));
    }
}
