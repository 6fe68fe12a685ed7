//! The bridge aggregate: one owned state object per page.
//!
//! All mutable page-lifetime state (dedup registry, overlay presence,
//! ready latch) lives here, constructed once and passed by reference
//! into the platform layer, rather than sitting in ambient globals.
//! Execution is single-threaded cooperative, so no locking is needed;
//! the platform layer wraps the bridge in whatever cell type its event
//! callbacks require.

use crate::capture::{
    normalize_console, normalize_rejection, normalize_runtime, RejectionEvent, RuntimeErrorEvent,
};
use crate::messenger::Messenger;
use crate::overlay::{OverlayText, PresenceOutcome, PresenceTracker};
use crate::record::{Envelope, ErrorKind, ErrorRecord};
use crate::registry::{DedupRegistry, OVERLAY_PREFIX};
use crate::ready::ReadyLatch;

/// Per-page bridge state and the entry points for every signal source.
#[derive(Debug)]
pub struct Bridge<M: Messenger> {
    messenger: M,
    registry: DedupRegistry,
    ready: ReadyLatch,
    presence: PresenceTracker,
}

impl<M: Messenger> Bridge<M> {
    /// Creates a bridge delivering through `messenger`.
    #[must_use]
    pub fn new(messenger: M) -> Self {
        Self {
            messenger,
            registry: DedupRegistry::new(),
            ready: ReadyLatch::new(),
            presence: PresenceTracker::new(),
        }
    }

    /// The messenger, for inspection in tests.
    #[must_use]
    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// Handles a global runtime error event.
    pub fn report_runtime_error(&mut self, event: RuntimeErrorEvent) {
        if let Some((key, record)) = normalize_runtime(event) {
            self.report_if_new(key, record);
        }
    }

    /// Handles a global unhandled-rejection event.
    pub fn report_rejection(&mut self, event: RejectionEvent) {
        let (key, record) = normalize_rejection(event);
        self.report_if_new(key, record);
    }

    /// Handles one intercepted, already-formatted console message.
    ///
    /// The caller has already invoked the original console function;
    /// this path is purely observational.
    pub fn report_console(&mut self, formatted: &str) {
        if let Some((key, record)) = normalize_console(formatted) {
            self.report_if_new(key, record);
        }
    }

    /// Folds one overlay presence check into the bridge.
    ///
    /// `visible_dialog` is Some when a dialog element was found and is
    /// actually visible. Idempotent under repeated invocation with the
    /// same snapshot, so batched mutation callbacks are safe.
    pub fn check_overlay(&mut self, visible_dialog: Option<&OverlayText>) {
        match self.presence.observe(visible_dialog) {
            PresenceOutcome::Visible { key, message } => {
                let record = ErrorRecord::new(ErrorKind::Overlay, message);
                self.report_if_new(key, record);
            }
            PresenceOutcome::Cleared => {
                // Purge so a recurring identical error is reported
                // again after a fix-then-break cycle.
                self.registry.clear_namespace(OVERLAY_PREFIX);
                self.messenger.notify(&Envelope::cleared(ErrorKind::Overlay));
            }
            PresenceOutcome::StillAbsent => {}
        }
    }

    /// Signals that the document finished loading.
    ///
    /// Safe to call from both startup paths; only the first call per
    /// page lifetime notifies.
    pub fn document_ready(&mut self) {
        if self.ready.fire() {
            tracing::debug!("preview ready");
            self.messenger.notify(&Envelope::Ready);
        }
    }

    /// Resets all page-lifetime state at the navigation boundary.
    ///
    /// Keys from the previous page are meaningless afterwards. Wired to
    /// the full-page teardown event only; soft navigations intentionally
    /// do not reach this.
    pub fn reset(&mut self) {
        self.registry.reset_all();
        self.ready.reset();
        self.presence = PresenceTracker::new();
    }

    fn report_if_new(&mut self, key: String, record: ErrorRecord) {
        if self.registry.has_reported(&key) {
            tracing::trace!(key = %key, "suppressing duplicate report");
            return;
        }
        self.registry.mark_reported(key);
        self.messenger.notify(&Envelope::ErrorReported { error: record });
    }
}
