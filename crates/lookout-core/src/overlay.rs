//! The framework error-overlay watcher.
//!
//! The overlay is rendered by the host framework inside a custom
//! element (`nextjs-portal`) whose content lives in a shadow root that
//! attaches asynchronously. Watching it needs two cooperating pieces:
//!
//! - [`WatchStateMachine`] tracks whether the host element exists and
//!   whether its shadow root is being observed yet, and tells the DOM
//!   layer which side effect to perform (attach an observer, retry
//!   after a delay, disconnect). Keeping it a pure transition function
//!   makes the retry cap and teardown testable without a DOM.
//! - [`PresenceTracker`] turns "is a visible dialog there right now"
//!   snapshots into appeared/cleared transitions.
//!
//! Selector lists are data-driven so new overlay conventions can be
//! added without touching control flow.

use crate::record::{key_snippet, truncate_chars, MAX_MESSAGE_LEN};
use crate::registry::OVERLAY_PREFIX;

/// Tag name of the custom element the framework inserts for its overlay.
pub const OVERLAY_HOST_TAG: &str = "nextjs-portal";

/// Prioritized selectors identifying the error dialog, tried in order.
pub const DIALOG_SELECTORS: &[&str] = &[
    "[data-nextjs-dialog]",
    "[data-nextjs-error-overlay]",
    "#__next-build-watcher",
    "[role='dialog']",
];

/// Prioritized selectors for the dialog's header text.
pub const HEADER_SELECTORS: &[&str] = &["[data-nextjs-dialog-header]", "h1"];

/// Prioritized selectors for the dialog's body / message text.
pub const BODY_SELECTORS: &[&str] = &["[data-nextjs-dialog-body]", "[data-nextjs-error-message]"];

/// Prioritized selectors for the dialog's code-frame text.
pub const CODE_FRAME_SELECTORS: &[&str] = &["[data-nextjs-codeframe]", "pre"];

/// Fallback message when a visible dialog yields no text at all.
pub const OVERLAY_PLACEHOLDER: &str = "Next.js error overlay detected";

/// Hard cap on shadow-root polls per host instance.
pub const MAX_ROOT_ATTEMPTS: u8 = 10;

/// Fixed delay between shadow-root polls, in milliseconds.
///
/// No backoff: overlay attachment is typically near-instantaneous, so
/// a fixed short delay trades a slightly slower worst case for
/// simplicity.
pub const ROOT_POLL_DELAY_MS: i32 = 50;

/// Text fragments pulled from a visible overlay dialog.
///
/// Each field may be empty; the DOM layer fills in whatever the
/// prioritized selectors matched. `raw_text` is the dialog's full
/// rendered text, used as a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayText {
    /// Header text, usually the error title.
    pub header: String,
    /// Body / message text.
    pub body: String,
    /// Code-frame text, when the overlay shows one.
    pub code_frame: String,
    /// The dialog's full rendered text content.
    pub raw_text: String,
}

/// Builds the human-readable message for a visible overlay dialog.
///
/// Header, body, and code frame are joined with line breaks and
/// trimmed. An empty concatenation falls back to the full rendered
/// text with runs of three or more newlines collapsed to two; if that
/// is empty too, a fixed placeholder is used. The result is truncated
/// to [`MAX_MESSAGE_LEN`].
#[must_use]
pub fn extract_message(text: &OverlayText) -> String {
    let mut message = [&text.header, &text.body, &text.code_frame]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if message.is_empty() {
        message = collapse_newlines(&text.raw_text).trim().to_string();
    }
    if message.is_empty() {
        message = OVERLAY_PLACEHOLDER.to_string();
    }
    truncate_chars(&message, MAX_MESSAGE_LEN)
}

/// The dedup key for an extracted overlay message.
#[must_use]
pub fn overlay_key(message: &str) -> String {
    format!("{OVERLAY_PREFIX}{}", key_snippet(message))
}

/// Collapses runs of three or more newlines down to exactly two.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run <= 2 {
                out.push('\n');
            }
        } else {
            run = 0;
            out.push(ch);
        }
    }
    out
}

/// Where the watcher stands with respect to the overlay host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No host element present in the page.
    Idle,
    /// Host element present; its shadow root has not attached yet.
    AwaitingInnerRoot {
        /// Polls performed so far for this host instance.
        attempts: u8,
    },
    /// Shadow root attached and being observed for structural changes.
    Observing,
}

/// What the DOM layer observed about the host element right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSnapshot {
    /// No host element in the document.
    Absent,
    /// A host element exists.
    Present {
        /// True when this is a different element than the one tracked
        /// previously (the framework replaced it).
        new_instance: bool,
        /// True when the element's shadow root is attached.
        root_attached: bool,
    },
}

/// Follow-up work the DOM layer must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCue {
    /// Attach the dedicated observer to the now-available shadow root
    /// and run an immediate presence check.
    AttachInnerObserver,
    /// Poll for the shadow root again after [`ROOT_POLL_DELAY_MS`].
    RetryAfterDelay,
}

/// The full effect of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEffects {
    /// Disconnect the dedicated observer for the previous host
    /// instance before anything else.
    pub disconnect: bool,
    /// Follow-up work, if any.
    pub cue: Option<WatchCue>,
}

impl StepEffects {
    const NONE: Self = Self {
        disconnect: false,
        cue: None,
    };
}

/// Explicit state machine for overlay host tracking.
///
/// Driven by [`HostSnapshot`]s from the page-level observer and from
/// timer-driven retries; every call is a pure transition that returns
/// the side effects to perform.
#[derive(Debug, Default)]
pub struct WatchStateMachine {
    state: WatchState,
}

impl Default for WatchState {
    fn default() -> Self {
        WatchState::Idle
    }
}

impl WatchStateMachine {
    /// Creates a machine in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, for inspection.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Applies one observation and returns the effects to perform.
    pub fn step(&mut self, snapshot: HostSnapshot) -> StepEffects {
        match snapshot {
            HostSnapshot::Absent => {
                let disconnect = self.state == WatchState::Observing;
                if self.state != WatchState::Idle {
                    tracing::debug!("overlay host removed, watcher idle");
                }
                self.state = WatchState::Idle;
                StepEffects {
                    disconnect,
                    cue: None,
                }
            }
            HostSnapshot::Present {
                new_instance,
                root_attached,
            } => {
                let mut disconnect = false;
                if new_instance || self.state == WatchState::Idle {
                    // A replaced host invalidates the old observer and
                    // restarts the retry budget.
                    disconnect = self.state == WatchState::Observing;
                    self.state = WatchState::AwaitingInnerRoot { attempts: 0 };
                }

                match self.state {
                    WatchState::AwaitingInnerRoot { attempts } => {
                        if root_attached {
                            tracing::debug!("overlay shadow root attached, observing");
                            self.state = WatchState::Observing;
                            StepEffects {
                                disconnect,
                                cue: Some(WatchCue::AttachInnerObserver),
                            }
                        } else if attempts < MAX_ROOT_ATTEMPTS {
                            self.state = WatchState::AwaitingInnerRoot {
                                attempts: attempts + 1,
                            };
                            StepEffects {
                                disconnect,
                                cue: Some(WatchCue::RetryAfterDelay),
                            }
                        } else {
                            // Budget exhausted: stop polling for this
                            // host instance and rely on page-level
                            // detection for the next one.
                            tracing::debug!("shadow root poll budget exhausted");
                            StepEffects { disconnect, cue: None }
                        }
                    }
                    WatchState::Observing => StepEffects {
                        disconnect,
                        cue: None,
                    },
                    WatchState::Idle => StepEffects::NONE,
                }
            }
        }
    }
}

/// Appeared/cleared transitions derived from presence snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceOutcome {
    /// A visible dialog is showing; report under `key` unless already
    /// reported. Emitted on every check while the overlay is up, so a
    /// message change while the overlay stays visible is reported too.
    Visible {
        /// Dedup key under the `overlay:` namespace.
        key: String,
        /// The extracted message.
        message: String,
    },
    /// The overlay just transitioned from present to absent.
    Cleared,
    /// No overlay before, no overlay now.
    StillAbsent,
}

/// Overlay presence state: a boolean plus the last extracted message.
///
/// Owned exclusively by the watcher; mutated only from structural-change
/// callbacks and timer retries, so repeated invocation with the same
/// snapshot is idempotent.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    present: bool,
    last_message: Option<String>,
}

impl PresenceTracker {
    /// Creates a tracker with no overlay present.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a visible overlay was seen on the last check.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The message extracted on the most recent visible check.
    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Folds one presence check result into the tracker.
    ///
    /// `visible_dialog` is Some when a dialog element was found *and*
    /// passed the visibility check.
    pub fn observe(&mut self, visible_dialog: Option<&OverlayText>) -> PresenceOutcome {
        match visible_dialog {
            Some(text) => {
                self.present = true;
                let message = extract_message(text);
                let key = overlay_key(&message);
                self.last_message = Some(message.clone());
                PresenceOutcome::Visible { key, message }
            }
            None if self.present => {
                tracing::debug!("overlay disappeared");
                self.present = false;
                self.last_message = None;
                PresenceOutcome::Cleared
            }
            None => PresenceOutcome::StillAbsent,
        }
    }
}
