//! # lookout-core
//!
//! Platform-independent core of the lookout preview-error bridge.
//!
//! The bridge is injected into a rendered page so an embedding host (a
//! parent frame showing the page in an iframe, e.g. a live-preview
//! tool) learns about runtime errors, unhandled promise rejections,
//! console-logged errors, and the framework's development-time error
//! overlay, without touching the page's application code. This crate
//! holds everything that does not need a DOM:
//!
//! - **[`registry`]**: page-lifetime dedup of signal keys
//! - **[`record`]**: normalized error records and the wire envelopes
//! - **[`messenger`]**: the fire-and-forget delivery seam
//! - **[`capture`]**: normalization and noise filtering for the three
//!   native signal sources
//! - **[`overlay`]**: the overlay-watcher state machine, selector
//!   tables, and message extraction
//! - **[`ready`]**: the one-shot load latch
//! - **[`bridge`]**: the owned aggregate tying it all together
//!
//! The browser half lives in `lookout-web`, which feeds DOM events into
//! a [`bridge::Bridge`] and delivers envelopes over `postMessage`.
//!
//! ## Design principles
//!
//! 1. **Degrade, never break**: a dropped notification is lost, not
//!    retried; the bridge must never throw into the page it observes.
//! 2. **Single-threaded**: all state is driven from the page's event
//!    loop; no locks, no `Send` bounds.
//! 3. **Explicit state**: the dedup registry, presence flag, and ready
//!    latch are fields of one owned [`bridge::Bridge`], not globals.

pub mod bridge;
pub mod capture;
pub mod messenger;
pub mod overlay;
pub mod ready;
pub mod record;
pub mod registry;

pub use bridge::Bridge;
pub use capture::{RejectionEvent, RuntimeErrorEvent};
pub use messenger::Messenger;
pub use overlay::{HostSnapshot, OverlayText, StepEffects, WatchCue, WatchStateMachine};
pub use record::{Envelope, ErrorKind, ErrorRecord};
