//! # lookout-web
//!
//! Browser bindings for the lookout preview-error bridge.
//!
//! Compiled to `wasm32-unknown-unknown` and loaded into a rendered
//! page, this crate installs the bridge: it hooks the global error and
//! unhandled-rejection events, patches `console.error` (forwarding to
//! the original first), watches the framework's error overlay through
//! `MutationObserver`s, and delivers deduplicated notifications to the
//! embedding parent frame over `postMessage`.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { install } from './pkg/lookout_web.js';
//!
//! await init();
//! install();
//! ```
//!
//! `install()` is idempotent per page: calling it twice leaves a single
//! set of hooks in place. After installation the bridge never throws
//! into the page; every internal failure degrades to reporting less.
//!
//! All decision logic (dedup, classification, the overlay state
//! machine) lives in `lookout-core`; this crate only moves data between
//! the DOM and a [`lookout_core::Bridge`].

mod error;
mod hooks;
mod messenger;
mod overlay;

pub use error::InstallError;
pub use hooks::{build_console_shim, format_console_arg, js_display_string};
pub use messenger::{wire_payload, PostMessageMessenger};
pub use overlay::{is_visible, probe_overlay};

use lookout_core::Bridge;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// The per-page bridge, shared into every hook closure.
///
/// Single-threaded cooperative execution: `Rc<RefCell<_>>` is all the
/// synchronization the page's event loop needs.
pub(crate) type SharedBridge = Rc<RefCell<Bridge<PostMessageMessenger>>>;

thread_local! {
    /// Install guard: one set of hooks per page, however often the
    /// module is loaded.
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
}

/// Initialize panic hook for better error messages in console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Installs the bridge into the current page.
///
/// Idempotent: a second call is a no-op returning Ok. Fails only when
/// the environment is not a browser page or a hook cannot be
/// registered; after a successful return the bridge never surfaces an
/// error again.
#[wasm_bindgen]
pub fn install() -> Result<(), JsValue> {
    try_install().map_err(Into::into)
}

fn try_install() -> Result<(), InstallError> {
    if INSTALLED.with(Cell::get) {
        return Ok(());
    }

    let window = web_sys::window().ok_or(InstallError::NoWindow)?;
    let document = window.document().ok_or(InstallError::NoDocument)?;

    let bridge: SharedBridge = Rc::new(RefCell::new(Bridge::new(PostMessageMessenger::new(
        window.clone(),
    ))));

    hooks::install_error_hooks(&window, &bridge)?;
    hooks::install_console_hook(&bridge)?;
    hooks::install_lifecycle_hooks(&window, &document, &bridge)?;
    overlay::install_overlay_watcher(&window, &document, &bridge)?;

    INSTALLED.with(|flag| flag.set(true));
    tracing::debug!("preview-error bridge installed");
    Ok(())
}
