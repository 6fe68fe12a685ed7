//! DOM wiring for the overlay watcher.
//!
//! The framework renders its error overlay inside a `nextjs-portal`
//! custom element whose shadow root attaches asynchronously. A
//! page-level `MutationObserver` notices the host element coming and
//! going; the core [`WatchStateMachine`] decides what to do about it
//! (poll for the shadow root on a fixed 50 ms delay, attach a dedicated
//! observer, disconnect); and every structural change triggers an
//! idempotent presence check that feeds the bridge.

use crate::error::InstallError;
use crate::SharedBridge;
use lookout_core::overlay::{
    BODY_SELECTORS, CODE_FRAME_SELECTORS, DIALOG_SELECTORS, HEADER_SELECTORS, OVERLAY_HOST_TAG,
    ROOT_POLL_DELAY_MS,
};
use lookout_core::{HostSnapshot, OverlayText, WatchCue, WatchStateMachine};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, MutationObserver, MutationObserverInit, ShadowRoot, Window,
};

/// Watch handles and the state machine for one page.
///
/// Shared into the observer and timer closures via `Rc`; the resulting
/// reference cycle is deliberate, since the watcher lives exactly as
/// long as the page.
pub(crate) struct OverlayWatcher {
    window: Window,
    document: Document,
    bridge: SharedBridge,
    machine: RefCell<WatchStateMachine>,
    tracked_host: RefCell<Option<Element>>,
    inner_observer: RefCell<Option<MutationObserver>>,
    inner_callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

/// Builds the watcher and starts page-level observation.
pub(crate) fn install_overlay_watcher(
    window: &Window,
    document: &Document,
    bridge: &SharedBridge,
) -> Result<(), InstallError> {
    let watcher = Rc::new(OverlayWatcher {
        window: window.clone(),
        document: document.clone(),
        bridge: SharedBridge::clone(bridge),
        machine: RefCell::new(WatchStateMachine::new()),
        tracked_host: RefCell::new(None),
        inner_observer: RefCell::new(None),
        inner_callback: RefCell::new(None),
    });

    watcher.observe_body_when_ready();
    watcher.sync_host();

    if document.ready_state() == "complete" {
        watcher.check_presence();
    } else {
        let deferred = Rc::clone(&watcher);
        let on_load = Closure::once_into_js(move || deferred.check_presence());
        window
            .add_event_listener_with_callback("load", on_load.unchecked_ref())
            .map_err(|e| InstallError::hook("overlay load", &e))?;
    }

    Ok(())
}

impl OverlayWatcher {
    /// Attaches the page-level observer to `document.body`, polling
    /// until the body exists (the bridge installs before the parser
    /// reaches `<body>` when injected early).
    fn observe_body_when_ready(self: &Rc<Self>) {
        let Some(body) = self.document.body() else {
            let watcher = Rc::clone(self);
            let retry = Closure::once_into_js(move || watcher.observe_body_when_ready());
            let _ = self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(
                    retry.unchecked_ref(),
                    ROOT_POLL_DELAY_MS,
                );
            return;
        };

        let callback = {
            let watcher = Rc::clone(self);
            Closure::<dyn FnMut()>::new(move || {
                watcher.sync_host();
                watcher.check_presence();
            })
        };
        if let Ok(observer) = MutationObserver::new(callback.as_ref().unchecked_ref()) {
            let init = MutationObserverInit::new();
            init.set_child_list(true);
            init.set_subtree(true);
            if observer.observe_with_options(&body, &init).is_err() {
                tracing::debug!("page-level overlay observer failed to attach");
            }
        }
        callback.forget();
    }

    /// Reconciles the tracked host element with what the document
    /// actually contains, then performs whatever the state machine
    /// asks for.
    fn sync_host(self: &Rc<Self>) {
        let host = self
            .document
            .query_selector(OVERLAY_HOST_TAG)
            .ok()
            .flatten();

        let snapshot = match &host {
            None => {
                self.tracked_host.replace(None);
                HostSnapshot::Absent
            }
            Some(element) => {
                let new_instance = self.tracked_host.borrow().as_ref() != Some(element);
                if new_instance {
                    self.tracked_host.replace(Some(element.clone()));
                }
                HostSnapshot::Present {
                    new_instance,
                    root_attached: element.shadow_root().is_some(),
                }
            }
        };

        let effects = self.machine.borrow_mut().step(snapshot);
        if effects.disconnect {
            self.disconnect_inner();
        }
        match effects.cue {
            Some(WatchCue::AttachInnerObserver) => {
                if let Some(root) = host.as_ref().and_then(Element::shadow_root) {
                    self.attach_inner(&root);
                    self.check_presence();
                }
            }
            Some(WatchCue::RetryAfterDelay) => self.schedule_root_poll(),
            None => {}
        }
    }

    /// Attaches the dedicated observer to the shadow root.
    fn attach_inner(self: &Rc<Self>, root: &ShadowRoot) {
        let callback = {
            let watcher = Rc::clone(self);
            Closure::<dyn FnMut()>::new(move || watcher.check_presence())
        };
        if let Ok(observer) = MutationObserver::new(callback.as_ref().unchecked_ref()) {
            let init = MutationObserverInit::new();
            init.set_child_list(true);
            init.set_subtree(true);
            init.set_character_data(true);
            init.set_attributes(true);
            if observer.observe_with_options(root, &init).is_ok() {
                self.inner_observer.replace(Some(observer));
                self.inner_callback.replace(Some(callback));
                return;
            }
        }
        // Attachment failed: the page-level observer still covers the
        // main document.
        tracing::debug!("dedicated overlay observer failed to attach");
    }

    /// Disconnects and drops the dedicated observer.
    fn disconnect_inner(&self) {
        if let Some(observer) = self.inner_observer.replace(None) {
            observer.disconnect();
        }
        self.inner_callback.replace(None);
    }

    /// Schedules the next shadow-root poll on the fixed delay.
    fn schedule_root_poll(self: &Rc<Self>) {
        let watcher = Rc::clone(self);
        let poll = Closure::once_into_js(move || watcher.sync_host());
        let _ = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                poll.unchecked_ref(),
                ROOT_POLL_DELAY_MS,
            );
    }

    /// One idempotent presence check, fed into the bridge.
    fn check_presence(&self) {
        let shadow = self
            .tracked_host
            .borrow()
            .as_ref()
            .and_then(|el| el.shadow_root());
        let found = probe_overlay(&self.window, &self.document, shadow.as_ref());
        if let Ok(mut bridge) = self.bridge.try_borrow_mut() {
            bridge.check_overlay(found.as_ref());
        }
    }
}

/// Searches for a visible overlay dialog and collects its text.
///
/// The shadow root is searched first when attached, then the main
/// document as fallback. A dialog that exists in markup but is not
/// actually shown does not count as present.
#[must_use]
pub fn probe_overlay(
    window: &Window,
    document: &Document,
    shadow: Option<&ShadowRoot>,
) -> Option<OverlayText> {
    let dialog = find_dialog(document, shadow)?;
    if !is_visible(window, &dialog) {
        return None;
    }
    Some(collect_text(&dialog))
}

/// Tries the prioritized dialog selectors, shadow root first.
fn find_dialog(document: &Document, shadow: Option<&ShadowRoot>) -> Option<Element> {
    if let Some(root) = shadow {
        for selector in DIALOG_SELECTORS {
            if let Ok(Some(element)) = root.query_selector(selector) {
                return Some(element);
            }
        }
    }
    for selector in DIALOG_SELECTORS {
        if let Ok(Some(element)) = document.query_selector(selector) {
            return Some(element);
        }
    }
    None
}

/// Computed-style and box check for actual visibility.
#[must_use]
pub fn is_visible(window: &Window, element: &Element) -> bool {
    if let Ok(Some(style)) = window.get_computed_style(element) {
        if style
            .get_property_value("display")
            .is_ok_and(|v| v == "none")
        {
            return false;
        }
        if style
            .get_property_value("visibility")
            .is_ok_and(|v| v == "hidden")
        {
            return false;
        }
        if style.get_property_value("opacity").is_ok_and(|v| v == "0") {
            return false;
        }
    }
    let rect = element.get_bounding_client_rect();
    rect.width() > 0.0 || rect.height() > 0.0
}

/// Pulls the structured text fragments out of a dialog element.
fn collect_text(dialog: &Element) -> OverlayText {
    OverlayText {
        header: first_text(dialog, HEADER_SELECTORS),
        body: first_text(dialog, BODY_SELECTORS),
        code_frame: first_text(dialog, CODE_FRAME_SELECTORS),
        raw_text: rendered_text(dialog),
    }
}

/// Text content of the first selector that matches with non-blank text.
fn first_text(scope: &Element, selectors: &[&str]) -> String {
    for selector in selectors {
        if let Ok(Some(element)) = scope.query_selector(selector) {
            if let Some(text) = element.text_content() {
                if !text.trim().is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

/// The dialog's rendered text, preferring `innerText` (which respects
/// layout) over raw `textContent`.
fn rendered_text(element: &Element) -> String {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        let text = html.inner_text();
        if !text.is_empty() {
            return text;
        }
    }
    element.text_content().unwrap_or_default()
}
