//! Global signal hooks: error events, rejections, the console patch,
//! and lifecycle wiring.
//!
//! Hook closures live for the whole page, so they are intentionally
//! leaked with `Closure::forget` after registration. All of them guard
//! the shared bridge with `try_borrow_mut`: if a callback somehow
//! re-enters while the bridge is borrowed, the signal is dropped
//! instead of panicking into the host page.

use crate::error::InstallError;
use crate::SharedBridge;
use lookout_core::capture::format_console_message;
use lookout_core::{RejectionEvent, RuntimeErrorEvent};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Window};

/// Registers the runtime-error and unhandled-rejection listeners.
pub(crate) fn install_error_hooks(
    window: &Window,
    bridge: &SharedBridge,
) -> Result<(), InstallError> {
    let on_error = {
        let bridge = SharedBridge::clone(bridge);
        Closure::<dyn FnMut(web_sys::ErrorEvent)>::new(move |event: web_sys::ErrorEvent| {
            let signal = RuntimeErrorEvent {
                message: non_empty(event.message()),
                filename: non_empty(event.filename()),
                lineno: Some(event.lineno()),
                colno: Some(event.colno()),
                stack: stack_of(&event.error()),
            };
            if let Ok(mut bridge) = bridge.try_borrow_mut() {
                bridge.report_runtime_error(signal);
            }
        })
    };
    window
        .add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())
        .map_err(|e| InstallError::hook("error", &e))?;
    on_error.forget();

    let on_rejection = {
        let bridge = SharedBridge::clone(bridge);
        Closure::<dyn FnMut(web_sys::PromiseRejectionEvent)>::new(
            move |event: web_sys::PromiseRejectionEvent| {
                let reason = event.reason();
                let signal = RejectionEvent {
                    message: rejection_message(&reason),
                    stack: stack_of(&reason),
                };
                if let Ok(mut bridge) = bridge.try_borrow_mut() {
                    bridge.report_rejection(signal);
                }
            },
        )
    };
    window
        .add_event_listener_with_callback("unhandledrejection", on_rejection.as_ref().unchecked_ref())
        .map_err(|e| InstallError::hook("unhandledrejection", &e))?;
    on_rejection.forget();

    Ok(())
}

/// Builds the variadic function that replaces `console.error`.
///
/// The shim is assembled in JavaScript because it must accept any
/// number of arguments. It forwards the full argument list to the
/// original logger before anything else, then hands the same list to
/// `capture` as a single `Array`. The shim holds the original, never
/// itself, so the capture path cannot recurse, and a throwing capture
/// never suppresses the log line.
pub fn build_console_shim(
    original: &js_sys::Function,
    capture: &js_sys::Function,
) -> Result<js_sys::Function, JsValue> {
    let factory = js_sys::Function::new_with_args(
        "original, capture",
        "return function () {\n\
             var args = Array.prototype.slice.call(arguments);\n\
             original.apply(this, args);\n\
             try { capture(args); } catch (e) {}\n\
         };",
    );
    factory.call2(&JsValue::NULL, original, capture)?.dyn_into()
}

/// Replaces `console.error` with a wrapper that forwards every
/// argument to the original first, then classifies the message
/// formatted from all of them.
pub(crate) fn install_console_hook(bridge: &SharedBridge) -> Result<(), InstallError> {
    let console = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("console"))
        .map_err(|e| InstallError::ConsolePatch(crate::error::js_detail(&e)))?;
    let original: js_sys::Function =
        js_sys::Reflect::get(&console, &JsValue::from_str("error"))
            .map_err(|e| InstallError::ConsolePatch(crate::error::js_detail(&e)))?
            .dyn_into()
            .map_err(|_| InstallError::ConsolePatch("console.error is not a function".into()))?;

    let capture = {
        let bridge = SharedBridge::clone(bridge);
        Closure::<dyn FnMut(js_sys::Array)>::new(move |args: js_sys::Array| {
            let parts: Vec<String> = args.iter().map(|arg| format_console_arg(&arg)).collect();
            let formatted = format_console_message(&parts);
            if let Ok(mut bridge) = bridge.try_borrow_mut() {
                bridge.report_console(&formatted);
            }
        })
    };
    let patched = build_console_shim(&original, capture.as_ref().unchecked_ref())
        .map_err(|e| InstallError::ConsolePatch(crate::error::js_detail(&e)))?;
    js_sys::Reflect::set(&console, &JsValue::from_str("error"), &patched)
        .map_err(|e| InstallError::ConsolePatch(crate::error::js_detail(&e)))?;
    capture.forget();

    Ok(())
}

/// Wires the ready signal and the navigation-boundary reset.
///
/// Ready fires on whichever comes first: the document already being
/// complete here, or the later `load` event. The reset runs only on
/// `beforeunload`, i.e. a full page teardown; client-side soft
/// navigations do not reach it.
pub(crate) fn install_lifecycle_hooks(
    window: &Window,
    document: &Document,
    bridge: &SharedBridge,
) -> Result<(), InstallError> {
    let on_unload = {
        let bridge = SharedBridge::clone(bridge);
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
            if let Ok(mut bridge) = bridge.try_borrow_mut() {
                bridge.reset();
            }
        })
    };
    window
        .add_event_listener_with_callback("beforeunload", on_unload.as_ref().unchecked_ref())
        .map_err(|e| InstallError::hook("beforeunload", &e))?;
    on_unload.forget();

    if document.ready_state() == "complete" {
        if let Ok(mut bridge) = bridge.try_borrow_mut() {
            bridge.document_ready();
        }
    }
    // Registered unconditionally: the one-shot latch makes the second
    // arming path a no-op, which settles the startup race.
    let on_load = {
        let bridge = SharedBridge::clone(bridge);
        Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
            if let Ok(mut bridge) = bridge.try_borrow_mut() {
                bridge.document_ready();
            }
        })
    };
    window
        .add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())
        .map_err(|e| InstallError::hook("load", &e))?;
    on_load.forget();

    Ok(())
}

/// Formats one console argument as text.
///
/// Strings pass through untouched; everything else is JSON-serialized,
/// falling back to plain string coercion when serialization throws
/// (circular structures, exotic objects).
#[must_use]
pub fn format_console_arg(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if value.is_object() {
        if let Ok(json) = js_sys::JSON::stringify(value) {
            if let Some(text) = json.as_string() {
                return text;
            }
        }
    }
    js_display_string(value)
}

/// Plain string coercion of any `JsValue`, never throwing.
#[must_use]
pub fn js_display_string(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if value.is_undefined() {
        return "undefined".to_string();
    }
    if value.is_null() {
        return "null".to_string();
    }
    match js_sys::Object::try_from(value) {
        Some(obj) => String::from(obj.to_string()),
        // Numbers, booleans, bigints stringify cleanly.
        None => js_sys::JSON::stringify(value)
            .ok()
            .and_then(|s| s.as_string())
            .unwrap_or_default(),
    }
}

/// The rejection reason's `message` property when it has one.
fn rejection_message(reason: &JsValue) -> Option<String> {
    if reason.is_null() || reason.is_undefined() {
        return None;
    }
    let from_property = js_sys::Reflect::get(reason, &JsValue::from_str("message"))
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty());
    from_property.or_else(|| non_empty(js_display_string(reason)))
}

/// The `stack` property of an error-like value, if present.
fn stack_of(value: &JsValue) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str("stack"))
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
