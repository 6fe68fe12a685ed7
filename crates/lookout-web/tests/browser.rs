//! Browser-environment tests for the DOM side of the bridge.
//!
//! These run in a real browser (`wasm-pack test --headless --chrome`)
//! and exercise the pieces that need layout and shadow DOM: the overlay
//! probe, visibility filtering, and console argument formatting.

use lookout_core::capture::format_console_message;
use lookout_core::overlay::{extract_message, OVERLAY_PLACEHOLDER};
use lookout_core::{Envelope, ErrorKind, ErrorRecord, Messenger};
use lookout_web::{
    build_console_shim, format_console_arg, install, is_visible, js_display_string, probe_overlay,
    wire_payload, PostMessageMessenger,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::{Document, Element, ShadowRootInit, ShadowRootMode, Window};

wasm_bindgen_test_configure!(run_in_browser);

fn page() -> (Window, Document) {
    let window = web_sys::window().expect("browser test needs a window");
    let document = window.document().expect("window should carry a document");
    (window, document)
}

/// Builds a dialog element with the structured children the framework
/// overlay uses, appended to `parent`.
fn build_dialog(document: &Document, parent: &web_sys::Node) -> Element {
    let dialog = document.create_element("div").unwrap();
    dialog.set_attribute("data-nextjs-dialog", "").unwrap();

    let header = document.create_element("div").unwrap();
    header.set_attribute("data-nextjs-dialog-header", "").unwrap();
    header.set_text_content(Some("Unhandled Runtime Error"));
    dialog.append_child(&header).unwrap();

    let body = document.create_element("div").unwrap();
    body.set_attribute("data-nextjs-dialog-body", "").unwrap();
    body.set_text_content(Some("TypeError: boom is not a function"));
    dialog.append_child(&body).unwrap();

    let frame = document.create_element("pre").unwrap();
    frame.set_attribute("data-nextjs-codeframe", "").unwrap();
    frame.set_text_content(Some("> 3 | boom()"));
    dialog.append_child(&frame).unwrap();

    parent.append_child(&dialog).unwrap();
    dialog
}

#[wasm_bindgen_test]
fn probe_finds_structured_dialog_in_document() {
    let (window, document) = page();
    let body = document.body().unwrap();
    let dialog = build_dialog(&document, &body);

    let found = probe_overlay(&window, &document, None).expect("dialog should be found");
    assert_eq!(found.header, "Unhandled Runtime Error");
    assert_eq!(found.body, "TypeError: boom is not a function");
    assert_eq!(found.code_frame, "> 3 | boom()");

    assert_eq!(
        extract_message(&found),
        "Unhandled Runtime Error\nTypeError: boom is not a function\n> 3 | boom()"
    );

    dialog.remove();
}

#[wasm_bindgen_test]
fn hidden_dialog_does_not_count_as_present() {
    let (window, document) = page();
    let body = document.body().unwrap();
    let dialog = build_dialog(&document, &body);
    dialog.set_attribute("style", "display: none").unwrap();

    assert!(!is_visible(&window, &dialog));
    assert!(probe_overlay(&window, &document, None).is_none());

    dialog.remove();
}

#[wasm_bindgen_test]
fn zero_opacity_dialog_does_not_count_as_present() {
    let (window, document) = page();
    let body = document.body().unwrap();
    let dialog = build_dialog(&document, &body);
    dialog.set_attribute("style", "opacity: 0").unwrap();

    assert!(probe_overlay(&window, &document, None).is_none());

    dialog.remove();
}

#[wasm_bindgen_test]
fn shadow_root_is_searched_before_the_document() {
    let (window, document) = page();
    let body = document.body().unwrap();

    let portal = document.create_element("nextjs-portal").unwrap();
    body.append_child(&portal).unwrap();
    let shadow = portal
        .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
        .unwrap();

    let dialog = document.create_element("div").unwrap();
    dialog.set_attribute("data-nextjs-dialog", "").unwrap();
    dialog.set_text_content(Some("Module not found: ./missing"));
    shadow.append_child(&dialog).unwrap();

    let found =
        probe_overlay(&window, &document, Some(&shadow)).expect("shadow dialog should be found");
    assert_eq!(extract_message(&found), "Module not found: ./missing");

    portal.remove();
}

#[wasm_bindgen_test]
fn dialog_with_no_text_extracts_placeholder() {
    let (window, document) = page();
    let body = document.body().unwrap();

    let dialog = document.create_element("div").unwrap();
    dialog.set_attribute("role", "dialog").unwrap();
    // Give it a rendered box without any text.
    dialog
        .set_attribute("style", "width: 10px; height: 10px")
        .unwrap();
    body.append_child(&dialog).unwrap();

    let found = probe_overlay(&window, &document, None).expect("dialog should be found");
    assert_eq!(extract_message(&found), OVERLAY_PLACEHOLDER);

    dialog.remove();
}

#[wasm_bindgen_test]
fn console_arg_formatting_strings_pass_through() {
    assert_eq!(
        format_console_arg(&JsValue::from_str("Failed to fetch")),
        "Failed to fetch"
    );
}

#[wasm_bindgen_test]
fn console_arg_formatting_serializes_objects() {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"status".into(), &JsValue::from_f64(500.0)).unwrap();
    assert_eq!(format_console_arg(&obj.into()), "{\"status\":500}");
}

#[wasm_bindgen_test]
fn console_arg_formatting_survives_circular_structures() {
    // JSON.stringify throws on this; the formatter must fall back to
    // string coercion instead of propagating.
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"me".into(), &obj).unwrap();
    assert_eq!(format_console_arg(&obj.into()), "[object Object]");
}

/// A variadic JS function that appends each call's argument list to
/// `calls`, standing in for the real `console.error`.
fn recording_sink(calls: &js_sys::Array) -> js_sys::Function {
    let factory = js_sys::Function::new_with_args(
        "calls",
        "return function () { calls.push(Array.prototype.slice.call(arguments)); };",
    );
    factory
        .call1(&JsValue::NULL, calls)
        .unwrap()
        .dyn_into()
        .unwrap()
}

#[wasm_bindgen_test]
fn console_shim_forwards_every_argument() {
    let logged = js_sys::Array::new();
    let captured = js_sys::Array::new();
    let shim = build_console_shim(&recording_sink(&logged), &recording_sink(&captured)).unwrap();

    let args = js_sys::Array::new();
    for part in ["a", "b", "c", "d", "e", "f", "g", "h"] {
        args.push(&JsValue::from_str(part));
    }
    args.push(&JsValue::UNDEFINED);
    js_sys::Reflect::apply(&shim, &JsValue::NULL, &args).unwrap();

    // The eighth argument and the explicit trailing undefined both
    // reach the original logger.
    assert_eq!(logged.length(), 1);
    let forwarded: js_sys::Array = logged.get(0).dyn_into().unwrap();
    assert_eq!(forwarded.length(), 9);
    assert_eq!(forwarded.get(0).as_string().as_deref(), Some("a"));
    assert_eq!(forwarded.get(7).as_string().as_deref(), Some("h"));
    assert!(forwarded.get(8).is_undefined());

    // And the capture path sees the same full list, so the formatted
    // message keeps every argument.
    assert_eq!(captured.length(), 1);
    let seen: js_sys::Array = captured.get(0).dyn_into().unwrap();
    let parts: Vec<String> = seen.iter().map(|arg| format_console_arg(&arg)).collect();
    assert_eq!(
        format_console_message(&parts),
        "a b c d e f g h undefined"
    );
}

#[wasm_bindgen_test]
fn console_shim_logs_even_when_capture_throws() {
    let logged = js_sys::Array::new();
    let throwing = js_sys::Function::new_no_args("throw new Error('capture failed');");
    let shim = build_console_shim(&recording_sink(&logged), &throwing).unwrap();

    let args = js_sys::Array::of1(&JsValue::from_str("still logged"));
    js_sys::Reflect::apply(&shim, &JsValue::NULL, &args).unwrap();

    assert_eq!(logged.length(), 1);
}

#[wasm_bindgen_test]
fn js_display_string_handles_primitives() {
    assert_eq!(js_display_string(&JsValue::UNDEFINED), "undefined");
    assert_eq!(js_display_string(&JsValue::NULL), "null");
    assert_eq!(js_display_string(&JsValue::from_f64(3.0)), "3");
    assert_eq!(js_display_string(&JsValue::from_bool(true)), "true");
}

#[wasm_bindgen_test]
fn wire_payload_is_a_plain_object_with_protocol_fields() {
    let envelope = Envelope::ErrorReported {
        error: ErrorRecord::new(ErrorKind::Runtime, "boom").with_location(
            Some("app.js".to_string()),
            Some(3),
            Some(7),
        ),
    };
    let payload = wire_payload(&envelope).expect("envelope should serialize");

    assert!(payload.is_object());
    assert!(!payload.is_instance_of::<js_sys::Map>());

    let tag = js_sys::Reflect::get(&payload, &"type".into()).unwrap();
    assert_eq!(tag.as_string().as_deref(), Some("PREVIEW_ERROR"));

    let error = js_sys::Reflect::get(&payload, &"error".into()).unwrap();
    let kind = js_sys::Reflect::get(&error, &"type".into()).unwrap();
    assert_eq!(kind.as_string().as_deref(), Some("runtime"));
    let lineno = js_sys::Reflect::get(&error, &"lineno".into()).unwrap();
    assert_eq!(lineno.as_f64(), Some(3.0));
}

#[wasm_bindgen_test]
fn post_message_delivery_never_throws() {
    let (window, _) = page();
    let messenger = PostMessageMessenger::new(window);
    messenger.notify(&Envelope::Ready);
    messenger.notify(&Envelope::cleared(ErrorKind::Overlay));
}

#[wasm_bindgen_test]
fn install_is_idempotent() {
    install().expect("first install should succeed");
    install().expect("second install should be a no-op");

    // The patched console must still behave like console.error for the
    // page: calling it with any arguments must not throw.
    web_sys::console::error_1(&JsValue::from_str("Warning: suppressed test diagnostic"));
}
