// Unit tests for the event normalizers

use super::*;
use crate::dom::{Dom, DomOptions};
use crate::transport::ChannelTransport;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::UnboundedReceiver;

fn setup() -> (
    Dom,
    Arc<AtomicBool>,
    UnboundedReceiver<OutboundMessage>,
) {
    let dom = Dom::new(DomOptions::default());
    let (transport, rx) = ChannelTransport::new();
    let active = Arc::new(AtomicBool::new(true));
    let handlers = CaptureHandlers::new(transport, Arc::clone(&active), 200);
    handlers.attach(&dom, dom.document());
    (dom, active, rx)
}

#[test]
fn test_click_emits_text_locator_and_tag() {
    let (dom, _active, mut rx) = setup();
    let button = dom.create_element_in(dom.body(), "button").unwrap();
    dom.set_attribute(button, "class", "primary").unwrap();
    dom.set_text(button, "  Place order  ").unwrap();

    dom.dispatch_click(button);

    match rx.try_recv().expect("click message") {
        OutboundMessage::Click(event) => {
            assert_eq!(event.element_text, "Place order");
            assert_eq!(event.context.element_tag, "BUTTON");
            assert_eq!(event.context.locator.xpath, "body/button[1]");
            assert_eq!(event.context.locator.css_chain, "button.primary");
            assert!(event.context.timestamp > 0);
        }
        other => panic!("unexpected message: {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_click_text_is_truncated() {
    let (dom, _active, mut rx) = setup();
    let div = dom.create_element_in(dom.body(), "div").unwrap();
    dom.set_text(div, &"x".repeat(300)).unwrap();

    dom.dispatch_click(div);

    match rx.try_recv().unwrap() {
        OutboundMessage::Click(event) => assert_eq!(event.element_text.chars().count(), 200),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_input_requires_a_value_property() {
    let (dom, _active, mut rx) = setup();
    let div = dom.create_element_in(dom.body(), "div").unwrap();
    dom.dispatch_input(div);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_input_reports_current_value() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.set_value(input, "hello").unwrap();

    dom.dispatch_input(input);

    match rx.try_recv().unwrap() {
        OutboundMessage::Input(event) => assert_eq!(event.value, "hello"),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_password_values_are_masked_including_empty() {
    for value in ["", "hunter2", "correct horse battery staple"] {
        let (dom, _active, mut rx) = setup();
        let input = dom.create_element_in(dom.body(), "input").unwrap();
        dom.set_attribute(input, "type", "password").unwrap();
        dom.set_value(input, value).unwrap();

        dom.dispatch_input(input);

        match rx.try_recv().unwrap() {
            OutboundMessage::Input(event) => assert_eq!(event.value, PASSWORD_MASK),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[test]
fn test_change_only_fires_for_select_elements() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.dispatch_change(input);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_select_reports_value_and_label() {
    let (dom, _active, mut rx) = setup();
    let select = dom.create_element_in(dom.body(), "select").unwrap();
    let option = dom.create_element_in(select, "option").unwrap();
    dom.set_attribute(option, "value", "us").unwrap();
    dom.set_text(option, "United States").unwrap();
    dom.select_option(select, option).unwrap();

    dom.dispatch_change(select);

    match rx.try_recv().unwrap() {
        OutboundMessage::Select(event) => {
            assert_eq!(event.selected_value, "us");
            assert_eq!(event.selected_text, "United States");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_select_without_selection_reports_empty_strings() {
    let (dom, _active, mut rx) = setup();
    let select = dom.create_element_in(dom.body(), "select").unwrap();
    dom.create_element_in(select, "option").unwrap();

    dom.dispatch_change(select);

    match rx.try_recv().unwrap() {
        OutboundMessage::Select(event) => {
            assert_eq!(event.selected_value, "");
            assert_eq!(event.selected_text, "");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_plain_printable_keys_are_ignored() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.dispatch_keydown(input, KeyInput::plain("a"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_ctrl_combos_normalize_to_cmd_or_ctrl() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.dispatch_keydown(input, KeyInput::ctrl("a"));

    match rx.try_recv().unwrap() {
        OutboundMessage::Key(event) => assert_eq!(event.key, "CmdOrCtrl+A"),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_meta_counts_as_cmd_or_ctrl() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.dispatch_keydown(
        input,
        KeyInput {
            key: "s".to_string(),
            ctrl: false,
            meta: true,
        },
    );

    match rx.try_recv().unwrap() {
        OutboundMessage::Key(event) => assert_eq!(event.key, "CmdOrCtrl+S"),
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_allow_listed_keys_pass_through() {
    let (dom, _active, mut rx) = setup();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.dispatch_keydown(input, KeyInput::plain("Escape"));

    match rx.try_recv().unwrap() {
        OutboundMessage::Key(event) => {
            assert_eq!(event.key, "Escape");
            assert_eq!(event.context.element_tag, "INPUT");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_targetless_keys_emit_with_document_locator() {
    let (dom, _active, mut rx) = setup();
    dom.dispatch_keydown(dom.document(), KeyInput::plain("Escape"));

    match rx.try_recv().unwrap() {
        OutboundMessage::Key(event) => {
            assert_eq!(event.context.element_tag, "document");
            assert_eq!(event.context.locator, Locator::empty());
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn test_nothing_is_captured_while_inactive() {
    let (dom, active, mut rx) = setup();
    active.store(false, Ordering::SeqCst);
    let button = dom.create_element_in(dom.body(), "button").unwrap();

    dom.dispatch_click(button);
    dom.dispatch_input(button);
    dom.dispatch_keydown(button, KeyInput::plain("Enter"));

    assert!(rx.try_recv().is_err());
}
