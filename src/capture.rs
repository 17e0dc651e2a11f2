//! Event capture layer: one normalizer per DOM event class, turning raw
//! dispatches into typed, serializable payloads.
//!
//! The same four listeners are attached at the top document by the session
//! and inside every shadow root by the bridge. A normalizer emits only when
//! invoked at the root that owns the target, so an event crossing nested
//! instrumented roots still produces exactly one message.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use lazy_static::lazy_static;

use crate::dom::{Dom, DomEvent, EventKind, KeyInput, ListenerId, NodeId};
use crate::locator;
use crate::transport::{OutboundMessage, Transport};
use crate::types::{
    ClickEvent, EventContext, InputEvent, KeyEvent, Locator, PASSWORD_MASK, SelectEvent,
};

lazy_static! {
    /// Non-printable keys worth recording on their own. Everything else is
    /// ignored unless combined with Ctrl/Cmd, to bound event volume.
    static ref CAPTURED_KEYS: HashSet<&'static str> = [
        "Enter", "Tab", "Escape",
        "ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight",
        "Home", "End", "PageUp", "PageDown",
        "Backspace", "Delete",
    ]
    .into_iter()
    .collect();
}

struct HandlerShared {
    transport: Arc<dyn Transport>,
    active: Arc<AtomicBool>,
    click_text_limit: usize,
}

/// The four capture normalizers, attachable to any root.
#[derive(Clone)]
pub struct CaptureHandlers {
    shared: Arc<HandlerShared>,
}

impl CaptureHandlers {
    pub fn new(
        transport: Arc<dyn Transport>,
        active: Arc<AtomicBool>,
        click_text_limit: usize,
    ) -> Self {
        CaptureHandlers {
            shared: Arc::new(HandlerShared {
                transport,
                active,
                click_text_limit,
            }),
        }
    }

    /// Attach click/input/change/keydown listeners to `root` in capturing
    /// mode. Returns the listener ids so the caller can detach them later
    /// (the session does for the top document; the bridge never does).
    pub fn attach(&self, dom: &Dom, root: NodeId) -> Vec<ListenerId> {
        [
            EventKind::Click,
            EventKind::Input,
            EventKind::Change,
            EventKind::KeyDown,
        ]
        .into_iter()
        .map(|kind| {
            let handlers = self.clone();
            dom.add_event_listener(
                root,
                kind,
                Arc::new(move |dom, event| handlers.handle(dom, event)),
            )
        })
        .collect()
    }

    fn handle(&self, dom: &Dom, event: &DomEvent) {
        if !self.shared.active.load(Ordering::SeqCst) {
            return;
        }
        if event.current_root != event.owner_root {
            return;
        }
        match event.kind {
            EventKind::Click => self.on_click(dom, event),
            EventKind::Input => self.on_input(dom, event),
            EventKind::Change => self.on_select(dom, event),
            EventKind::KeyDown => self.on_key(dom, event),
        }
    }

    fn on_click(&self, dom: &Dom, event: &DomEvent) {
        let Some(el) = composed_target(dom, event) else {
            return;
        };
        let text = truncate_chars(dom.text_content(el).trim(), self.shared.click_text_limit);
        self.shared.transport.send(OutboundMessage::Click(ClickEvent {
            context: element_context(dom, el),
            element_text: text,
        }));
    }

    fn on_input(&self, dom: &Dom, event: &DomEvent) {
        let Some(el) = composed_target(dom, event) else {
            return;
        };
        // Only elements exposing a value produce input events.
        let Some(value) = dom.value(el) else {
            return;
        };
        let masked = dom
            .attr(el, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("password"));
        self.shared.transport.send(OutboundMessage::Input(InputEvent {
            context: element_context(dom, el),
            value: if masked { PASSWORD_MASK.to_string() } else { value },
        }));
    }

    fn on_select(&self, dom: &Dom, event: &DomEvent) {
        let Some(el) = composed_target(dom, event) else {
            return;
        };
        if dom.tag(el) != "select" {
            return;
        }
        let selected_text = dom
            .selected_option(el)
            .map(|option| dom.text_content(option))
            .unwrap_or_default();
        self.shared.transport.send(OutboundMessage::Select(SelectEvent {
            context: element_context(dom, el),
            selected_value: dom.select_value(el),
            selected_text,
        }));
    }

    fn on_key(&self, dom: &Dom, event: &DomEvent) {
        let Some(input) = event.key.as_ref() else {
            return;
        };
        let Some(key) = normalize_key(input) else {
            return;
        };
        // Global shortcuts have no natural element target; emit with a
        // document-level locator instead of dropping them.
        let context = match composed_target(dom, event) {
            Some(el) => element_context(dom, el),
            None => EventContext {
                timestamp: Utc::now().timestamp_millis(),
                url: dom.location(),
                frame_url: dom.frame_location(),
                locator: Locator::empty(),
                element_tag: "document".to_string(),
            },
        };
        self.shared
            .transport
            .send(OutboundMessage::Key(KeyEvent { context, key }));
    }
}

/// Prefer the composed path's first element node over the raw target: for
/// events crossing a shadow boundary the target a listener sees can be the
/// host rather than the true inner element.
fn composed_target(dom: &Dom, event: &DomEvent) -> Option<NodeId> {
    event
        .composed_path
        .iter()
        .copied()
        .find(|node| dom.is_element(*node))
        .or_else(|| {
            let visible = event.visible_target(dom);
            dom.is_element(visible).then_some(visible)
        })
}

fn element_context(dom: &Dom, el: NodeId) -> EventContext {
    EventContext {
        timestamp: Utc::now().timestamp_millis(),
        url: dom.location(),
        frame_url: dom.frame_location(),
        locator: locator::locator_for(dom, el),
        element_tag: dom.tag(el).to_uppercase(),
    }
}

/// Allow-listed keys pass through by name; a single printable character
/// with Ctrl/Cmd held becomes an OS-agnostic `CmdOrCtrl+<CHAR>` token.
fn normalize_key(input: &KeyInput) -> Option<String> {
    if CAPTURED_KEYS.contains(input.key.as_str()) {
        return Some(input.key.clone());
    }
    if (input.ctrl || input.meta) && input.key.chars().count() == 1 {
        return Some(format!("CmdOrCtrl+{}", input.key.to_uppercase()));
    }
    None
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;
