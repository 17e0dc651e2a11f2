// Unit tests for the shared data model

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn context() -> EventContext {
    EventContext {
        timestamp: 1_700_000_000_000,
        url: Url::parse("https://app.example.com/checkout").unwrap(),
        frame_url: Url::parse("https://app.example.com/checkout").unwrap(),
        locator: Locator {
            xpath: "body/div[1]/button[2]".to_string(),
            css_chain: "button.primary".to_string(),
        },
        element_tag: "BUTTON".to_string(),
    }
}

#[test]
fn test_locator_serializes_camel_case() {
    let locator = Locator {
        xpath: "id(\"save\")".to_string(),
        css_chain: "button >> span".to_string(),
    };
    let value = serde_json::to_value(&locator).unwrap();
    assert_eq!(
        value,
        json!({"xpath": "id(\"save\")", "cssChain": "button >> span"})
    );
}

#[test]
fn test_locator_empty_has_blank_fields() {
    let locator = Locator::empty();
    assert_eq!(locator.xpath, "");
    assert_eq!(locator.css_chain, "");
}

#[test]
fn test_click_event_flattens_context() {
    let event = ClickEvent {
        context: context(),
        element_text: "Place order".to_string(),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
    assert_eq!(value["url"], "https://app.example.com/checkout");
    assert_eq!(value["frameUrl"], "https://app.example.com/checkout");
    assert_eq!(value["xpath"], "body/div[1]/button[2]");
    assert_eq!(value["cssChain"], "button.primary");
    assert_eq!(value["elementTag"], "BUTTON");
    assert_eq!(value["elementText"], "Place order");
}

#[test]
fn test_input_event_roundtrips() {
    let event = InputEvent {
        context: context(),
        value: PASSWORD_MASK.to_string(),
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: InputEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn test_select_event_serializes_option_fields() {
    let event = SelectEvent {
        context: context(),
        selected_value: "us".to_string(),
        selected_text: "United States".to_string(),
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["selectedValue"], "us");
    assert_eq!(value["selectedText"], "United States");
}

#[test]
fn test_scroll_direction_serializes_lowercase() {
    assert_eq!(serde_json::to_value(ScrollDirection::Up).unwrap(), json!("up"));
    assert_eq!(
        serde_json::to_value(ScrollDirection::Down).unwrap(),
        json!("down")
    );
    assert_eq!(ScrollDirection::Down.as_str(), "down");
}

#[test]
fn test_password_mask_is_fixed() {
    assert_eq!(PASSWORD_MASK, "********");
}
