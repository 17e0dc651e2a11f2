use serde::{Deserialize, Serialize};
use url::Url;

/// Replacement value emitted instead of the real content of password fields.
pub const PASSWORD_MASK: &str = "********";

/// Maximum number of characters of visible text carried by a click event.
pub const CLICK_TEXT_LIMIT: usize = 200;

/// Delimiter between per-shadow-level CSS selectors in a locator chain.
///
/// A replay engine interprets it as "resolve this selector, then enter its
/// shadow root, then resolve the next segment inside it".
pub const SHADOW_PIERCE_DELIMITER: &str = " >> ";

/// Stable, replayable identification of a captured element.
///
/// `xpath` is an absolute path from the document root (or nearest
/// `id`-bearing ancestor) using 1-based sibling indices per tag name.
/// `css_chain` is one defensive CSS selector per shadow boundary crossed,
/// outermost first, joined with [`SHADOW_PIERCE_DELIMITER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    pub xpath: String,
    pub css_chain: String,
}

impl Locator {
    /// Degraded locator for events with no resolvable element target.
    pub fn empty() -> Self {
        Locator {
            xpath: String::new(),
            css_chain: String::new(),
        }
    }
}

/// Fields common to every captured event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Top document URL.
    pub url: Url,
    /// Current window URL (differs from `url` inside frames).
    pub frame_url: Url,
    #[serde(flatten)]
    pub locator: Locator,
    /// Uppercase tag name, or `"document"` for targetless key events.
    pub element_tag: String,
}

/// A normalized click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    #[serde(flatten)]
    pub context: EventContext,
    /// Trimmed visible text, truncated to [`CLICK_TEXT_LIMIT`] characters.
    pub element_text: String,
}

/// A normalized text-input change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    #[serde(flatten)]
    pub context: EventContext,
    /// Current field value; [`PASSWORD_MASK`] for password inputs.
    pub value: String,
}

/// A normalized `<select>` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectEvent {
    #[serde(flatten)]
    pub context: EventContext,
    pub selected_value: String,
    /// Visible label of the selected option, empty if none is selected.
    pub selected_text: String,
}

/// A normalized key press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    #[serde(flatten)]
    pub context: EventContext,
    /// Allow-listed key name, or an OS-agnostic `CmdOrCtrl+<CHAR>` token.
    pub key: String,
}

/// Direction of a coalesced scroll gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
