//! Locator generation: structural XPaths and defensive CSS selectors,
//! with a shadow-piercing chain for elements inside shadow trees.

use std::collections::HashSet;

use lazy_static::lazy_static;
use tracing::warn;

use crate::dom::{Dom, NodeId};
use crate::errors::RecorderError;
use crate::types::{Locator, SHADOW_PIERCE_DELIMITER};

lazy_static! {
    /// Attributes stable enough to key a selector on. Everything else is
    /// presentation or framework noise that churns across re-renders.
    static ref SAFE_ATTRS: HashSet<&'static str> = [
        "id", "name", "type", "placeholder",
        "aria-label", "aria-labelledby", "aria-describedby", "role", "for",
        "autocomplete", "required", "readonly", "alt", "title", "src", "href", "target",
        "data-id", "data-qa", "data-cy", "data-testid",
    ]
    .into_iter()
    .collect();
}

/// Structural XPath from the document root (or nearest `id`-bearing
/// ancestor) using 1-based sibling indices per tag name.
///
/// Deterministic and order-sensitive, but **not** guaranteed unique when
/// sibling subtrees are structurally identical apart from content.
pub fn compute_xpath(dom: &Dom, el: NodeId) -> String {
    if let Some(id) = dom.id(el) {
        return format!("id(\"{id}\")");
    }
    let tag = dom.tag(el);
    if dom.is_body(el) {
        return tag;
    }
    let Some(parent) = dom.parent_element(el) else {
        // Top of a shadow tree (or <html>): the chain segment for the host
        // carries the rest of the ancestry.
        return tag;
    };
    let mut nth = 0;
    for sibling in dom.children(parent) {
        if dom.tag(sibling) == tag {
            nth += 1;
        }
        if sibling == el {
            break;
        }
    }
    format!("{}/{}[{}]", compute_xpath(dom, parent), tag, nth)
}

/// Defensive CSS selector for one element within its own tree. Falls back
/// to `tag[xpath="…"]` when the element's attributes defeat escaping.
pub fn compute_css_selector(dom: &Dom, el: NodeId, xpath: &str) -> String {
    match build_css_selector(dom, el) {
        Ok(selector) => selector,
        Err(e) => {
            warn!("selector generation failed, using xpath fallback: {e}");
            format!("{}[xpath=\"{}\"]", dom.tag(el), escape_quotes(xpath))
        }
    }
}

fn build_css_selector(dom: &Dom, el: NodeId) -> Result<String, RecorderError> {
    let mut selector = dom.tag(el);
    for class in dom.classes(el) {
        if is_safe_identifier(&class) {
            selector.push('.');
            selector.push_str(&css_escape(&class));
        }
    }
    for (name, value) in dom.attributes(el) {
        if name == "class" || !SAFE_ATTRS.contains(name.as_str()) {
            continue;
        }
        let escaped_name = css_escape(&name);
        if value.is_empty() {
            selector.push_str(&format!("[{escaped_name}]"));
        } else if value
            .chars()
            .any(|c| matches!(c, '"' | '\'' | '<' | '>' | '`') || c.is_whitespace())
        {
            // Brittle value: degrade to a substring match. A value that
            // embeds a double quote cannot be quoted at all; surface it so
            // the caller falls back to the xpath selector.
            if value.contains('"') {
                return Err(RecorderError::UnescapableAttribute(name));
            }
            selector.push_str(&format!("[{escaped_name}*=\"{value}\"]"));
        } else {
            selector.push_str(&format!("[{escaped_name}=\"{value}\"]"));
        }
    }
    Ok(selector)
}

/// Shadow-piercing selector chain: one segment per shadow boundary crossed,
/// outermost first, joined with [`SHADOW_PIERCE_DELIMITER`]. Iterative
/// ascent: switch to the host element each time the current node's root is
/// a shadow root.
pub fn shadow_css_chain(dom: &Dom, el: NodeId) -> String {
    let mut segments = Vec::new();
    let mut node = el;
    loop {
        let xpath = compute_xpath(dom, node);
        segments.push(compute_css_selector(dom, node, &xpath));
        let root = dom.containing_root(node);
        match dom.host(root) {
            Some(host) => node = host,
            None => break,
        }
    }
    segments.reverse();
    segments.join(SHADOW_PIERCE_DELIMITER)
}

/// Full locator for an element: XPath plus shadow-piercing CSS chain.
pub fn locator_for(dom: &Dom, el: NodeId) -> Locator {
    Locator {
        xpath: compute_xpath(dom, el),
        css_chain: shadow_css_chain(dom, el),
    }
}

/// Class tokens worth keeping: start with a letter or underscore, then word
/// characters and hyphens. Hashed/utility classes fail this and are skipped.
fn is_safe_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Minimal `CSS.escape` equivalent: identifier characters pass through,
/// a leading digit becomes a code-point escape, everything else gets a
/// backslash.
fn css_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
