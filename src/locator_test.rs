// Unit tests for locator generation

use super::*;
use crate::dom::{Dom, DomOptions, ShadowMode};
use pretty_assertions::assert_eq;

fn dom() -> Dom {
    Dom::new(DomOptions::default())
}

/// Resolve one of our structural XPaths against the document. Supports the
/// exact grammar `compute_xpath` produces: `id("…")`, `body`, and
/// `…/tag[n]` steps.
fn resolve_xpath(dom: &Dom, xpath: &str) -> Option<crate::dom::NodeId> {
    if let Some(rest) = xpath.strip_prefix("id(\"") {
        let id = rest.strip_suffix("\")")?;
        return dom
            .descendants(dom.document())
            .into_iter()
            .find(|el| dom.id(*el).as_deref() == Some(id));
    }
    let mut steps = xpath.split('/');
    let mut current = match steps.next()? {
        "body" => dom.body(),
        _ => return None,
    };
    for step in steps {
        let open = step.find('[')?;
        let tag = &step[..open];
        let nth: usize = step[open + 1..].strip_suffix(']')?.parse().ok()?;
        let mut count = 0;
        current = dom.children(current).into_iter().find(|child| {
            if dom.tag(*child) == tag {
                count += 1;
                count == nth
            } else {
                false
            }
        })?;
    }
    Some(current)
}

#[test]
fn test_xpath_short_circuits_on_id() {
    let dom = dom();
    let div = dom.create_element_in(dom.body(), "div").unwrap();
    let button = dom.create_element_in(div, "button").unwrap();
    dom.set_attribute(button, "id", "save").unwrap();
    assert_eq!(compute_xpath(&dom, button), "id(\"save\")");
}

#[test]
fn test_xpath_counts_siblings_per_tag_name() {
    let dom = dom();
    let div = dom.create_element_in(dom.body(), "div").unwrap();
    dom.create_element_in(div, "p").unwrap();
    dom.create_element_in(div, "span").unwrap();
    let second_p = dom.create_element_in(div, "p").unwrap();
    // Two spans and two ps interleaved: indices are per tag, not absolute.
    assert_eq!(compute_xpath(&dom, second_p), "body/div[1]/p[2]");
}

#[test]
fn test_xpath_of_body_is_its_tag() {
    let dom = dom();
    assert_eq!(compute_xpath(&dom, dom.body()), "body");
}

#[test]
fn test_xpath_unique_and_resolvable_on_simple_trees() {
    let dom = dom();
    let body = dom.body();
    let nav = dom.create_element_in(body, "nav").unwrap();
    dom.create_element_in(nav, "a").unwrap();
    dom.create_element_in(nav, "a").unwrap();
    let main = dom.create_element_in(body, "main").unwrap();
    let list = dom.create_element_in(main, "ul").unwrap();
    let li1 = dom.create_element_in(list, "li").unwrap();
    dom.create_element_in(li1, "span").unwrap();
    let li2 = dom.create_element_in(list, "li").unwrap();
    dom.create_element_in(li2, "a").unwrap();

    let mut elements = dom.descendants(dom.document());
    elements.retain(|el| *el != dom.children(dom.document())[0]); // skip <html>

    let paths: Vec<String> = elements
        .iter()
        .map(|el| compute_xpath(&dom, *el))
        .collect();
    let mut deduped = paths.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), paths.len(), "duplicate xpath produced");

    for (el, path) in elements.iter().zip(&paths) {
        assert_eq!(resolve_xpath(&dom, path), Some(*el), "xpath {path}");
    }
}

#[test]
fn test_css_selector_keeps_safe_classes_and_allowed_attributes() {
    let dom = dom();
    let button = dom.create_element_in(dom.body(), "button").unwrap();
    dom.set_attribute(button, "class", "btn primary 2col").unwrap();
    dom.set_attribute(button, "name", "save").unwrap();
    dom.set_attribute(button, "data-qa", "submit").unwrap();
    dom.set_attribute(button, "style", "color: red").unwrap();

    let selector = compute_css_selector(&dom, button, "body/button[1]");
    // "2col" fails the safe-identifier pattern; style is not allow-listed.
    assert_eq!(
        selector,
        "button.btn.primary[data-qa=\"submit\"][name=\"save\"]"
    );
}

#[test]
fn test_css_selector_emits_bare_attribute_for_empty_value() {
    let dom = dom();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.set_attribute(input, "required", "").unwrap();
    assert_eq!(
        compute_css_selector(&dom, input, "body/input[1]"),
        "input[required]"
    );
}

#[test]
fn test_css_selector_degrades_to_substring_match_on_brittle_values() {
    let dom = dom();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.set_attribute(input, "placeholder", "Search all projects")
        .unwrap();
    assert_eq!(
        compute_css_selector(&dom, input, "body/input[1]"),
        "input[placeholder*=\"Search all projects\"]"
    );
}

#[test]
fn test_css_selector_falls_back_to_xpath_on_unescapable_value() {
    let dom = dom();
    let input = dom.create_element_in(dom.body(), "input").unwrap();
    dom.set_attribute(input, "title", "say \"hi\"").unwrap();
    assert_eq!(
        compute_css_selector(&dom, input, "body/input[1]"),
        "input[xpath=\"body/input[1]\"]"
    );
}

#[test]
fn test_chain_has_one_segment_without_shadow_ancestry() {
    let dom = dom();
    let button = dom.create_element_in(dom.body(), "button").unwrap();
    assert_eq!(shadow_css_chain(&dom, button), "button");
}

#[test]
fn test_chain_pierces_nested_shadow_boundaries_outermost_first() {
    let dom = dom();
    let outer_host = dom.create_element_in(dom.body(), "x-outer").unwrap();
    let outer_root = dom.attach_shadow(outer_host, ShadowMode::Open).unwrap();
    let inner_host = dom.create_element("x-inner");
    dom.append_child(outer_root, inner_host).unwrap();
    let inner_root = dom.attach_shadow(inner_host, ShadowMode::Open).unwrap();
    let button = dom.create_element("button");
    dom.set_attribute(button, "name", "send").unwrap();
    dom.append_child(inner_root, button).unwrap();

    assert_eq!(
        shadow_css_chain(&dom, button),
        "x-outer >> x-inner >> button[name=\"send\"]"
    );
}

#[test]
fn test_locator_combines_xpath_and_chain() {
    let dom = dom();
    let host = dom.create_element_in(dom.body(), "x-widget").unwrap();
    let root = dom.attach_shadow(host, ShadowMode::Open).unwrap();
    let input = dom.create_element("input");
    dom.append_child(root, input).unwrap();

    let locator = locator_for(&dom, input);
    // Inside a shadow tree the xpath restarts at the tree top; the chain
    // carries the host ancestry.
    assert_eq!(locator.xpath, "input");
    assert_eq!(locator.css_chain, "x-widget >> input");
}

#[test]
fn test_safe_identifier_pattern() {
    assert!(is_safe_identifier("btn"));
    assert!(is_safe_identifier("_private"));
    assert!(is_safe_identifier("btn-large2"));
    assert!(!is_safe_identifier("2col"));
    assert!(!is_safe_identifier("-lead"));
    assert!(!is_safe_identifier("weird:class"));
    assert!(!is_safe_identifier(""));
}
