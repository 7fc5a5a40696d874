//! Layout-aware tree-to-text conversion.
//!
//! Renders a subtree into plain text that keeps the layout the page showed:
//! block elements end their line, `<br>` breaks it, list items start on a
//! fresh line with a bullet or their ordinal, and elements with a large
//! computed margin are padded with a blank line. Runs of line breaks are left
//! alone here; the segmenter and assembler collapse them.
use crate::snapshot::{Element, Node};

/// Margins at or below this many pixels are decoration, not paragraph spacing.
pub const MARGIN_THRESHOLD: f64 = 10.0;

/// Glyph placed before items of anything that isn't an ordered list.
pub const BULLET: &str = "• ";

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "aside", "nav", "blockquote",
    "pre", "figure", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Convert a subtree to text. Never fails; unknown markup is rendered as a
/// transparent wrapper around its children.
pub fn convert(node: &Node) -> String {
    render(node, None)
}

/// [`convert`] for an element borrowed out of a larger tree. `parent` only
/// decides the prefix when `el` is itself a list item.
pub fn convert_element(el: &Element, parent: Option<&Element>) -> String {
    render_element(el, parent)
}

fn render(node: &Node, parent: Option<&Element>) -> String {
    match node {
        Node::Text { text } => text.clone(),
        Node::Element(el) => render_element(el, parent),
    }
}

fn render_element(el: &Element, parent: Option<&Element>) -> String {
    let mut text = String::new();

    if is_significant(el.margin_top) {
        text.push('\n');
    }

    match el.tag.as_str() {
        "br" => text.push('\n'),
        "ul" | "ol" => {
            text.push_str(&render_children(el));
            text.push('\n');
        }
        "li" => {
            text.push('\n');
            text.push_str(&item_prefix(el, parent));
            text.push_str(render_children(el).trim());
            text.push('\n');
        }
        tag if BLOCK_TAGS.contains(&tag) => {
            text.push_str(&render_children(el));
            text.push('\n');
        }
        _ => text.push_str(&render_children(el)),
    }

    if is_significant(el.margin_bottom) {
        text.push('\n');
    }

    text
}

/// Concatenate the children of `el`. A list item that follows output already
/// sitting at the start of a line does not add a second break, so adjacent
/// items land on adjacent lines.
fn render_children(el: &Element) -> String {
    let mut text = String::new();
    for child in &el.children {
        let rendered = render(child, Some(el));
        let is_item = child.as_element().is_some_and(|c| c.is("li"));
        match rendered.strip_prefix('\n') {
            Some(rest) if is_item && text.ends_with('\n') => text.push_str(rest),
            _ => text.push_str(&rendered),
        }
    }
    text
}

/// `"3. "` for the third item of an ordered list, the bullet otherwise.
/// Only `<li>` siblings are counted.
fn item_prefix(item: &Element, parent: Option<&Element>) -> String {
    let Some(list) = parent.filter(|p| p.is("ol")) else {
        return BULLET.to_string();
    };
    list.children
        .iter()
        .filter_map(Node::as_element)
        .filter(|sibling| sibling.is("li"))
        .position(|sibling| std::ptr::eq(sibling, item))
        .map(|index| format!("{}. ", index + 1))
        .unwrap_or_else(|| BULLET.to_string())
}

/// Margins are compared as whole pixels, so `10.9` is not significant.
fn is_significant(margin: f64) -> bool {
    margin.is_finite() && margin.trunc() > MARGIN_THRESHOLD
}
