//! Read-only snapshot of a rendered chat page.
//!
//! The page-side collaborator walks the live document once, resolves each
//! element's computed vertical margins, and serializes the result as JSON:
//!
//! ```json
//! {
//!   "location": "https://claude.ai/chat/…",
//!   "captured_at": "2025-03-01T10:00:00Z",
//!   "root": {
//!     "kind": "element",
//!     "tag": "DIV",
//!     "classes": ["font-claude-message"],
//!     "attributes": { "data-testid": "user-message" },
//!     "marginTop": 0,
//!     "marginBottom": 16,
//!     "children": [{ "kind": "text", "text": "Hello" }]
//!   }
//! }
//! ```
//!
//! Nothing in this crate mutates a tree once it has been loaded.
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{CaptureError, Result};

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One markup element or text run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub enum Node {
    Text { text: String },
    Element(Element),
}

/// An element with its resolved spacing and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lower-cased element name.
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    /// Computed `margin-top` in pixels.
    pub margin_top: f64,
    /// Computed `margin-bottom` in pixels.
    pub margin_bottom: f64,
    pub children: Vec<Node>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum NodeKind {
    Text,
    Element,
}

/// Wire form of a node. Read field by field rather than through an
/// internally tagged enum, which would buffer every subtree once per level.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    kind: NodeKind,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    classes: BTreeSet<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    margin_top: f64,
    #[serde(default)]
    margin_bottom: f64,
    #[serde(default)]
    children: Vec<Node>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> std::result::Result<Self, Self::Error> {
        match raw.kind {
            NodeKind::Text => Ok(Node::Text {
                text: raw.text.unwrap_or_default(),
            }),
            NodeKind::Element => {
                let tag = raw.tag.ok_or("element node without a tag")?;
                Ok(Node::Element(Element {
                    tag: tag.to_ascii_lowercase(),
                    classes: raw.classes,
                    attributes: raw.attributes,
                    margin_top: raw.margin_top,
                    margin_bottom: raw.margin_bottom,
                    children: raw.children,
                }))
            }
        }
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text { text: text.into() }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text { .. } => &[],
        }
    }

    /// Pre-order walk over this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// [`Node::descendants`] paired with each node's parent element. The
    /// starting node is reported with no parent.
    pub fn descendants_with_parent(&self) -> WithParent<'_> {
        WithParent {
            stack: vec![(self, None)],
        }
    }

    /// All text below this node, in document order, untrimmed.
    pub fn text_content(&self) -> String {
        self.descendants()
            .filter_map(|node| match node {
                Node::Text { text } => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Number of levels in the subtree rooted here (a lone text run is 1).
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, level)) = stack.pop() {
            deepest = deepest.max(level);
            stack.extend(node.children().iter().map(|child| (child, level + 1)));
        }
        deepest
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: BTreeSet::new(),
            attributes: BTreeMap::new(),
            margin_top: 0.0,
            margin_bottom: 0.0,
            children: Vec::new(),
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn margins(mut self, top: f64, bottom: f64) -> Self {
        self.margin_top = top;
        self.margin_bottom = bottom;
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.child(Node::text(text))
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Same as [`Node::depth`] for this element.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Node::depth).max().unwrap_or(0)
    }
}

/// Iterator returned by [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Iterator returned by [`Node::descendants_with_parent`].
pub struct WithParent<'a> {
    stack: Vec<(&'a Node, Option<&'a Element>)>,
}

impl<'a> Iterator for WithParent<'a> {
    type Item = (&'a Node, Option<&'a Element>);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, parent) = self.stack.pop()?;
        if let Node::Element(el) = node {
            self.stack
                .extend(el.children.iter().rev().map(|child| (child, Some(el))));
        }
        Some((node, parent))
    }
}

// Dropping nested `Vec<Node>`s recursively would exhaust the stack on very
// deep pages, so children are detached onto a heap stack first.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut el) = node {
                pending.append(&mut el.children);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A whole captured page: where it came from and its element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub location: String,
    pub captured_at: Option<DateTime<Utc>>,
    pub root: Node,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    location: String,
    #[serde(default)]
    captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    root: Option<Node>,
}

impl Snapshot {
    pub fn new(location: impl Into<String>, root: impl Into<Node>) -> Self {
        Self {
            location: location.into(),
            captured_at: None,
            root: root.into(),
        }
    }

    /// Parse a JSON snapshot. A missing or null `root` is rejected here so
    /// that segmentation only ever sees a real tree.
    ///
    /// Nesting depth is not limited while parsing; the stack grows on demand.
    /// Overly deep turns are refused later, one at a time, by the segmenter.
    pub fn from_json(json: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| CaptureError::InvalidSnapshot(e.to_string());
        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let raw = RawSnapshot::deserialize(serde_stacker::Deserializer::new(&mut de))
            .map_err(invalid)?;
        de.end().map_err(invalid)?;
        let root = raw
            .root
            .ok_or_else(|| CaptureError::InvalidSnapshot("snapshot has no root node".into()))?;
        Ok(Self {
            location: raw.location,
            captured_at: raw.captured_at,
            root,
        })
    }
}
