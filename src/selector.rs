//! Compound structural selectors.
//!
//! A selector is one compound CSS-like predicate evaluated against a single
//! element: an optional tag, any number of `.class` tokens and any number of
//! `[attr]` / `[attr="value"]` conditions. Combinators are not supported;
//! profiles never need them.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, Result};
use crate::snapshot::{Element, Node};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeCondition {
    name: String,
    value: Option<String>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| CaptureError::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty selector"));
        }

        let mut selector = Selector {
            tag: None,
            classes: Vec::new(),
            attributes: Vec::new(),
        };
        let mut rest = trimmed;

        let tag_len = ident_len(rest);
        if tag_len > 0 {
            selector.tag = Some(rest[..tag_len].to_ascii_lowercase());
            rest = &rest[tag_len..];
        }

        while let Some(c) = rest.chars().next() {
            match c {
                '.' => {
                    let len = ident_len(&rest[1..]);
                    if len == 0 {
                        return Err(invalid("expected a class name after '.'"));
                    }
                    selector.classes.push(rest[1..=len].to_string());
                    rest = &rest[1 + len..];
                }
                '[' => {
                    let end = rest
                        .find(']')
                        .ok_or_else(|| invalid("unterminated attribute condition"))?;
                    selector.attributes.push(parse_attribute(&rest[1..end]).ok_or_else(|| {
                        invalid("attribute condition must be [name] or [name=\"value\"]")
                    })?);
                    rest = &rest[end + 1..];
                }
                c if c.is_whitespace() || c == '>' || c == '+' || c == '~' => {
                    return Err(invalid("combinators are not supported"));
                }
                _ => return Err(invalid("unexpected character")),
            }
        }

        Ok(selector)
    }

    pub fn matches(&self, el: &Element) -> bool {
        self.tag.as_deref().is_none_or(|tag| el.is(tag))
            && self.classes.iter().all(|class| el.classes.contains(class))
            && self.attributes.iter().all(|cond| {
                el.attributes
                    .get(&cond.name)
                    .is_some_and(|actual| cond.value.as_ref().is_none_or(|v| v == actual))
            })
    }

    pub fn matches_node(&self, node: &Node) -> bool {
        node.as_element().is_some_and(|el| self.matches(el))
    }
}

fn ident_len(s: &str) -> usize {
    s.find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len())
}

fn parse_attribute(inner: &str) -> Option<AttributeCondition> {
    let (name, value) = match inner.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name.trim(), Some(unquoted.to_string()))
        }
        None => (inner.trim(), None),
    };
    if name.is_empty() || ident_len(name) != name.len() {
        return None;
    }
    Some(AttributeCondition {
        name: name.to_string(),
        value,
    })
}

impl TryFrom<String> for Selector {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self> {
        Selector::parse(&value)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        for cond in &self.attributes {
            match &cond.value {
                Some(v) => write!(f, "[{}=\"{}\"]", cond.name, v)?,
                None => write!(f, "[{}]", cond.name)?,
            }
        }
        Ok(())
    }
}
