//! Turn selection and classification.
//!
//! Walks the whole document, picks every element matched by one of the
//! profile's rules (nested matches included, document order kept), converts
//! each to text and turns the survivors into [`Turn`]s.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::converter;
use crate::error::{CaptureError, Result};
use crate::profile::{AttachmentRule, Profile};
use crate::snapshot::{Element, Node};

static PARAGRAPH_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Who authored a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One classified conversational unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    /// Converted text, with the attachment block appended when present.
    pub body: String,
    pub attachments: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Result of segmenting one document.
#[derive(Debug, Default)]
pub struct Segmentation {
    pub turns: Vec<Turn>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Segmentation {
    fn report(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => error!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Info => debug!("{}", message),
        }
        self.diagnostics.push(Diagnostic { severity, message });
    }
}

/// Collapse runs of three or more line breaks to a single blank line.
pub fn collapse_paragraphs(text: &str) -> String {
    PARAGRAPH_BREAKS_RE.replace_all(text, "\n\n").into_owned()
}

/// Segment `root` with the profile's own strip patterns. An invalid pattern
/// is reported and ignored.
pub fn segment(root: &Node, profile: &Profile) -> Segmentation {
    match profile.compiled_strip_patterns() {
        Ok(patterns) => segment_with(root, profile, &patterns),
        Err(e) => {
            let mut out = segment_with(root, profile, &[]);
            out.report(Severity::Error, e.to_string());
            out
        }
    }
}

/// Segment `root`, removing `strip_patterns` from every converted turn
/// before blank lines are collapsed.
pub fn segment_with(root: &Node, profile: &Profile, strip_patterns: &[Regex]) -> Segmentation {
    let mut out = Segmentation::default();
    let mut matched = 0usize;

    for (index, (el, parent, role)) in root
        .descendants_with_parent()
        .filter_map(|(node, parent)| node.as_element().map(|el| (el, parent)))
        .filter_map(|(el, parent)| profile.classify(el).map(|role| (el, parent, role)))
        .enumerate()
    {
        matched += 1;
        let source = TurnSource {
            index,
            el,
            parent,
            role,
        };
        match build_turn(&source, profile, strip_patterns, &mut out) {
            Ok(Some(turn)) => out.turns.push(turn),
            Ok(None) => debug!(index, "dropped empty or noise turn"),
            Err(e) => out.report(Severity::Error, format!("Skipped turn #{}: {}", index + 1, e)),
        }
    }

    if matched == 0 {
        out.report(
            Severity::Warning,
            format!("No element matched any rule of profile {:?}", profile.name),
        );
    }

    out
}

/// A matched element and where it sits in the document.
struct TurnSource<'a> {
    index: usize,
    el: &'a Element,
    parent: Option<&'a Element>,
    role: Role,
}

fn build_turn(
    source: &TurnSource<'_>,
    profile: &Profile,
    strip_patterns: &[Regex],
    out: &mut Segmentation,
) -> Result<Option<Turn>> {
    let el = source.el;
    let depth = el.depth();
    if depth > profile.max_depth {
        return Err(CaptureError::ConversionFailure {
            depth,
            limit: profile.max_depth,
        });
    }

    let mut raw = converter::convert_element(el, source.parent);
    for pattern in strip_patterns {
        raw = pattern.replace_all(&raw, "").into_owned();
    }
    let mut body = collapse_paragraphs(&raw).trim().to_string();
    if body.is_empty() || profile.is_noise(&body) {
        return Ok(None);
    }

    let attachments = profile
        .attachments
        .as_ref()
        .map(|rule| collect_attachments(source, rule, out))
        .unwrap_or_default();
    if !attachments.is_empty() {
        body.push_str("\n\n");
        body.push_str(&profile.attachments_heading);
        for title in &attachments {
            body.push_str(&format!("\n[{}]", title));
        }
    }

    Ok(Some(Turn {
        role: source.role,
        body,
        attachments,
    }))
}

/// Titles of the artifacts referenced below the turn, in encounter order.
/// Placeholder titles are skipped quietly; a marker with no title at all is
/// noted as an info diagnostic.
fn collect_attachments(
    source: &TurnSource<'_>,
    rule: &AttachmentRule,
    out: &mut Segmentation,
) -> Vec<String> {
    let mut titles = Vec::new();
    for marker in source
        .el
        .children
        .iter()
        .flat_map(Node::descendants)
        .filter_map(Node::as_element)
        .filter(|candidate| rule.marker.matches(candidate))
    {
        match attachment_title(marker, rule) {
            None => out.report(
                Severity::Info,
                format!(
                    "Turn #{}: <{}> attachment marker has no title",
                    source.index + 1,
                    marker.tag
                ),
            ),
            Some(title) if rule.placeholders.contains(&title) => {
                debug!(%title, "placeholder attachment title skipped");
            }
            Some(title) => titles.push(title),
        }
    }
    titles
}

fn attachment_title(marker: &Element, rule: &AttachmentRule) -> Option<String> {
    let raw = match (&rule.fixed_title, &rule.title) {
        (Some(fixed), _) => fixed.clone(),
        (None, Some(selector)) => marker
            .children
            .iter()
            .flat_map(Node::descendants)
            .find(|node| selector.matches_node(node))?
            .text_content(),
        (None, None) => marker.children.iter().map(Node::text_content).collect(),
    };
    let title = raw.trim();
    (!title.is_empty()).then(|| title.to_string())
}
