//! # chat-text-export
//!
//! Turns a captured chat page into a plain-text transcript.
//!
//! ## What it does
//!
//! A page-side helper snapshots the rendered conversation (element tree plus
//! computed margins) as JSON. This crate takes that snapshot and a per-site
//! [`Profile`], then:
//!
//! 1. picks the elements that hold individual turns and classifies each as
//!    the user's or the assistant's by the rule that matched it,
//! 2. renders every turn to text, keeping paragraphs, line breaks and list
//!    numbering as they appeared on screen,
//! 3. notes artifacts (generated files, canvases) referenced inside a turn,
//! 4. assembles a transcript with a header and `ME:` / `AI:` labels,
//! 5. strips markdown markers that leaked into the page text.
//!
//! The whole run is synchronous and works on an immutable tree; independent
//! snapshots can be exported from as many threads as you like.
//!
//! ## Usage
//!
//! ```sh
//! # Export a snapshot, picking the profile from its URL
//! chat-text-export capture.json
//!
//! # Several snapshots into a directory, with an ad-hoc rule set
//! chat-text-export a.json b.json --target-dir exports \
//!     --rule 'user=.question' --rule 'assistant=.answer'
//! ```
//!
//! Preferences and custom profiles can be kept in
//! `~/.config/chat-text-export/config.toml`.
pub mod assembler;
pub mod converter;
pub mod error;
pub mod export;
pub mod normalizer;
pub mod profile;
pub mod segmenter;
pub mod selector;
pub mod snapshot;

pub use assembler::{Conversation, assemble};
pub use converter::convert;
pub use error::CaptureError;
pub use export::{Export, export_snapshot};
pub use normalizer::normalize;
pub use profile::{AttachmentRule, MatchRule, Profile};
pub use segmenter::{Diagnostic, Role, Segmentation, Severity, Turn, segment};
pub use selector::Selector;
pub use snapshot::{Element, Node, Snapshot};
