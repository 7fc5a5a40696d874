use chrono::{DateTime, Local, SecondsFormat, Utc};
use tracing::info;

use crate::assembler::{self, Conversation};
use crate::error::Result;
use crate::normalizer;
use crate::profile::Profile;
use crate::segmenter::{self, Diagnostic, Turn};
use crate::snapshot::Snapshot;

/// A finished transcript and where it would like to be saved.
#[derive(Debug)]
pub struct Export {
    pub text: String,
    pub file_name: String,
    pub turns: Vec<Turn>,
    pub diagnostics: Vec<Diagnostic>,
}

/// `<prefix><ISO timestamp with ':' and '.' replaced by '-'>.txt`
pub fn suggested_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}{}.txt", prefix, stamp)
}

/// Segment, assemble and normalize one snapshot.
///
/// The header shows when the page was captured, falling back to `now` for
/// snapshots without a capture time. The file name always uses `now`.
///
/// Only a broken profile (an invalid strip pattern) fails the call; problems
/// with individual turns end up in [`Export::diagnostics`].
pub fn export_snapshot(snapshot: &Snapshot, profile: &Profile, now: DateTime<Utc>) -> Result<Export> {
    let strip_patterns = profile.compiled_strip_patterns()?;

    let segmentation = segmenter::segment_with(&snapshot.root, profile, &strip_patterns);
    info!(
        profile = %profile.name,
        turns = segmentation.turns.len(),
        diagnostics = segmentation.diagnostics.len(),
        "segmented snapshot"
    );

    let conversation = Conversation::at(
        snapshot.location.clone(),
        segmentation.turns,
        snapshot.captured_at.unwrap_or(now).with_timezone(&Local),
    );
    let mut text = assembler::assemble(&conversation, profile);
    if profile.strip_markdown {
        text = normalizer::normalize(&text);
    }

    Ok(Export {
        text,
        file_name: suggested_file_name(&profile.file_prefix(), now),
        turns: conversation.turns,
        diagnostics: segmentation.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile;
    use crate::snapshot::Element;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 15).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn file_name_replaces_colons_and_dots() {
        assert_eq!(
            suggested_file_name("claude_chat_", now()),
            "claude_chat_2025-03-01T09-30-15-042Z.txt"
        );
    }

    #[test]
    fn grok_thoughts_block_is_removed() {
        let root = Element::new("main").child(
            Element::new("div")
                .class("message-bubble")
                .child(Element::new("p").text("Thoughts"))
                .child(Element::new("p").margins(0.0, 16.0).text("Expand for details"))
                .child(Element::new("p").text("The answer is **42**.")),
        );
        let export = export_snapshot(
            &Snapshot::new("https://grok.com/chat/1", root),
            &profile::grok(),
            now(),
        )
        .unwrap();
        assert!(export.text.ends_with("AI:\nThe answer is 42.\n\n"));
        assert!(!export.text.contains("Thoughts"));
        assert!(export.file_name.starts_with("grok_export_"));
    }

    #[test]
    fn header_shows_capture_time() {
        let captured = Utc.with_ymd_and_hms(2024, 12, 24, 18, 0, 0).unwrap();
        let root = Element::new("div").class("font-claude-message").text("hi");
        let mut snapshot = Snapshot::new("x", root);

        let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();
        let expected = now().with_timezone(&Local).format("%-m/%-d/%Y, %-I:%M:%S %p");
        assert!(export.text.starts_with(&format!("Chat Export - {}\n", expected)));

        snapshot.captured_at = Some(captured);
        let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();
        let expected = captured.with_timezone(&Local).format("%-m/%-d/%Y, %-I:%M:%S %p");
        assert!(export.text.starts_with(&format!("Chat Export - {}\n", expected)));
        assert_eq!(export.file_name, "claude_chat_2025-03-01T09-30-15-042Z.txt");
    }

    #[test]
    fn markdown_kept_when_disabled() {
        let mut profile = profile::claude();
        profile.strip_markdown = false;
        let root = Element::new("div")
            .class("font-claude-message")
            .text("**kept**");
        let export = export_snapshot(&Snapshot::new("x", root), &profile, now()).unwrap();
        assert!(export.text.contains("**kept**"));
    }

    #[test]
    fn invalid_strip_pattern_fails_the_export() {
        let mut profile = profile::claude();
        profile.strip_patterns = vec!["[".into()];
        let root = Element::new("div");
        assert!(export_snapshot(&Snapshot::new("x", root), &profile, now()).is_err());
    }
}
