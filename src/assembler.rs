use std::io::Write;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::profile::Profile;
use crate::segmenter::Turn;

static LONG_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

/// Header timestamp, e.g. `3/1/2025, 10:04:59 AM`.
const HEADER_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// An ordered transcript ready to be rendered.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub source_location: String,
    pub generated_at: DateTime<Local>,
    /// Document order; never re-sorted.
    pub turns: Vec<Turn>,
}

impl Conversation {
    pub fn at(
        source_location: impl Into<String>,
        turns: Vec<Turn>,
        generated_at: DateTime<Local>,
    ) -> Self {
        Self {
            source_location: source_location.into(),
            generated_at,
            turns,
        }
    }
}

pub fn write_conversation<W: Write>(
    writer: &mut W,
    conversation: &Conversation,
    profile: &Profile,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} - {}",
        profile.title,
        conversation.generated_at.format(HEADER_TIME_FORMAT)
    )?;
    writeln!(writer, "Source: {}", conversation.source_location)?;
    writeln!(writer)?;

    for turn in &conversation.turns {
        writeln!(writer, "{}:", profile.label(turn.role))?;
        writeln!(writer, "{}", turn.body)?;
        writeln!(writer)?;
    }

    Ok(())
}

/// Render the header and every turn, then cap blank-line runs at two.
pub fn assemble(conversation: &Conversation, profile: &Profile) -> String {
    let mut buf = Vec::new();
    write_conversation(&mut buf, conversation, profile)
        .expect("writing into a Vec<u8> cannot fail");
    let text = String::from_utf8_lossy(&buf);
    LONG_BREAKS_RE.replace_all(&text, "\n\n\n").into_owned()
}
