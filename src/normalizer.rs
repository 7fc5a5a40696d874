//! Markdown marker removal.
//!
//! Assistant replies often reach the page with their markdown source still
//! visible. [`normalize`] strips it with a fixed cascade of substitutions.
//! The order of [`CASCADE`] is load-bearing:
//!
//! 1. fenced code blocks go first, so a fence is never read as inline code;
//! 2. inline code spans are unwrapped;
//! 3. images are removed and 4. links unwrapped before any emphasis rule
//!    runs, because emphasis markers may sit inside link text;
//! 5. bold is unwrapped before 6. italic, whose single markers would
//!    otherwise eat half of every `**`;
//! 7. whatever marker characters are left are dropped one by one.
//!
//! A single pass is not always a fixed point (`[[a](b)](c)` needs two), so
//! the cascade is repeated until the text stops changing. Every step shortens
//! the text when it fires, which bounds the number of rounds.
use std::sync::LazyLock;

use regex::{Captures, Regex};

struct Step {
    name: &'static str,
    pattern: Regex,
    replace: fn(&Captures) -> String,
}

fn step(name: &'static str, pattern: &str, replace: fn(&Captures) -> String) -> Step {
    Step {
        name,
        pattern: Regex::new(pattern).unwrap(),
        replace,
    }
}

fn remove(_: &Captures) -> String {
    String::new()
}

fn first_group(caps: &Captures) -> String {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or_else(String::new, |m| m.as_str().to_string())
}

static CASCADE: LazyLock<Vec<Step>> = LazyLock::new(|| {
    vec![
        step("code block", r"(?s)```.*?```", remove),
        step("inline code", r"`([^`]+)`", first_group),
        step("image", r"!\[.*?\]\(.*?\)", remove),
        step("link", r"\[(.*?)\]\(.*?\)", first_group),
        step("bold", r"\*\*(.*?)\*\*|__(.*?)__", first_group),
        step("italic", r"\*(.*?)\*|_(.*?)_", first_group),
        step("stray marker", r"[*_~`]", remove),
    ]
});

/// Apply the whole cascade once.
fn apply_cascade(text: &str) -> String {
    CASCADE.iter().fold(text.to_string(), |acc, step| {
        if !step.pattern.is_match(&acc) {
            return acc;
        }
        tracing::trace!(step = step.name, "normalizer step applied");
        step.pattern
            .replace_all(&acc, |caps: &Captures| (step.replace)(caps))
            .into_owned()
    })
}

/// Remove residual markdown formatting. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut current = apply_cascade(text);
    loop {
        let next = apply_cascade(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
