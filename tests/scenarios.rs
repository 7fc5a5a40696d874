//! End-to-end exports of captured pages.

use chat_text_export::{
    Element, Node, Role, Severity, Snapshot, export_snapshot, normalize, profile, segment,
};
use chrono::{DateTime, TimeZone, Utc};

fn fixture(name: &str) -> Snapshot {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let json = std::fs::read_to_string(&path).unwrap();
    Snapshot::from_json(&json).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 15).unwrap()
}

/// Everything after the two header lines and the blank line.
fn body_of(text: &str) -> &str {
    let mut lines = text.splitn(4, '\n');
    let title = lines.next().unwrap();
    let source = lines.next().unwrap();
    assert!(title.contains(" - "), "{title}");
    assert!(source.starts_with("Source: "), "{source}");
    assert_eq!(lines.next(), Some(""));
    lines.next().unwrap_or("")
}

#[test]
fn user_text_and_assistant_list() {
    let root = Element::new("main")
        .child(
            Element::new("div")
                .attr("data-testid", "user-message")
                .text("Hello"),
        )
        .child(
            Element::new("div").class("font-claude-message").child(
                Element::new("ul")
                    .child(Element::new("li").text("a"))
                    .child(Element::new("li").text("b")),
            ),
        );
    let out = segment(&Node::from(root), &profile::claude());

    let turns: Vec<(Role, &str)> = out
        .turns
        .iter()
        .map(|t| (t.role, t.body.as_str()))
        .collect();
    assert_eq!(
        turns,
        [(Role::User, "Hello"), (Role::Assistant, "• a\n• b")]
    );
}

#[test]
fn inline_code_and_bold_are_unwrapped() {
    assert_eq!(normalize("Use `x=1` and **bold**"), "Use x=1 and bold");
}

#[test]
fn claude_page_end_to_end() {
    let snapshot = fixture("claude_chat.json");
    let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();

    assert!(export.diagnostics.is_empty(), "{:?}", export.diagnostics);
    assert_eq!(export.file_name, "claude_chat_2025-03-01T09-30-15-000Z.txt");

    let roles: Vec<Role> = export.turns.iter().map(|t| t.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(export.turns[3].attachments, ["Plan.md"]);

    assert!(export.text.starts_with("Chat Export - "));
    assert_eq!(
        body_of(&export.text),
        "ME:\nHello\n\n\
         AI:\n• a\n• b\n\n\
         ME:\nWrite the plan\n\n\
         AI:\nUse x=1 and bold\n\nUntitled\nPlan.md\n\n1. First\n2. Second\n3. Third\n\n\
         Attachments:\n[Plan.md]\n\n"
    );
}

#[test]
fn untitled_attachment_contributes_nothing() {
    let snapshot = fixture("claude_chat.json");
    let out = segment(&snapshot.root, &profile::claude());
    let attachments: Vec<&String> = out.turns.iter().flat_map(|t| &t.attachments).collect();
    assert_eq!(attachments, ["Plan.md"]);
    assert_eq!(
        out.turns[3].body.matches("[Plan.md]").count(),
        1,
        "{}",
        out.turns[3].body
    );
    assert!(!out.turns[3].body.contains("[Untitled]"));
}

#[test]
fn no_matching_subtrees() {
    let snapshot = fixture("no_messages.json");
    let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();
    assert!(export.turns.is_empty());
    assert!(
        export
            .diagnostics
            .iter()
            .all(|d| d.severity < Severity::Error)
    );
    assert_eq!(body_of(&export.text), "");
}

#[test]
fn grok_page_end_to_end() {
    let snapshot = fixture("grok_chat.json");
    let profile = profile::detect(&snapshot.location, &[]).unwrap();
    assert_eq!(profile.name, "grok");

    let export = export_snapshot(&snapshot, &profile, now()).unwrap();
    assert!(export.file_name.starts_with("grok_export_"));
    assert!(export.text.starts_with("Grok Chat Export - "));
    assert_eq!(
        body_of(&export.text),
        "ME:\nWhat is Rust?\n\nAI:\nA systems language.\n\n\nEnjoy!\n\n"
    );
}

#[test]
fn assembled_output_respects_break_limits() {
    for name in ["claude_chat.json", "grok_chat.json", "no_messages.json"] {
        let snapshot = fixture(name);
        let profile = profile::detect(&snapshot.location, &[]).unwrap();
        let out = segment(&snapshot.root, &profile);
        for turn in &out.turns {
            assert!(!turn.body.contains("\n\n\n"), "{name}: {:?}", turn.body);
        }
        let export = export_snapshot(&snapshot, &profile, now()).unwrap();
        assert!(!export.text.contains("\n\n\n\n"), "{name}");
        assert_eq!(normalize(&export.text), export.text, "{name}");
    }
}

/// A Claude page with a shallow user turn and an assistant turn wrapped in
/// `levels` spans.
fn page_with_deep_reply(levels: usize) -> String {
    let mut reply = String::from(r#"{"kind":"text","text":"deep answer"}"#);
    for _ in 0..levels {
        reply = format!(r#"{{"kind":"element","tag":"span","children":[{}]}}"#, reply);
    }
    format!(
        r#"{{
            "location": "https://claude.ai/chat/deep",
            "root": {{ "kind": "element", "tag": "main", "children": [
                {{ "kind": "element", "tag": "div",
                   "attributes": {{ "data-testid": "user-message" }},
                   "children": [{{ "kind": "text", "text": "Short question" }}] }},
                {{ "kind": "element", "tag": "div", "classes": ["font-claude-message"],
                   "children": [{}] }}
            ]}}
        }}"#,
        reply
    )
}

#[test]
fn deep_reply_within_limit_is_exported() {
    let snapshot = Snapshot::from_json(&page_with_deep_reply(100)).unwrap();
    let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();
    assert!(export.diagnostics.is_empty(), "{:?}", export.diagnostics);
    assert_eq!(
        body_of(&export.text),
        "ME:\nShort question\n\nAI:\ndeep answer\n\n"
    );
}

#[test]
fn overly_deep_reply_is_skipped_alone() {
    let snapshot = Snapshot::from_json(&page_with_deep_reply(600)).unwrap();
    let export = export_snapshot(&snapshot, &profile::claude(), now()).unwrap();

    assert_eq!(export.turns.len(), 1);
    assert_eq!(export.turns[0].role, Role::User);
    assert_eq!(export.turns[0].body, "Short question");

    let errors: Vec<_> = export
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1, "{:?}", export.diagnostics);
    assert!(errors[0].message.starts_with("Skipped turn #2"), "{}", errors[0].message);
    assert_eq!(export.diagnostics.len(), 1);
}
