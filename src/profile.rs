//! Per-source configuration.
//!
//! Every supported chat site differs only in which elements hold the turns,
//! which of those are the user's, what counts as UI noise and how the export
//! is labelled. A [`Profile`] captures exactly that, so one engine serves all
//! of them. Built-in profiles can be replaced or extended from `config.toml`:
//!
//! ```toml
//! [[profiles]]
//! name = "mistral"
//! title = "Le Chat Export"
//! url_prefix = "https://chat.mistral.ai/chat/"
//! rules = [
//!     { selector = ".user-bubble", role = "user" },
//!     { selector = ".assistant-bubble", role = "assistant" },
//! ]
//! noise_tokens = ["Copy"]
//! ```
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CaptureError, Result};
use crate::segmenter::Role;
use crate::selector::Selector;
use crate::snapshot::Element;

/// A structural predicate plus the role its matches are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    pub selector: Selector,
    pub role: Role,
}

impl MatchRule {
    pub fn new(selector: &str, role: Role) -> Result<Self> {
        Ok(Self {
            selector: Selector::parse(selector)?,
            role,
        })
    }

    /// Parse the CLI form `ROLE=SELECTOR`, e.g. `user=.whitespace-pre-wrap`.
    pub fn parse_cli(arg: &str) -> Result<Self> {
        let (role, selector) = arg.split_once('=').ok_or_else(|| CaptureError::InvalidSelector {
            selector: arg.to_string(),
            reason: "expected ROLE=SELECTOR".into(),
        })?;
        let role = match role.trim().to_ascii_lowercase().as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => {
                return Err(CaptureError::InvalidSelector {
                    selector: arg.to_string(),
                    reason: format!("unknown role {other:?}"),
                });
            }
        };
        Self::new(selector, role)
    }
}

/// How embedded artifacts are recognised inside a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRule {
    /// Element that references an artifact (a preview button, a canvas card).
    pub marker: Selector,
    /// Element below the marker holding its title. Without one, the marker's
    /// own text is the title.
    #[serde(default)]
    pub title: Option<Selector>,
    /// Constant title for markers that carry none of their own.
    #[serde(default)]
    pub fixed_title: Option<String>,
    /// Titles that mean "no real title".
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,
}

fn default_placeholders() -> Vec<String> {
    vec!["Untitled".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// First word(s) of the header line, e.g. `Grok Chat Export`.
    #[serde(default = "default_title")]
    pub title: String,
    /// File name prefix; derived from `name` when not given.
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Location prefix used to pick this profile automatically.
    #[serde(default)]
    pub url_prefix: Option<String>,
    pub rules: Vec<MatchRule>,
    /// Whole-turn texts that are UI chrome rather than conversation.
    #[serde(default)]
    pub noise_tokens: Vec<String>,
    /// Regexes removed from each turn before blank lines are collapsed.
    #[serde(default)]
    pub strip_patterns: Vec<String>,
    #[serde(default)]
    pub attachments: Option<AttachmentRule>,
    #[serde(default = "yes")]
    pub strip_markdown: bool,
    #[serde(default = "default_user_label")]
    pub user_label: String,
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,
    #[serde(default = "default_attachments_heading")]
    pub attachments_heading: String,
    /// Deepest matched subtree that will still be converted.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_title() -> String {
    "Chat Export".to_string()
}

fn yes() -> bool {
    true
}

fn default_user_label() -> String {
    "ME".to_string()
}

fn default_assistant_label() -> String {
    "AI".to_string()
}

fn default_attachments_heading() -> String {
    "Attachments:".to_string()
}

fn default_max_depth() -> usize {
    512
}

impl Profile {
    /// A profile with default labels and no noise handling.
    pub fn new(name: &str, rules: Vec<MatchRule>) -> Self {
        Self {
            name: name.to_string(),
            title: default_title(),
            file_prefix: None,
            url_prefix: None,
            rules,
            noise_tokens: Vec::new(),
            strip_patterns: Vec::new(),
            attachments: None,
            strip_markdown: true,
            user_label: default_user_label(),
            assistant_label: default_assistant_label(),
            attachments_heading: default_attachments_heading(),
            max_depth: default_max_depth(),
        }
    }

    pub fn file_prefix(&self) -> String {
        self.file_prefix
            .clone()
            .unwrap_or_else(|| format!("{}_export_", slug::slugify(&self.name).replace('-', "_")))
    }

    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user_label,
            Role::Assistant => &self.assistant_label,
        }
    }

    /// Role of the first rule matching `el`, if any.
    pub fn classify(&self, el: &Element) -> Option<Role> {
        self.rules
            .iter()
            .find(|rule| rule.selector.matches(el))
            .map(|rule| rule.role)
    }

    pub fn is_noise(&self, text: &str) -> bool {
        self.noise_tokens.iter().any(|token| token == text)
    }

    pub fn compiled_strip_patterns(&self) -> Result<Vec<Regex>> {
        self.strip_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| CaptureError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Whether `location` lies under this profile's `url_prefix`.
    pub fn accepts(&self, location: &str) -> bool {
        let Some(prefix) = self.url_prefix.as_deref() else {
            return false;
        };
        match (Url::parse(prefix), Url::parse(location)) {
            (Ok(prefix), Ok(location)) => {
                prefix.scheme() == location.scheme()
                    && prefix.host_str() == location.host_str()
                    && location.path().starts_with(prefix.path())
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in profiles
// ---------------------------------------------------------------------------

fn rules(pairs: &[(&str, Role)]) -> Vec<MatchRule> {
    pairs.iter()
        .map(|(selector, role)| MatchRule {
            selector: Selector::parse(selector).expect("built-in selector is valid"),
            role: *role,
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn claude() -> Profile {
    Profile {
        title: "Chat Export".into(),
        file_prefix: Some("claude_chat_".into()),
        url_prefix: Some("https://claude.ai/chat/".into()),
        noise_tokens: strings(&["Copy", "Retry", "Edit"]),
        strip_patterns: strings(&[
            r"Claude can make mistakes\. Please double-check responses\.",
            r"Click to open code",
        ]),
        attachments: Some(AttachmentRule {
            marker: Selector::parse(r#"button[aria-label="Preview contents"]"#)
                .expect("built-in selector is valid"),
            title: Some(Selector::parse(".font-medium").expect("built-in selector is valid")),
            fixed_title: None,
            placeholders: default_placeholders(),
        }),
        ..Profile::new(
            "claude",
            rules(&[
                (r#"[data-testid="user-message"]"#, Role::User),
                (".font-claude-message", Role::Assistant),
            ]),
        )
    }
}

pub fn chatgpt() -> Profile {
    Profile {
        title: "ChatGPT Chat Export".into(),
        file_prefix: Some("chatgpt_export_".into()),
        url_prefix: Some("https://chatgpt.com/c/".into()),
        noise_tokens: strings(&["Copy"]),
        attachments: Some(AttachmentRule {
            marker: Selector::parse(".canvas").expect("built-in selector is valid"),
            title: None,
            fixed_title: Some("Canvas".into()),
            placeholders: default_placeholders(),
        }),
        ..Profile::new(
            "chatgpt",
            rules(&[
                (".whitespace-pre-wrap", Role::User),
                (".markdown.prose", Role::Assistant),
            ]),
        )
    }
}

pub fn grok() -> Profile {
    Profile {
        title: "Grok Chat Export".into(),
        file_prefix: Some("grok_export_".into()),
        url_prefix: Some("https://grok.com/chat/".into()),
        strip_patterns: strings(&[r"Thoughts\s*\n+\s*Expand for details\s*\n*"]),
        ..Profile::new(
            "grok",
            // The user bubble is a message bubble with two extra classes, so
            // it has to be tried first.
            rules(&[
                (".message-bubble.bg-foreground.border-input-border", Role::User),
                (".message-bubble", Role::Assistant),
            ]),
        )
    }
}

pub fn genai() -> Profile {
    Profile {
        title: "Page Text Export".into(),
        file_prefix: Some("extracted-text-".into()),
        url_prefix: Some("https://aistudio.google.com/".into()),
        ..Profile::new("genai", rules(&[(".col-content", Role::Assistant)]))
    }
}

pub fn builtins() -> Vec<Profile> {
    vec![claude(), chatgpt(), grok(), genai()]
}

/// Find a profile by name, preferring `custom` over the built-ins.
pub fn find(name: &str, custom: &[Profile]) -> Result<Profile> {
    custom
        .iter()
        .cloned()
        .chain(builtins())
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| CaptureError::UnknownProfile(name.to_string()))
}

/// Pick the profile whose `url_prefix` covers `location`.
pub fn detect(location: &str, custom: &[Profile]) -> Result<Profile> {
    custom
        .iter()
        .cloned()
        .chain(builtins())
        .find(|p| p.accepts(location))
        .ok_or_else(|| CaptureError::UnknownProfile(format!("no profile for {location}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://claude.ai/chat/0b7e", "claude")]
    #[case("https://chatgpt.com/c/67ab", "chatgpt")]
    #[case("https://grok.com/chat/xyz?foo=1", "grok")]
    #[case("https://aistudio.google.com/prompts/new_chat", "genai")]
    fn detects_builtin(#[case] location: &str, #[case] expected: &str) {
        assert_eq!(detect(location, &[]).unwrap().name, expected);
    }

    #[rstest]
    #[case("https://claude.ai/settings")]
    #[case("http://claude.ai/chat/1")]
    #[case("https://evil.example/https://claude.ai/chat/")]
    #[case("not a url")]
    fn rejects_unknown_location(#[case] location: &str) {
        assert!(matches!(
            detect(location, &[]),
            Err(CaptureError::UnknownProfile(_))
        ));
    }

    #[test]
    fn grok_user_rule_wins_over_generic_bubble() {
        let profile = grok();
        let user = Element::new("div")
            .class("message-bubble")
            .class("bg-foreground")
            .class("border-input-border");
        let assistant = Element::new("div").class("message-bubble");
        assert_eq!(profile.classify(&user), Some(Role::User));
        assert_eq!(profile.classify(&assistant), Some(Role::Assistant));
        assert_eq!(profile.classify(&Element::new("div")), None);
    }

    #[test]
    fn custom_profile_overrides_builtin() {
        let mut custom = Profile::new("claude", rules(&[(".mine", Role::User)]));
        custom.title = "Mine".into();
        assert_eq!(find("Claude", &[custom]).unwrap().title, "Mine");
        assert_eq!(find("claude", &[]).unwrap().title, "Chat Export");
        assert!(find("nope", &[]).is_err());
    }

    #[test]
    fn derived_file_prefix() {
        let profile = Profile::new("Le Chat", Vec::new());
        assert_eq!(profile.file_prefix(), "le_chat_export_");
        assert_eq!(claude().file_prefix(), "claude_chat_");
    }

    #[test]
    fn parses_cli_rules() {
        let rule = MatchRule::parse_cli("user=.whitespace-pre-wrap").unwrap();
        assert_eq!(rule.role, Role::User);
        assert!(MatchRule::parse_cli("Assistant=div.x").is_ok());
        assert!(MatchRule::parse_cli("system=.x").is_err());
        assert!(MatchRule::parse_cli(".x").is_err());
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let profile: Profile = toml::from_str(
            r#"
            name = "mistral"
            rules = [
                { selector = ".user-bubble", role = "user" },
                { selector = ".assistant-bubble", role = "assistant" },
            ]
            [attachments]
            marker = "a.file-card"
            "#,
        )
        .unwrap();
        assert_eq!(profile.title, "Chat Export");
        assert_eq!(profile.user_label, "ME");
        assert!(profile.strip_markdown);
        assert_eq!(profile.max_depth, 512);
        assert_eq!(profile.rules[1].role, Role::Assistant);
        let attachments = profile.attachments.unwrap();
        assert_eq!(attachments.placeholders, ["Untitled"]);
        assert!(attachments.title.is_none());
    }

    #[test]
    fn bad_strip_pattern_is_reported() {
        let mut profile = grok();
        profile.strip_patterns.push("(unclosed".into());
        assert!(matches!(
            profile.compiled_strip_patterns(),
            Err(CaptureError::InvalidPattern { .. })
        ));
        assert_eq!(grok().compiled_strip_patterns().unwrap().len(), 1);
    }
}
