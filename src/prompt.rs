//! Prompt composer: merges configuration, windowed history, and the current
//! turn (with image analyses and web snippet) into the ordered instruction
//! sequence sent to the model.
//!
//! Composition is deterministic: same inputs, same output. Augmentation and
//! image blocks attach only to the final (current) user entry, never
//! retroactively to historical entries.

use crate::i18n::Language;
use crate::persona::{Persona, RoleDirective};
use crate::providers::ChatMessage;
use crate::session::Message;

/// Fixed capability note so the model knows how to read the non-native
/// inputs the pipeline injects.
const CAPABILITY_NOTE: &str = "Messages may contain two kinds of injected context. \
    A block starting with 'PIXEL GRID:' is a hex-encoded image the user attached; \
    decode it per its preamble and describe or reason about the image naturally, \
    without mentioning the grid mechanics. A block starting with 'WEB SEARCH RESULTS' \
    or 'CONTENT FROM <url>' is live web information; treat it as current ground truth \
    and cite the source link when you rely on it.";

/// Inputs for one composition, current turn included.
pub struct TurnInput<'a> {
    pub text: &'a str,
    /// Rendered image analysis blocks, in attachment order.
    pub image_reports: &'a [String],
    pub web_snippet: Option<&'a str>,
}

/// Build the system directive: persona + role + language + capability note,
/// concatenated in fixed order.
pub fn system_directive(persona: Persona, role: &RoleDirective, language: Language) -> String {
    let mut parts = vec![persona.directive().to_string()];
    if !role.is_empty() {
        parts.push(role.0.trim().to_string());
    }
    parts.push(language.directive().to_string());
    parts.push(CAPABILITY_NOTE.to_string());
    parts.join("\n\n")
}

/// Compose the full instruction sequence: one system entry, the windowed
/// history chronologically, then the current user entry with its image
/// reports and web snippet appended after the literal text.
pub fn compose(
    persona: Persona,
    role: &RoleDirective,
    language: Language,
    history: &[Message],
    turn: &TurnInput<'_>,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_directive(persona, role, language)));

    for msg in history {
        messages.push(ChatMessage {
            role: msg.speaker.as_role().to_string(),
            content: msg.text.clone(),
        });
    }

    messages.push(ChatMessage::user(render_current_turn(turn)));
    messages
}

/// The current user entry: literal text, then each image block labeled
/// "IMAGE i" in attachment order, then the web snippet.
fn render_current_turn(turn: &TurnInput<'_>) -> String {
    let mut content = turn.text.to_string();
    for (i, report) in turn.image_reports.iter().enumerate() {
        content.push_str(&format!("\n\nIMAGE {}:\n{}", i + 1, report));
    }
    if let Some(snippet) = turn.web_snippet {
        content.push_str("\n\n");
        content.push_str(snippet);
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;

    fn history() -> Vec<Message> {
        vec![
            Message::new(Speaker::User, "hi", Vec::new()),
            Message::new(Speaker::Assistant, "hello!", Vec::new()),
        ]
    }

    fn plain_turn(text: &str) -> TurnInput<'_> {
        TurnInput {
            text,
            image_reports: &[],
            web_snippet: None,
        }
    }

    #[test]
    fn test_system_entry_first_with_fixed_order() {
        let msgs = compose(
            Persona::Professional,
            &RoleDirective("You act as a tax advisor.".into()),
            Language::French,
            &history(),
            &plain_turn("question"),
        );
        assert_eq!(msgs[0].role, "system");
        let sys = &msgs[0].content;
        let persona_pos = sys.find("professional AI assistant").unwrap();
        let role_pos = sys.find("tax advisor").unwrap();
        let lang_pos = sys.find("reply in French").unwrap();
        let cap_pos = sys.find("PIXEL GRID").unwrap();
        assert!(persona_pos < role_pos && role_pos < lang_pos && lang_pos < cap_pos);
    }

    #[test]
    fn test_history_in_chronological_order() {
        let msgs = compose(
            Persona::Friendly,
            &RoleDirective::default(),
            Language::English,
            &history(),
            &plain_turn("current"),
        );
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[1].role, "user");
        assert_eq!(msgs[1].content, "hi");
        assert_eq!(msgs[2].role, "assistant");
        assert_eq!(msgs[3].content, "current");
    }

    #[test]
    fn test_empty_role_omitted() {
        let sys = system_directive(Persona::Friendly, &RoleDirective("   ".into()), Language::English);
        assert!(!sys.contains("\n\n\n"));
        assert!(sys.contains("friendly AI assistant"));
    }

    #[test]
    fn test_image_reports_labeled_in_order() {
        let reports = vec!["first block".to_string(), "second block".to_string()];
        let turn = TurnInput {
            text: "what are these?",
            image_reports: &reports,
            web_snippet: None,
        };
        let msgs = compose(
            Persona::Friendly,
            &RoleDirective::default(),
            Language::English,
            &[],
            &turn,
        );
        let content = &msgs[1].content;
        let i1 = content.find("IMAGE 1:\nfirst block").unwrap();
        let i2 = content.find("IMAGE 2:\nsecond block").unwrap();
        assert!(content.starts_with("what are these?"));
        assert!(i1 < i2);
    }

    #[test]
    fn test_snippet_after_image_reports() {
        let reports = vec!["img".to_string()];
        let turn = TurnInput {
            text: "look",
            image_reports: &reports,
            web_snippet: Some("WEB SEARCH RESULTS for \"x\":"),
        };
        let msgs = compose(
            Persona::Friendly,
            &RoleDirective::default(),
            Language::English,
            &[],
            &turn,
        );
        let content = &msgs[1].content;
        assert!(content.find("IMAGE 1").unwrap() < content.find("WEB SEARCH RESULTS").unwrap());
    }

    #[test]
    fn test_historical_entries_never_augmented() {
        let mut hist = history();
        hist.push(Message::new(Speaker::User, "older question", Vec::new()));
        let turn = TurnInput {
            text: "new question",
            image_reports: &[],
            web_snippet: Some("SNIPPET"),
        };
        let msgs = compose(
            Persona::Friendly,
            &RoleDirective::default(),
            Language::English,
            &hist,
            &turn,
        );
        // Only the final user entry carries the snippet.
        for m in &msgs[1..msgs.len() - 1] {
            assert!(!m.content.contains("SNIPPET"));
        }
        assert!(msgs.last().unwrap().content.contains("SNIPPET"));
    }

    #[test]
    fn test_composition_deterministic() {
        let turn = TurnInput {
            text: "same",
            image_reports: &[],
            web_snippet: Some("snippet"),
        };
        let a = compose(
            Persona::Humorous,
            &RoleDirective("role".into()),
            Language::German,
            &history(),
            &turn,
        );
        let b = compose(
            Persona::Humorous,
            &RoleDirective("role".into()),
            Language::German,
            &history(),
            &turn,
        );
        assert_eq!(a, b);
    }
}
