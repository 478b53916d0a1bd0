//! Persona and role directives merged into the system prompt.

use serde::{Deserialize, Serialize};

/// Reply-style presets. Each maps to a fixed system-prompt fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Friendly,
    Professional,
    Humorous,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Friendly, Persona::Professional, Persona::Humorous];

    /// The system-prompt fragment for this persona.
    pub fn directive(&self) -> &'static str {
        match self {
            Persona::Friendly => {
                "You are a warm and friendly AI assistant who chats like a friend. \
                 Use a kind tone, appropriate emojis, and make conversations relaxed \
                 and pleasant."
            }
            Persona::Professional => {
                "You are a rigorous and professional AI assistant who provides accurate \
                 and reliable advice. Use a formal tone, focus on logic and accuracy, \
                 and give detailed explanations."
            }
            Persona::Humorous => {
                "You are a relaxed and humorous AI assistant who makes chatting fun. \
                 Use a witty tone, make appropriate jokes, but ensure information \
                 accuracy."
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Persona::Friendly => "Friendly",
            Persona::Professional => "Professional",
            Persona::Humorous => "Humorous",
        }
    }

    /// Parse a user-supplied name, case-insensitively.
    pub fn parse(name: &str) -> Option<Persona> {
        match name.trim().to_lowercase().as_str() {
            "friendly" => Some(Persona::Friendly),
            "professional" => Some(Persona::Professional),
            "humorous" => Some(Persona::Humorous),
            _ => None,
        }
    }
}

/// Optional role/job directive (e.g. "You act as a travel planner").
/// Free text, appended to the system prompt after the persona fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleDirective(pub String);

impl RoleDirective {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}
