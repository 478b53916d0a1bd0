//! Language support: a closed set of language codes with per-language reply
//! directives and UI strings.
//!
//! The UI-string table is total by construction: `ui_string` matches on
//! `(Language, UiKey)` exhaustively, so a missing entry is a compile error
//! rather than a runtime surprise. English is the mandatory fallback for
//! anything added later.

use serde::{Deserialize, Serialize};

/// Supported reply languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Spanish,
    French,
    German,
    Chinese,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Chinese,
    ];

    /// System-prompt directive telling the model which language to answer in.
    pub fn directive(&self) -> &'static str {
        match self {
            Language::English => "Always reply in English.",
            Language::Spanish => "Always reply in Spanish (español).",
            Language::French => "Always reply in French (français).",
            Language::German => "Always reply in German (Deutsch).",
            Language::Chinese => "Always reply in Simplified Chinese (简体中文).",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Chinese => "Chinese",
        }
    }

    /// Parse a language name or ISO-639 code, case-insensitively.
    pub fn parse(name: &str) -> Option<Language> {
        match name.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Language::English),
            "spanish" | "es" => Some(Language::Spanish),
            "french" | "fr" => Some(Language::French),
            "german" | "de" => Some(Language::German),
            "chinese" | "zh" => Some(Language::Chinese),
            _ => None,
        }
    }
}

/// Keys for localized UI strings shown by the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiKey {
    Welcome,
    PromptHint,
    HistoryCleared,
    Thinking,
}

/// Look up a UI string. Total over `(Language, UiKey)`.
pub fn ui_string(lang: Language, key: UiKey) -> &'static str {
    match (lang, key) {
        (Language::English, UiKey::Welcome) => "Welcome! Ask me anything.",
        (Language::English, UiKey::PromptHint) => "Type your message",
        (Language::English, UiKey::HistoryCleared) => "Chat history cleared.",
        (Language::English, UiKey::Thinking) => "thinking...",

        (Language::Spanish, UiKey::Welcome) => "¡Bienvenido! Pregúntame lo que quieras.",
        (Language::Spanish, UiKey::PromptHint) => "Escribe tu mensaje",
        (Language::Spanish, UiKey::HistoryCleared) => "Historial de chat borrado.",
        (Language::Spanish, UiKey::Thinking) => "pensando...",

        (Language::French, UiKey::Welcome) => "Bienvenue ! Posez-moi vos questions.",
        (Language::French, UiKey::PromptHint) => "Tapez votre message",
        (Language::French, UiKey::HistoryCleared) => "Historique effacé.",
        (Language::French, UiKey::Thinking) => "réflexion...",

        (Language::German, UiKey::Welcome) => "Willkommen! Frag mich alles.",
        (Language::German, UiKey::PromptHint) => "Nachricht eingeben",
        (Language::German, UiKey::HistoryCleared) => "Chatverlauf gelöscht.",
        (Language::German, UiKey::Thinking) => "denke nach...",

        (Language::Chinese, UiKey::Welcome) => "欢迎！有什么想聊的都可以问我。",
        (Language::Chinese, UiKey::PromptHint) => "请输入消息",
        (Language::Chinese, UiKey::HistoryCleared) => "聊天记录已清空。",
        (Language::Chinese, UiKey::Thinking) => "思考中...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: [UiKey; 4] = [
        UiKey::Welcome,
        UiKey::PromptHint,
        UiKey::HistoryCleared,
        UiKey::Thinking,
    ];

    #[test]
    fn test_table_complete_for_every_language() {
        for lang in Language::ALL {
            for key in ALL_KEYS {
                assert!(
                    !ui_string(lang, key).is_empty(),
                    "empty UI string for {:?}/{:?}",
                    lang,
                    key
                );
            }
            assert!(!lang.directive().is_empty());
        }
    }

    #[test]
    fn test_parse_codes_and_names() {
        assert_eq!(Language::parse("en"), Some(Language::English));
        assert_eq!(Language::parse("Spanish"), Some(Language::Spanish));
        assert_eq!(Language::parse("FR"), Some(Language::French));
        assert_eq!(Language::parse("chinese"), Some(Language::Chinese));
        assert_eq!(Language::parse("klingon"), None);
    }
}
