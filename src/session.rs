//! Session state for one signed-in conversation.
//!
//! All mutable conversation state lives in one explicit [`SessionContext`]
//! that is passed by reference through the pipeline, so every function's
//! dependencies are visible in its signature. Nothing here survives process
//! restart.

use chrono::{DateTime, Local};

use crate::speech::SpeechCache;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    /// Wire-format role string.
    pub fn as_role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// An uploaded image: raw bytes plus the declared filename. Owned by its
/// message once attached, never mutated.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// One entry in the conversation log. Immutable once appended; the pipeline
/// appends the assistant message only after streaming has finished, so the
/// log always reflects exactly what was shown to the user.
#[derive(Debug, Clone)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
    pub images: Vec<ImageBlob>,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(speaker: Speaker, text: impl Into<String>, images: Vec<ImageBlob>) -> Self {
        Self {
            speaker,
            text: text.into(),
            images,
            timestamp: Local::now(),
        }
    }
}

/// Session-wide conversation state.
pub struct SessionContext {
    pub persona: crate::persona::Persona,
    pub language: crate::i18n::Language,
    pub role: crate::persona::RoleDirective,
    /// Ordered conversation log.
    messages: Vec<Message>,
    /// Images staged for the *next* user turn. Drained on every send,
    /// whether the send succeeds or not.
    staged_images: Vec<ImageBlob>,
    /// Synthesized audio keyed by message index.
    pub speech: SpeechCache,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            persona: crate::persona::Persona::default(),
            language: crate::i18n::Language::default(),
            role: crate::persona::RoleDirective::default(),
            messages: Vec::new(),
            staged_images: Vec::new(),
            speech: SpeechCache::new(),
        }
    }

    /// Append a message to the log and return its index.
    pub fn push_message(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The most recent `k` messages in original order (the whole log if it
    /// is shorter). Older context is deliberately dropped to bound prompt
    /// size; this is a lossy policy, not a bug.
    pub fn window(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    /// Stage an image for the next turn.
    pub fn stage_image(&mut self, blob: ImageBlob) {
        self.staged_images.push(blob);
    }

    pub fn staged_images(&self) -> &[ImageBlob] {
        &self.staged_images
    }

    /// Remove and return all staged images. Called once per send, before the
    /// model call, so the staging list is empty after every send attempt.
    pub fn drain_staged_images(&mut self) -> Vec<ImageBlob> {
        std::mem::take(&mut self.staged_images)
    }

    /// Reset the conversation: log, staged images, and cached audio.
    /// Persona/language/role settings survive a clear.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.staged_images.clear();
        self.speech.clear();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(speaker: Speaker, text: &str) -> Message {
        Message::new(speaker, text, Vec::new())
    }

    #[test]
    fn test_window_shorter_log() {
        let mut ctx = SessionContext::new();
        ctx.push_message(msg(Speaker::User, "a"));
        ctx.push_message(msg(Speaker::Assistant, "b"));
        assert_eq!(ctx.window(10).len(), 2);
    }

    #[test]
    fn test_window_is_contiguous_suffix() {
        let mut ctx = SessionContext::new();
        for i in 0..15 {
            ctx.push_message(msg(Speaker::User, &format!("m{}", i)));
        }
        let win = ctx.window(10);
        assert_eq!(win.len(), 10);
        assert_eq!(win[0].text, "m5");
        assert_eq!(win[9].text, "m14");
    }

    #[test]
    fn test_window_zero() {
        let mut ctx = SessionContext::new();
        ctx.push_message(msg(Speaker::User, "a"));
        assert!(ctx.window(0).is_empty());
    }

    #[test]
    fn test_drain_staged_images_empties_staging() {
        let mut ctx = SessionContext::new();
        ctx.stage_image(ImageBlob::new("a.png", vec![1, 2, 3]));
        ctx.stage_image(ImageBlob::new("b.png", vec![4]));
        let drained = ctx.drain_staged_images();
        assert_eq!(drained.len(), 2);
        assert!(ctx.staged_images().is_empty());
        // A second drain yields nothing.
        assert!(ctx.drain_staged_images().is_empty());
    }

    #[test]
    fn test_clear_resets_log_but_keeps_settings() {
        let mut ctx = SessionContext::new();
        ctx.persona = crate::persona::Persona::Humorous;
        ctx.push_message(msg(Speaker::User, "hello"));
        ctx.stage_image(ImageBlob::new("x.png", vec![0]));
        ctx.clear();
        assert_eq!(ctx.message_count(), 0);
        assert!(ctx.staged_images().is_empty());
        assert_eq!(ctx.persona, crate::persona::Persona::Humorous);
    }

    #[test]
    fn test_push_message_returns_index() {
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.push_message(msg(Speaker::User, "a")), 0);
        assert_eq!(ctx.push_message(msg(Speaker::Assistant, "b")), 1);
    }
}
