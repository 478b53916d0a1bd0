//! Interactive chat REPL.
//!
//! One turn at a time: read a line, run the pipeline, stream the reply to
//! the terminal, repeat. Slash commands mirror the session controls
//! (persona, language, role, voice, attachments, clear).

use std::io::Write;
use std::path::PathBuf;

use crate::augment::Augmentor;
use crate::config::Config;
use crate::i18n::{ui_string, Language, UiKey};
use crate::persona::{Persona, RoleDirective};
use crate::pipeline::run_turn;
use crate::providers::ChatProvider;
use crate::session::{ImageBlob, SessionContext, Speaker};
use crate::speech::SpeechProvider;
use crate::stream::CURSOR_MARKER;

/// Prints streaming frames incrementally: each frame is the full accumulator
/// plus a cursor, so only the unprinted suffix goes to the terminal. A
/// placeholder (the localized "thinking" indicator) is shown until the first
/// text arrives, then erased in place.
struct IncrementalPrinter {
    printed: usize,
    placeholder_width: Option<usize>,
}

impl IncrementalPrinter {
    fn with_placeholder(placeholder: &str) -> Self {
        print!("{}", placeholder);
        let _ = std::io::stdout().flush();
        Self {
            printed: 0,
            placeholder_width: Some(placeholder.chars().count()),
        }
    }

    /// Compute what the terminal still needs: an erase sequence for the
    /// placeholder (first output only) plus the unprinted text suffix.
    fn advance(&mut self, frame: &str) -> String {
        let text = frame.strip_suffix(CURSOR_MARKER).unwrap_or(frame);
        if text.len() <= self.printed {
            return String::new();
        }
        let mut out = String::new();
        if let Some(width) = self.placeholder_width.take() {
            out.push('\r');
            out.extend(std::iter::repeat(' ').take(width));
            out.push('\r');
        }
        out.push_str(&text[self.printed..]);
        self.printed = text.len();
        out
    }

    fn on_frame(&mut self, frame: &str) {
        let out = self.advance(frame);
        if !out.is_empty() {
            print!("{}", out);
            let _ = std::io::stdout().flush();
        }
    }

    /// Print whatever the final text added beyond the streamed frames
    /// (safety/error markers arrive without a frame).
    fn finish(&mut self, final_text: &str) {
        let mut out = self.advance(final_text);
        if let Some(width) = self.placeholder_width.take() {
            // No text at all arrived; just clear the placeholder.
            out.push('\r');
            out.extend(std::iter::repeat(' ').take(width));
            out.push('\r');
        }
        print!("{}", out);
        println!();
        let _ = std::io::stdout().flush();
    }
}

fn input_prompt(lang: Language) -> String {
    format!("{} > ", ui_string(lang, UiKey::PromptHint))
}

enum Action {
    Quit,
    Handled,
    Speak,
    Chat(String),
}

pub struct Repl {
    session: SessionContext,
    config: Config,
    chat: Box<dyn ChatProvider>,
    augmentor: Augmentor,
    speech: Box<dyn SpeechProvider>,
}

impl Repl {
    pub fn new(
        config: Config,
        chat: Box<dyn ChatProvider>,
        augmentor: Augmentor,
        speech: Box<dyn SpeechProvider>,
    ) -> Self {
        let mut session = SessionContext::new();
        session.speech = crate::speech::SpeechCache::with_voice(&config.voice);
        Self {
            session,
            config,
            chat,
            augmentor,
            speech,
        }
    }

    pub async fn run(&mut self) {
        println!("{}", ui_string(self.session.language, UiKey::Welcome));
        println!("Commands: /persona /language /role /voice /attach /speak /clear /status /quit\n");

        loop {
            print!("{}", input_prompt(self.session.language));
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
                break; // EOF
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.dispatch(line) {
                Action::Quit => break,
                Action::Handled => continue,
                Action::Speak => self.speak_last().await,
                Action::Chat(text) => self.chat_turn(&text).await,
            }
        }
    }

    async fn chat_turn(&mut self, text: &str) {
        let mut printer =
            IncrementalPrinter::with_placeholder(ui_string(self.session.language, UiKey::Thinking));
        let result = run_turn(
            &mut self.session,
            &self.config,
            self.chat.as_ref(),
            &mut self.augmentor,
            text,
            |frame| printer.on_frame(frame),
        )
        .await;
        printer.finish(&result.response.text);
    }

    fn dispatch(&mut self, line: &str) -> Action {
        if !line.starts_with('/') {
            return Action::Chat(line.to_string());
        }
        let (cmd, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match cmd {
            "/quit" | "/exit" => return Action::Quit,
            "/speak" => return Action::Speak,
            "/clear" => {
                self.session.clear();
                println!("{}", ui_string(self.session.language, UiKey::HistoryCleared));
            }
            "/persona" => match Persona::parse(arg) {
                Some(p) => {
                    self.session.persona = p;
                    println!("Switched to {} mode.", p.label());
                }
                None => {
                    let names: Vec<&str> = Persona::ALL.iter().map(|p| p.label()).collect();
                    println!("Usage: /persona <{}>", names.join("|"));
                }
            },
            "/language" => match Language::parse(arg) {
                Some(l) => {
                    self.session.language = l;
                    println!("Replies will be in {}.", l.label());
                }
                None => {
                    let names: Vec<&str> = Language::ALL.iter().map(|l| l.label()).collect();
                    println!("Usage: /language <{}>", names.join("|"));
                }
            },
            "/role" => {
                self.session.role = RoleDirective(arg.to_string());
                if arg.is_empty() {
                    println!("Role cleared.");
                } else {
                    println!("Role set.");
                }
            }
            "/voice" => {
                if arg.is_empty() {
                    println!("Current voice: {}", self.session.speech.voice());
                } else {
                    self.session.speech.set_voice(arg);
                    println!("Voice set to {} (cached audio cleared).", arg);
                }
            }
            "/attach" => match std::fs::read(arg) {
                Ok(bytes) => {
                    let name = PathBuf::from(arg)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_else(|| arg.to_string());
                    self.session.stage_image(ImageBlob::new(name, bytes));
                    println!(
                        "Attached ({} staged for the next message).",
                        self.session.staged_images().len()
                    );
                }
                Err(e) => println!("Could not read {}: {}", arg, e),
            },
            "/status" => {
                println!("Persona:  {}", self.session.persona.label());
                println!("Language: {}", self.session.language.label());
                println!("Voice:    {}", self.session.speech.voice());
                println!("Messages: {}", self.session.message_count());
                println!("Staged images: {}", self.session.staged_images().len());
            }
            other => println!("Unknown command: {}", other),
        }
        Action::Handled
    }

    /// Synthesize (or reuse cached) audio for the last assistant message and
    /// write it next to the config. Absence of audio is a normal outcome.
    async fn speak_last(&mut self) {
        let Some((index, text)) = self
            .session
            .messages()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.speaker == Speaker::Assistant)
            .map(|(i, m)| (i, m.text.clone()))
        else {
            println!("Nothing to speak yet.");
            return;
        };

        let cap = self.config.pipeline.speech_text_cap;
        let audio = self
            .session
            .speech
            .get_or_synthesize(index, &text, cap, self.speech.as_ref())
            .await;

        match audio {
            Some(bytes) => {
                let dir = crate::config::get_config_path()
                    .parent()
                    .map(|p| p.join("audio"))
                    .unwrap_or_else(|| PathBuf::from("audio"));
                let _ = std::fs::create_dir_all(&dir);
                let path = dir.join(format!(
                    "message_{}.{}",
                    index, self.config.voice.audio_format
                ));
                match std::fs::write(&path, bytes) {
                    Ok(()) => println!("Audio written to {}", path.display()),
                    Err(e) => println!("Could not write audio: {}", e),
                }
            }
            None => println!("Speech synthesis unavailable."),
        }
    }
}
