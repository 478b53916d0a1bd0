//! Speech synthesis: an HTTP provider plus a per-session audio cache keyed
//! by message index.
//!
//! Synthesis failure is never an error to callers: the cache returns `None`
//! and the conversation carries on without audio.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ModelConfig, VoiceConfig};
use crate::errors::SynthesisError;

/// Ellipsis appended when the text is cut at the synthesis cap.
const TRUNCATION_MARKER: &str = "…";

/// Speech synthesis transport.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        format: &str,
    ) -> Result<Vec<u8>, SynthesisError>;
}

/// OpenAI-compatible `/audio/speech` provider.
pub struct HttpSpeechProvider {
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSpeechProvider {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechProvider {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        format: &str,
    ) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/audio/speech", self.api_base);
        let body = serde_json::json!({
            "model": "tts-1",
            "input": text,
            "voice": voice,
            "response_format": format,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| SynthesisError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ProviderStatus {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Lazily synthesized, memoized audio per message index. Cached audio is
/// voice-specific, so switching voice invalidates everything.
pub struct SpeechCache {
    entries: HashMap<usize, Vec<u8>>,
    voice: String,
    format: String,
}

impl SpeechCache {
    pub fn new() -> Self {
        let defaults = VoiceConfig::default();
        Self {
            entries: HashMap::new(),
            voice: defaults.voice,
            format: defaults.audio_format,
        }
    }

    pub fn with_voice(config: &VoiceConfig) -> Self {
        Self {
            entries: HashMap::new(),
            voice: config.voice.clone(),
            format: config.audio_format.clone(),
        }
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Switch the configured voice. A different voice drops all cached audio.
    pub fn set_voice(&mut self, voice: impl Into<String>) {
        let voice = voice.into();
        if voice != self.voice {
            debug!("voice changed {} -> {}, clearing speech cache", self.voice, voice);
            self.entries.clear();
            self.voice = voice;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return cached audio for `index`, synthesizing at most once per index.
    /// Text is truncated to `cap` characters (with an ellipsis) before the
    /// request. Failure returns `None` and stores nothing, so a later call
    /// may still succeed.
    pub async fn get_or_synthesize(
        &mut self,
        index: usize,
        text: &str,
        cap: usize,
        provider: &dyn SpeechProvider,
    ) -> Option<Vec<u8>> {
        if let Some(audio) = self.entries.get(&index) {
            debug!("speech cache hit for message {}", index);
            return Some(audio.clone());
        }

        let capped = truncate_for_synthesis(text, cap);
        match provider.synthesize(&capped, &self.voice, &self.format).await {
            Ok(audio) => {
                self.entries.insert(index, audio.clone());
                Some(audio)
            }
            Err(e) => {
                warn!("speech synthesis failed for message {}: {}", index, e);
                None
            }
        }
    }
}

impl Default for SpeechCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cap text at `cap` characters, appending an ellipsis when cut.
fn truncate_for_synthesis(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }
    let mut out: String = text.chars().take(cap).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}
