//! Configuration schema for omnichat.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON
//! config file can use camelCase keys while Rust code uses snake_case fields.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// Chat model transport configuration (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// API key. Empty means "read OMNICHAT_API_KEY from the environment".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f64 {
    0.7
}

impl ModelConfig {
    /// Resolve the API key, falling back to the environment.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("OMNICHAT_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .unwrap_or_default()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Tunables for the context-assembly pipeline.
///
/// The grid size and edge threshold are empirically chosen and kept
/// configurable rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// How many trailing messages of history go into each prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Side length of the square pixel grid images are resampled to.
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    /// Summed-RGB delta (out of 765) above which a pixel counts as an edge.
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: u32,
    /// Character budget per fetched web page.
    #[serde(default = "default_fetch_char_budget")]
    pub fetch_char_budget: usize,
    /// Maximum search results rendered into the prompt.
    #[serde(default = "default_search_result_count")]
    pub search_result_count: usize,
    /// TTL for cached search results, in seconds.
    #[serde(default = "default_search_ttl_secs")]
    pub search_ttl_secs: u64,
    /// TTL for cached fetched pages, in seconds.
    #[serde(default = "default_page_ttl_secs")]
    pub page_ttl_secs: u64,
    /// Character cap on text sent to speech synthesis.
    #[serde(default = "default_speech_text_cap")]
    pub speech_text_cap: usize,
}

fn default_history_window() -> usize {
    10
}

fn default_grid_size() -> u32 {
    64
}

fn default_edge_threshold() -> u32 {
    30
}

fn default_fetch_char_budget() -> usize {
    5000
}

fn default_search_result_count() -> usize {
    5
}

fn default_search_ttl_secs() -> u64 {
    3600
}

fn default_page_ttl_secs() -> u64 {
    1800
}

fn default_speech_text_cap() -> usize {
    1500
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            grid_size: default_grid_size(),
            edge_threshold: default_edge_threshold(),
            fetch_char_budget: default_fetch_char_budget(),
            search_result_count: default_search_result_count(),
            search_ttl_secs: default_search_ttl_secs(),
            page_ttl_secs: default_page_ttl_secs(),
            speech_text_cap: default_speech_text_cap(),
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            audio_format: default_audio_format(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl Config {
    /// Set one value by its dotted JSON key, e.g. `pipeline.historyWindow`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "model.apiBase" => self.model.api_base = value.to_string(),
            "model.apiKey" => self.model.api_key = value.to_string(),
            "model.model" => self.model.model = value.to_string(),
            "model.maxTokens" => self.model.max_tokens = parse_field(key, value)?,
            "model.temperature" => self.model.temperature = parse_field(key, value)?,
            "pipeline.historyWindow" => self.pipeline.history_window = parse_field(key, value)?,
            "pipeline.gridSize" => self.pipeline.grid_size = parse_field(key, value)?,
            "pipeline.edgeThreshold" => self.pipeline.edge_threshold = parse_field(key, value)?,
            "pipeline.fetchCharBudget" => {
                self.pipeline.fetch_char_budget = parse_field(key, value)?
            }
            "pipeline.searchResultCount" => {
                self.pipeline.search_result_count = parse_field(key, value)?
            }
            "pipeline.searchTtlSecs" => self.pipeline.search_ttl_secs = parse_field(key, value)?,
            "pipeline.pageTtlSecs" => self.pipeline.page_ttl_secs = parse_field(key, value)?,
            "pipeline.speechTextCap" => self.pipeline.speech_text_cap = parse_field(key, value)?,
            "voice.voice" => self.voice.voice = value.to_string(),
            "voice.audioFormat" => self.voice.audio_format = value.to_string(),
            _ => bail!("unknown config key: {}", key),
        }
        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow!("invalid value for {}: {}", key, e))
}
