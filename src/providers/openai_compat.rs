//! OpenAI-compatible streaming chat provider.
//!
//! Works with any `/chat/completions` endpoint that speaks the OpenAI SSE
//! dialect (Groq, OpenAI, OpenRouter, local servers).

use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::base::{ChatMessage, ChatProvider, StreamChunk, StreamHandle};
use crate::config::ModelConfig;
use crate::errors::ProviderError;

pub struct OpenAiCompatProvider {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            // No client-level timeout: the response is a long-lived stream.
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<StreamHandle> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "stream": true,
        });

        debug!("chat_stream: url={} model={}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("chat API returned status {}: {}", status, error_text);
            return Err(ProviderError::ServerError {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            parse_sse_stream(byte_stream, tx).await;
        });

        Ok(StreamHandle { rx })
    }
}

/// Parse an OpenAI-dialect SSE stream into [`StreamChunk`]s.
///
/// Emits a `TextDelta` per non-empty content delta and exactly one terminal
/// chunk: `SafetyBlocked` when the provider reports a content-filter finish,
/// `Error` on a transport failure mid-stream, `Done` otherwise.
async fn parse_sse_stream<S, B, E>(mut stream: S, tx: UnboundedSender<StreamChunk>)
where
    S: futures_util::Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut buffer = String::new();
    let mut blocked = false;

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => buffer.push_str(&String::from_utf8_lossy(bytes.as_ref())),
            Err(e) => {
                let _ = tx.send(StreamChunk::Error(e.to_string()));
                return;
            }
        }

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim_end_matches('\r').to_string();
            buffer.drain(..=pos);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data.trim() == "[DONE]" {
                let terminal = if blocked {
                    StreamChunk::SafetyBlocked
                } else {
                    StreamChunk::Done
                };
                let _ = tx.send(terminal);
                return;
            }

            let parsed: Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => {
                    debug!("skipping unparseable SSE line: {}", e);
                    continue;
                }
            };

            let choice = &parsed["choices"][0];
            if let Some(text) = choice["delta"]["content"].as_str() {
                if !text.is_empty() {
                    let _ = tx.send(StreamChunk::TextDelta(text.to_string()));
                }
            }
            if let Some(reason) = choice["finish_reason"].as_str() {
                if reason == "content_filter" {
                    blocked = true;
                }
            }
        }
    }

    // Stream closed without an explicit [DONE]; treat as normal completion.
    let terminal = if blocked {
        StreamChunk::SafetyBlocked
    } else {
        StreamChunk::Done
    };
    let _ = tx.send(terminal);
}
