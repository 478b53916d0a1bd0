//! Base chat model provider interface.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One entry in the ordered instruction sequence sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A chunk from a streaming chat response.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Incremental text content.
    TextDelta(String),
    /// Stream ended normally.
    Done,
    /// The provider refused the response on content-policy grounds.
    SafetyBlocked,
    /// Transport or protocol failure; carries the raw error text.
    Error(String),
}

/// Handle to a streaming chat response. The channel is finite and
/// non-restartable: after a terminal chunk no further chunks arrive.
pub struct StreamHandle {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<StreamChunk>,
}

/// Abstract chat model transport. The pipeline only constructs its input and
/// consumes its output; timeouts are this collaborator's responsibility.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a streaming chat completion request.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<StreamHandle>;
}
