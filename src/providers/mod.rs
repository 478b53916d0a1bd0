pub mod base;
pub mod openai_compat;

pub use base::{ChatMessage, ChatProvider, StreamChunk, StreamHandle};
pub use openai_compat::OpenAiCompatProvider;
