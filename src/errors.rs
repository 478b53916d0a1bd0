//! Domain error types for omnichat.
//!
//! Every variant here corresponds to a recoverable pipeline failure: nothing
//! in the turn pipeline aborts silently. Failures degrade to inline marker
//! text in the assistant message (encode/augment/stream) or to an absent
//! result (speech synthesis).

use thiserror::Error;

/// Errors from the chat model transport.
///
/// Embedded in `anyhow::Error` at the `ChatProvider` boundary so callers can
/// downcast when they need the structured variant.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to read response body: {0}")]
    ResponseReadError(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParseError(String),

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
}

/// Errors from image decoding and encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to decode image '{filename}': {reason}")]
    DecodeFailed { filename: String, reason: String },
}

/// Errors from the web augmentation layer (fetch or search).
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("URL rejected: {0}")]
    UrlRejected(String),

    #[error("Search failed for '{query}': {reason}")]
    SearchFailed { query: String, reason: String },
}

/// Errors from speech synthesis. Always swallowed at the cache boundary:
/// callers observe `None`, never an error.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesis request failed: {0}")]
    RequestFailed(String),

    #[error("Synthesis provider returned status {status}: {message}")]
    ProviderStatus { status: u16, message: String },
}
