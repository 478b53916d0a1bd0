//! Streaming response consumer.
//!
//! Folds a finite, non-restartable sequence of chunks into the assistant's
//! message text. State machine: `Idle -> Streaming -> {Completed,
//! SafetyBlocked, Errored}`. Each non-empty delta triggers one cooperative
//! display update (accumulator plus a cursor marker); the terminal text never
//! contains the cursor marker. The final text is exactly what gets persisted
//! to the message log.

use crate::providers::{StreamChunk, StreamHandle};

/// Cursor shown at the end of in-progress display frames.
pub const CURSOR_MARKER: &str = "▌";

/// Marker appended when the provider blocks the response. Distinct from an
/// error marker so the user can tell "refused" from "broke".
pub const BLOCKED_MARKER: &str = "\n\n*[The response was blocked by the provider's content policy.]*";

/// How a stream reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    SafetyBlocked,
    Errored,
}

/// Final consumed response: the text to persist and how the stream ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalResponse {
    pub text: String,
    pub outcome: StreamOutcome,
}

/// Consume a stream to its terminal state. `on_frame` is called once per
/// non-empty delta with the current display frame; the caller folds frames
/// into its display buffer however it likes.
pub async fn consume_stream<F>(mut handle: StreamHandle, mut on_frame: F) -> FinalResponse
where
    F: FnMut(&str),
{
    let mut accumulator = String::new();

    while let Some(chunk) = handle.rx.recv().await {
        match chunk {
            StreamChunk::TextDelta(delta) => {
                if delta.is_empty() {
                    continue;
                }
                accumulator.push_str(&delta);
                let frame = format!("{}{}", accumulator, CURSOR_MARKER);
                on_frame(&frame);
            }
            StreamChunk::Done => {
                return FinalResponse {
                    text: accumulator,
                    outcome: StreamOutcome::Completed,
                };
            }
            StreamChunk::SafetyBlocked => {
                accumulator.push_str(BLOCKED_MARKER);
                return FinalResponse {
                    text: accumulator,
                    outcome: StreamOutcome::SafetyBlocked,
                };
            }
            StreamChunk::Error(raw) => {
                // Raw error text is kept inline for diagnosability.
                accumulator.push_str(&format!("\n\n[error: {}]", raw));
                return FinalResponse {
                    text: accumulator,
                    outcome: StreamOutcome::Errored,
                };
            }
        }
    }

    // Sender dropped without a terminal chunk; treat as normal close.
    FinalResponse {
        text: accumulator,
        outcome: StreamOutcome::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_from(chunks: Vec<StreamChunk>) -> StreamHandle {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        for c in chunks {
            tx.send(c).unwrap();
        }
        StreamHandle { rx }
    }

    #[tokio::test]
    async fn test_deltas_accumulate_to_final_text() {
        let handle = handle_from(vec![
            StreamChunk::TextDelta("Hel".into()),
            StreamChunk::TextDelta("lo".into()),
            StreamChunk::Done,
        ]);
        let resp = consume_stream(handle, |_| {}).await;
        assert_eq!(resp.text, "Hello");
        assert_eq!(resp.outcome, StreamOutcome::Completed);
        assert!(!resp.text.contains(CURSOR_MARKER));
    }

    #[tokio::test]
    async fn test_frames_carry_cursor_marker() {
        let handle = handle_from(vec![
            StreamChunk::TextDelta("a".into()),
            StreamChunk::TextDelta("b".into()),
            StreamChunk::Done,
        ]);
        let mut frames = Vec::new();
        let resp = consume_stream(handle, |f| frames.push(f.to_string())).await;
        assert_eq!(frames, vec![format!("a{}", CURSOR_MARKER), format!("ab{}", CURSOR_MARKER)]);
        assert_eq!(resp.text, "ab");
    }

    #[tokio::test]
    async fn test_empty_deltas_do_not_update_display() {
        let handle = handle_from(vec![
            StreamChunk::TextDelta(String::new()),
            StreamChunk::TextDelta("x".into()),
            StreamChunk::Done,
        ]);
        let mut frames = 0usize;
        consume_stream(handle, |_| frames += 1).await;
        assert_eq!(frames, 1);
    }

    #[tokio::test]
    async fn test_safety_block_appends_marker_and_keeps_partial() {
        let handle = handle_from(vec![
            StreamChunk::TextDelta("I was saying".into()),
            StreamChunk::SafetyBlocked,
        ]);
        let resp = consume_stream(handle, |_| {}).await;
        assert_eq!(resp.outcome, StreamOutcome::SafetyBlocked);
        assert!(resp.text.starts_with("I was saying"));
        assert!(resp.text.ends_with(BLOCKED_MARKER));
    }

    #[tokio::test]
    async fn test_error_appends_raw_error_text() {
        let handle = handle_from(vec![
            StreamChunk::TextDelta("partial".into()),
            StreamChunk::Error("connection reset by peer".into()),
        ]);
        let resp = consume_stream(handle, |_| {}).await;
        assert_eq!(resp.outcome, StreamOutcome::Errored);
        assert!(resp.text.starts_with("partial"));
        assert!(resp.text.contains("[error: connection reset by peer]"));
    }

    #[tokio::test]
    async fn test_sender_drop_counts_as_completion() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(StreamChunk::TextDelta("cut ".into())).unwrap();
        tx.send(StreamChunk::TextDelta("off".into())).unwrap();
        drop(tx);
        let resp = consume_stream(StreamHandle { rx }, |_| {}).await;
        assert_eq!(resp.text, "cut off");
        assert_eq!(resp.outcome, StreamOutcome::Completed);
    }
}
