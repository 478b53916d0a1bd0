//! Turn orchestration: one user turn in, one assistant message out.
//!
//! Control flow: encode staged images -> web augmentation -> history window
//! -> prompt composition -> model call -> streamed consumption -> log append.
//! Turn-synchronous: the call runs to a terminal state before the next turn
//! may begin, and every failure along the way degrades to a visible marker
//! in the assistant message rather than aborting the turn.

use tracing::debug;

use crate::augment::Augmentor;
use crate::config::Config;
use crate::prompt::{self, TurnInput};
use crate::providers::ChatProvider;
use crate::session::{Message, SessionContext, Speaker};
use crate::stream::{consume_stream, FinalResponse, StreamOutcome};
use crate::vision;

/// Result of one completed turn.
pub struct TurnResult {
    /// Log index of the appended assistant message.
    pub assistant_index: usize,
    pub response: FinalResponse,
}

/// Run one user turn to completion. `on_frame` receives each incremental
/// display frame during streaming.
///
/// The staging image list is drained up front, so it is empty after every
/// send attempt regardless of outcome.
pub async fn run_turn<F>(
    session: &mut SessionContext,
    config: &Config,
    chat: &dyn ChatProvider,
    augmentor: &mut Augmentor,
    text: &str,
    mut on_frame: F,
) -> TurnResult
where
    F: FnMut(&str),
{
    let images = session.drain_staged_images();

    let image_reports: Vec<String> = images
        .iter()
        .map(|blob| vision::encode(blob, &config.pipeline))
        .collect();

    let web_snippet = augmentor.augment(text).await;

    // Window the log before appending the current turn, so the current user
    // entry appears exactly once in the composed sequence.
    let history: Vec<Message> = session
        .window(config.pipeline.history_window)
        .to_vec();

    let turn = TurnInput {
        text,
        image_reports: &image_reports,
        web_snippet: web_snippet.as_deref(),
    };
    let messages = prompt::compose(session.persona, &session.role, session.language, &history, &turn);

    debug!(
        "turn: {} prompt entries, {} image(s), augmented={}",
        messages.len(),
        image_reports.len(),
        web_snippet.is_some()
    );

    session.push_message(Message::new(Speaker::User, text, images));

    let response = match chat
        .chat_stream(&messages, config.model.max_tokens, config.model.temperature)
        .await
    {
        Ok(handle) => consume_stream(handle, &mut on_frame).await,
        Err(e) => FinalResponse {
            text: format!(
                "Error: {}\n\nPlease check if your API key is configured correctly.",
                e
            ),
            outcome: StreamOutcome::Errored,
        },
    };

    // The appended assistant message is exactly what was shown to the user.
    let assistant_index =
        session.push_message(Message::new(Speaker::Assistant, response.text.clone(), Vec::new()));

    TurnResult {
        assistant_index,
        response,
    }
}
