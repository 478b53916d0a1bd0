//! End-to-end tests for the turn pipeline: augmentation decision, prompt
//! composition, streamed consumption, and log/cache behavior, with fake
//! transports standing in for the network collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use omnichat::augment::{Augmentor, WebClient};
use omnichat::config::Config;
use omnichat::errors::{AugmentError, SynthesisError};
use omnichat::pipeline::run_turn;
use omnichat::providers::{ChatMessage, ChatProvider, StreamChunk, StreamHandle};
use omnichat::session::{SessionContext, Speaker};
use omnichat::speech::SpeechProvider;
use omnichat::stream::{StreamOutcome, CURSOR_MARKER};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeChat {
    script: Mutex<Vec<StreamChunk>>,
    prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl FakeChat {
    fn new(script: Vec<StreamChunk>) -> (Self, Arc<Mutex<Vec<Vec<ChatMessage>>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                script: Mutex::new(script),
                prompts: prompts.clone(),
            },
            prompts,
        )
    }
}

#[async_trait]
impl ChatProvider for FakeChat {
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f64,
    ) -> Result<StreamHandle> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        for chunk in self.script.lock().unwrap().drain(..) {
            let _ = tx.send(chunk);
        }
        Ok(StreamHandle { rx })
    }
}

struct CountingWeb {
    fetches: Arc<AtomicUsize>,
    searches: Arc<AtomicUsize>,
}

impl CountingWeb {
    fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let searches = Arc::new(AtomicUsize::new(0));
        (
            Self {
                fetches: fetches.clone(),
                searches: searches.clone(),
            },
            fetches,
            searches,
        )
    }
}

const SEARCH_PAGE: &str = r#"
    <html><body>
    <div class="result">
        <a class="result__a" href="https://weather.example/paris">Paris Weather</a>
        <a class="result__snippet">Sunny, 24 degrees.</a>
    </div>
    <div class="result">
        <a class="result__a" href="https://news.example">Weather News</a>
        <a class="result__snippet">Forecast for today.</a>
    </div>
    </body></html>"#;

#[async_trait]
impl WebClient for CountingWeb {
    async fn get_html(&self, _url: &str) -> std::result::Result<String, AugmentError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok("<html><body><h1>Example Domain</h1><p>Sample page text.</p></body></html>".into())
    }

    async fn search_html(&self, _query: &str) -> std::result::Result<String, AugmentError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(SEARCH_PAGE.into())
    }
}

struct CountingSpeech {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SpeechProvider for CountingSpeech {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: &str,
        _format: &str,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1, 2, 3, 4])
    }
}

fn setup(script: Vec<StreamChunk>) -> (
    SessionContext,
    Config,
    FakeChat,
    Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    Augmentor,
    Arc<AtomicUsize>,
    Arc<AtomicUsize>,
) {
    let config = Config::default();
    let (chat, prompts) = FakeChat::new(script);
    let (web, fetches, searches) = CountingWeb::new();
    let augmentor = Augmentor::new(Box::new(web), &config.pipeline);
    (
        SessionContext::new(),
        config,
        chat,
        prompts,
        augmentor,
        fetches,
        searches,
    )
}

fn hello_script() -> Vec<StreamChunk> {
    vec![
        StreamChunk::TextDelta("Hel".into()),
        StreamChunk::TextDelta("lo".into()),
        StreamChunk::Done,
    ]
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn streamed_reply_is_persisted_without_cursor() {
    let (mut session, config, chat, _, mut aug, _, _) = setup(hello_script());
    let mut frames = Vec::new();

    let result = run_turn(&mut session, &config, &chat, &mut aug, "hi there", |f| {
        frames.push(f.to_string())
    })
    .await;

    assert_eq!(result.response.text, "Hello");
    assert_eq!(result.response.outcome, StreamOutcome::Completed);
    // Frames carried the cursor; the persisted message does not.
    assert!(frames.iter().all(|f| f.ends_with(CURSOR_MARKER)));
    assert!(!session.messages()[result.assistant_index]
        .text
        .contains(CURSOR_MARKER));
}

#[tokio::test]
async fn weather_query_takes_search_branch() {
    let (mut session, config, chat, prompts, mut aug, fetches, searches) = setup(hello_script());

    run_turn(
        &mut session,
        &config,
        &chat,
        &mut aug,
        "weather today in Paris",
        |_| {},
    )
    .await;

    assert_eq!(searches.load(Ordering::SeqCst), 1);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);

    let prompts = prompts.lock().unwrap();
    let user_entry = prompts[0].last().unwrap();
    assert!(user_entry.content.starts_with("weather today in Paris"));
    assert!(user_entry.content.contains("Paris Weather"));
    assert!(user_entry.content.contains("https://weather.example/paris"));
    assert!(user_entry.content.contains("Sunny, 24 degrees."));
}

#[tokio::test]
async fn url_takes_fetch_branch_even_with_keyword_overlap() {
    // "example.com" contains no keyword, but add one to force the overlap.
    let (mut session, config, chat, prompts, mut aug, fetches, searches) = setup(hello_script());

    run_turn(
        &mut session,
        &config,
        &chat,
        &mut aug,
        "what does https://example.com say about the weather",
        |_| {},
    )
    .await;

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(searches.load(Ordering::SeqCst), 0);

    let prompts = prompts.lock().unwrap();
    let user_entry = prompts[0].last().unwrap();
    assert!(user_entry.content.contains("CONTENT FROM https://example.com"));
    assert!(user_entry.content.contains("Example Domain"));
}

#[tokio::test]
async fn plain_chat_touches_no_web() {
    let (mut session, config, chat, prompts, mut aug, fetches, searches) = setup(hello_script());

    run_turn(&mut session, &config, &chat, &mut aug, "tell me a joke", |_| {}).await;

    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    assert_eq!(searches.load(Ordering::SeqCst), 0);
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts[0].last().unwrap().content, "tell me a joke");
}

#[tokio::test]
async fn system_entry_reflects_session_settings() {
    let (mut session, config, chat, prompts, mut aug, _, _) = setup(hello_script());
    session.persona = omnichat::persona::Persona::Professional;
    session.language = omnichat::i18n::Language::German;

    run_turn(&mut session, &config, &chat, &mut aug, "hallo", |_| {}).await;

    let prompts = prompts.lock().unwrap();
    let system = &prompts[0][0];
    assert_eq!(system.role, "system");
    assert!(system.content.contains("professional AI assistant"));
    assert!(system.content.contains("reply in German"));
}

#[tokio::test]
async fn multi_turn_history_flows_into_next_prompt() {
    let config = Config::default();
    let mut session = SessionContext::new();
    let (web, _, _) = CountingWeb::new();
    let mut aug = Augmentor::new(Box::new(web), &config.pipeline);

    let (chat1, _) = FakeChat::new(hello_script());
    run_turn(&mut session, &config, &chat1, &mut aug, "first message", |_| {}).await;

    let (chat2, prompts2) = FakeChat::new(vec![StreamChunk::Done]);
    run_turn(&mut session, &config, &chat2, &mut aug, "second message", |_| {}).await;

    let prompts = prompts2.lock().unwrap();
    let entries = &prompts[0];
    // system + 2 history entries + current.
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[1].content, "first message");
    assert_eq!(entries[2].role, "assistant");
    assert_eq!(entries[2].content, "Hello");
    assert_eq!(entries[3].content, "second message");
}

#[tokio::test]
async fn safety_block_is_visible_and_logged() {
    let script = vec![
        StreamChunk::TextDelta("Here is".into()),
        StreamChunk::SafetyBlocked,
    ];
    let (mut session, config, chat, _, mut aug, _, _) = setup(script);

    let result = run_turn(&mut session, &config, &chat, &mut aug, "hmm", |_| {}).await;

    assert_eq!(result.response.outcome, StreamOutcome::SafetyBlocked);
    let logged = &session.messages()[result.assistant_index].text;
    assert!(logged.starts_with("Here is"));
    assert!(logged.contains("blocked"));
    // Exactly what was shown is what was logged.
    assert_eq!(logged, &result.response.text);
}

#[tokio::test]
async fn speech_cache_synthesizes_once_per_message() {
    let (mut session, config, chat, _, mut aug, _, _) = setup(hello_script());
    let result = run_turn(&mut session, &config, &chat, &mut aug, "hi", |_| {}).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let speech = CountingSpeech { calls: calls.clone() };
    let cap = config.pipeline.speech_text_cap;
    let text = session.messages()[result.assistant_index].text.clone();

    let a = session
        .speech
        .get_or_synthesize(result.assistant_index, &text, cap, &speech)
        .await;
    let b = session
        .speech
        .get_or_synthesize(result.assistant_index, &text, cap, &speech)
        .await;

    assert!(a.is_some());
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn clear_resets_log_and_speech_cache() {
    let (mut session, config, chat, _, mut aug, _, _) = setup(hello_script());
    let result = run_turn(&mut session, &config, &chat, &mut aug, "hi", |_| {}).await;

    let speech = CountingSpeech {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    session
        .speech
        .get_or_synthesize(result.assistant_index, "Hello", 1500, &speech)
        .await;
    assert_eq!(session.speech.len(), 1);

    session.clear();
    assert_eq!(session.message_count(), 0);
    assert!(session.speech.is_empty());
}

#[tokio::test]
async fn assistant_message_speaker_is_assistant() {
    let (mut session, config, chat, _, mut aug, _, _) = setup(hello_script());
    let result = run_turn(&mut session, &config, &chat, &mut aug, "hi", |_| {}).await;
    assert_eq!(
        session.messages()[result.assistant_index].speaker,
        Speaker::Assistant
    );
    assert_eq!(session.messages()[0].speaker, Speaker::User);
}
