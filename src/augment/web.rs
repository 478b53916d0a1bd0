//! Web augmentor: injects live web content into the prompt.
//!
//! Decision policy, first match wins:
//! 1. the text contains URLs -> fetch each page verbatim;
//! 2. the text contains a trigger keyword -> run a web search;
//! 3. otherwise -> no augmentation.
//!
//! Both paths are cached with a TTL so retried and repeated turns don't
//! re-hit the network. Every failure degrades to a short inline marker; the
//! turn always proceeds.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::augment::cache::TtlCache;
use crate::config::PipelineConfig;
use crate::errors::AugmentError;

/// Browser-like user agent for fetch and search requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36";

/// Timeout for each outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// No-JS HTML search endpoint.
const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Trigger keywords denoting requests for current/external information.
/// English-only by design; non-English phrasing will not trigger a search.
const TRIGGER_KEYWORDS: [&str; 9] = [
    "search", "latest", "weather", "today", "news", "current", "how to", "price", "score",
];

/// Generic `scheme://...` token pattern.
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s<>\x22]+").unwrap());

/// One parsed search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Transport seam for fetch and search. The HTTP implementation is swapped
/// for a recording fake in tests.
#[async_trait]
pub trait WebClient: Send + Sync {
    /// GET a URL and return the raw response body.
    async fn get_html(&self, url: &str) -> Result<String, AugmentError>;

    /// GET the search endpoint for a query and return the raw results page.
    async fn search_html(&self, query: &str) -> Result<String, AugmentError>;
}

/// Reqwest-backed [`WebClient`].
pub struct HttpWebClient {
    client: reqwest::Client,
}

impl HttpWebClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for HttpWebClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebClient for HttpWebClient {
    async fn get_html(&self, url: &str) -> Result<String, AugmentError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| AugmentError::FetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AugmentError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        response.text().await.map_err(|e| AugmentError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn search_html(&self, query: &str) -> Result<String, AugmentError> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| AugmentError::SearchFailed {
                query: query.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AugmentError::SearchFailed {
                query: query.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        response.text().await.map_err(|e| AugmentError::SearchFailed {
            query: query.to_string(),
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract all `scheme://...` tokens from the text, in order of appearance.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(&[',', '.', ')', ']'][..]).to_string())
        .collect()
}

/// True when any trigger keyword appears in the text (case-insensitive
/// substring match).
pub fn has_trigger_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRIGGER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Validate a URL before fetching: must be http(s) with a non-private host.
/// Blocks local and private addresses so a pasted URL can't reach internal
/// services.
pub fn validate_url(url_str: &str) -> Result<(), AugmentError> {
    let parsed = Url::parse(url_str)
        .map_err(|e| AugmentError::UrlRejected(format!("invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AugmentError::UrlRejected(format!(
                "only http/https allowed, got '{}'",
                other
            )))
        }
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| AugmentError::UrlRejected("missing domain".to_string()))?;

    let lower = host.to_lowercase();
    if lower == "localhost"
        || lower == "0.0.0.0"
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return Err(AugmentError::UrlRejected(format!(
            "access to local host '{}' is blocked",
            host
        )));
    }

    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        let blocked = match ip {
            std::net::IpAddr::V4(v4) => {
                v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
            }
            std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
        };
        if blocked {
            return Err(AugmentError::UrlRejected(format!(
                "access to private/local IP '{}' is blocked",
                ip
            )));
        }
    }

    Ok(())
}

/// Remove script/style blocks and HTML tags, decode entities.
fn strip_tags(text: &str) -> String {
    static RE_SCRIPT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<script[\s\S]*?</script>").unwrap());
    static RE_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style[\s\S]*?</style>").unwrap());
    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

    let text = RE_SCRIPT.replace_all(text, "");
    let text = RE_STYLE.replace_all(&text, "");
    let text = RE_TAGS.replace_all(&text, " ");
    html_escape::decode_html_entities(&text).trim().to_string()
}

/// Collapse runs of spaces/tabs and limit consecutive newlines.
fn normalize_whitespace(text: &str) -> String {
    static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
    static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

    let text = RE_SPACES.replace_all(text, " ");
    RE_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Truncate to at most `max_chars` characters.
fn truncate_at_boundary(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Parse the no-JS results page into title/link/snippet triples. Returns an
/// empty list when the expected container structure is absent.
pub fn parse_search_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for container in document.select(&result_sel) {
        let Some(anchor) = container.select(&title_sel).next() else {
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();
        let link = anchor.value().attr("href").unwrap_or("").to_string();
        let snippet = container
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        if title.is_empty() {
            continue;
        }
        results.push(SearchResult { title, link, snippet });
        if results.len() >= max_results {
            break;
        }
    }
    results
}

fn render_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("[no web results found for: {}]", query);
    }
    let mut lines = vec![format!("WEB SEARCH RESULTS for \"{}\":", query)];
    for (i, r) in results.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, r.title));
        if !r.snippet.is_empty() {
            lines.push(format!("   {}", r.snippet));
        }
        lines.push(format!("   {}", r.link));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Augmentor
// ---------------------------------------------------------------------------

/// Decides whether a user turn needs web augmentation and produces the
/// snippet. Owns the two TTL caches for the session's lifetime.
pub struct Augmentor {
    client: Box<dyn WebClient>,
    page_cache: TtlCache<String>,
    search_cache: TtlCache<Vec<SearchResult>>,
    fetch_char_budget: usize,
    search_result_count: usize,
}

impl Augmentor {
    pub fn new(client: Box<dyn WebClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            page_cache: TtlCache::new(Duration::from_secs(config.page_ttl_secs)),
            search_cache: TtlCache::new(Duration::from_secs(config.search_ttl_secs)),
            fetch_char_budget: config.fetch_char_budget,
            search_result_count: config.search_result_count,
        }
    }

    /// Produce the augmentation snippet for one user turn, or `None` when
    /// neither path triggers. URL fetch strictly precedes keyword search;
    /// at most one path runs.
    pub async fn augment(&mut self, text: &str) -> Option<String> {
        let urls = find_urls(text);
        if !urls.is_empty() {
            return Some(self.fetch_all(&urls).await);
        }
        if has_trigger_keyword(text) {
            return Some(self.search(text).await);
        }
        None
    }

    /// Fetch each URL and concatenate per-URL blocks labeled with their
    /// source. Individual failures become inline markers.
    async fn fetch_all(&mut self, urls: &[String]) -> String {
        let mut blocks = Vec::with_capacity(urls.len());
        for url in urls {
            let body = match self.fetch_one(url).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("web fetch failed for {}: {}", url, e);
                    format!("[could not fetch {}: {}]", url, e)
                }
            };
            blocks.push(format!("CONTENT FROM {}:\n{}", url, body));
        }
        blocks.join("\n\n")
    }

    async fn fetch_one(&mut self, url: &str) -> Result<String, AugmentError> {
        if let Some(cached) = self.page_cache.get(url) {
            tracing::debug!("page cache hit for {}", url);
            return Ok(cached);
        }
        validate_url(url)?;
        let html = self.client.get_html(url).await?;
        let text = normalize_whitespace(&strip_tags(&html));
        let text = truncate_at_boundary(&text, self.fetch_char_budget).to_string();
        self.page_cache.insert(url, text.clone());
        Ok(text)
    }

    /// Search for the full user text and render up to the configured number
    /// of results.
    async fn search(&mut self, query: &str) -> String {
        if let Some(cached) = self.search_cache.get(query) {
            tracing::debug!("search cache hit for '{}'", query);
            return render_results(query, &cached);
        }
        match self.client.search_html(query).await {
            Ok(html) => {
                let results = parse_search_results(&html, self.search_result_count);
                self.search_cache.insert(query, results.clone());
                render_results(query, &results)
            }
            Err(e) => {
                tracing::warn!("web search failed for '{}': {}", query, e);
                format!("[web search failed: {}]", e)
            }
        }
    }
}
