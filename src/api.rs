//! LLM API interaction with exponential backoff retry logic.
//!
//! This module talks to any OpenAI-compatible chat completion endpoint
//! (OpenAI, Ollama, llama.cpp server, vLLM, ...). It is used by the
//! abstractive summarizer.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`ChatCompletionClient`]: `POST {endpoint}/chat/completions` over reqwest
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::AbstractiveConfig;
use crate::utils::{build_http_client, truncate_for_log};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// ```ignore
    /// let timeout = Duration::from_secs(60);
    /// let client = ChatCompletionClient::new(&config.abstractive, "Summarize.", timeout)?;
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AnswerMessage,
}

#[derive(Debug, Deserialize)]
struct AnswerMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Decoding is deterministic (temperature 0) and bounded by `max_tokens`.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ChatCompletionClient {
    pub fn new(
        config: &AbstractiveConfig,
        system_prompt: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: build_http_client(env!("CARGO_PKG_NAME"), timeout)?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: system_prompt.into(),
        })
    }

    fn request_body<'a>(&'a self, text: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        }
    }
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AskAsync for ChatCompletionClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&self.request_body(text));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body = request.send().await?.error_for_status()?.text().await?;
        let answer = parse_completion(&body)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            answer = %truncate_for_log(&answer, 120),
            "Chat completion received"
        );
        Ok(answer)
    }
}

/// Pull the first choice's text out of a chat completion response.
pub fn parse_completion(json: &str) -> Result<String, Box<dyn Error>> {
    let response: ChatResponse = serde_json::from_str(json)?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err("chat completion returned no content".into());
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Flaky {
        failures_left: Cell<usize>,
        calls: Cell<usize>,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err("503 Service Unavailable".into());
            }
            Ok(text.to_uppercase())
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures_left: Cell::new(failures),
            calls: Cell::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_errors() {
        let api = RetryAsk::new(flaky(2), 5, StdDuration::from_millis(1));
        assert_eq!(api.ask("ok").await.unwrap(), "OK");
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let api = RetryAsk::new(flaky(10), 2, StdDuration::from_millis(1));
        assert!(api.ask("ok").await.is_err());
        assert_eq!(api.inner.calls.get(), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let api = RetryAsk::new(flaky(0), 5, StdDuration::from_secs(1));
        let first = api.backoff(1);
        assert!(first >= StdDuration::from_secs(1) && first <= StdDuration::from_millis(1250));
        let late = api.backoff(20);
        assert!(late >= StdDuration::from_secs(30) && late <= StdDuration::from_millis(30_250));
    }

    #[test]
    fn test_parse_completion() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  ExampleCorp beat estimates. "},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(json).unwrap(), "ExampleCorp beat estimates.");
    }

    #[test]
    fn test_parse_completion_without_content_is_an_error() {
        assert!(parse_completion(r#"{"choices":[]}"#).is_err());
        let null_content = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert!(parse_completion(null_content).is_err());
        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn test_request_body_is_deterministic() {
        let client = ChatCompletionClient::new(
            &AbstractiveConfig::default(),
            "Summarize.",
            StdDuration::from_secs(5),
        )
        .unwrap();
        let body = serde_json::to_value(client.request_body("text")).unwrap();
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 130);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "text");
    }
}
