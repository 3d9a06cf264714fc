//! Abstractive summarization through a chat completion model.
//!
//! The article is truncated to `max_input_chars`, sent with a fixed
//! instruction, and the answer is cut down to the sentence budget.

use crate::api::{AskAsync, ChatCompletionClient, RetryAsk};
use crate::config::AbstractiveConfig;
use crate::models::{Summary, SummaryMethod, SummaryResult};
use crate::summarizer::Summarize;
use crate::summarizer::lsa::{join_sentences, split_sentences};
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::{info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are a news editor. Summarize the article you are given. \
Reply with the summary only, in the language of the article, without a preamble.";

pub struct AbstractiveSummarizer<A> {
    api: A,
    min_tokens: u32,
    max_tokens: u32,
    max_input_chars: usize,
}

impl AbstractiveSummarizer<RetryAsk<ChatCompletionClient>> {
    /// Chat completion client wrapped in the standard backoff policy (5 retries, 1 s base).
    pub fn from_config(
        config: &AbstractiveConfig,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let client = ChatCompletionClient::new(config, SYSTEM_PROMPT, timeout)?;
        Ok(Self::new(RetryAsk::new(client, 5, Duration::from_secs(1)), config))
    }
}

impl<A> AbstractiveSummarizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(api: A, config: &AbstractiveConfig) -> Self {
        Self {
            api,
            min_tokens: config.min_tokens,
            max_tokens: config.max_tokens,
            max_input_chars: config.max_input_chars,
        }
    }

    fn prompt(&self, text: &str, sentence_budget: usize) -> String {
        let article: String = text.chars().take(self.max_input_chars).collect();
        format!(
            "Write a summary of between {} and {} tokens, at most {} sentences.\n\nArticle:\n{}",
            self.min_tokens, self.max_tokens, sentence_budget, article
        )
    }
}

impl<A> fmt::Debug for AbstractiveSummarizer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractiveSummarizer")
            .field("min_tokens", &self.min_tokens)
            .field("max_tokens", &self.max_tokens)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl<A> Summarize for AbstractiveSummarizer<A>
where
    A: AskAsync<Response = String>,
{
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn summarize(&self, text: &str, sentence_budget: usize) -> Summary {
        if text.trim().is_empty() {
            return Summary::NoContent;
        }
        let budget = sentence_budget.max(1);

        match self.api.ask(&self.prompt(text, budget)).await {
            Ok(answer) => {
                let sentences = split_sentences(&answer);
                if sentences.is_empty() {
                    warn!("Model answered without a usable sentence");
                    return Summary::Failed {
                        reason: "model returned an empty summary".to_string(),
                    };
                }
                info!(sentences = sentences.len(), "Abstractive summary received");
                Summary::Generated(SummaryResult {
                    text: join_sentences(sentences.iter().take(budget).map(String::as_str)),
                    method: SummaryMethod::Abstractive,
                    language: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "Abstractive summarization failed");
                Summary::Failed { reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug)]
    struct Scripted {
        answer: Result<&'static str, &'static str>,
        prompts: RefCell<Vec<String>>,
    }

    impl AskAsync for Scripted {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.prompts.borrow_mut().push(text.to_string());
            self.answer.map(str::to_string).map_err(|e| e.into())
        }
    }

    fn summarizer(answer: Result<&'static str, &'static str>) -> AbstractiveSummarizer<Scripted> {
        let config = AbstractiveConfig {
            max_input_chars: 20,
            ..AbstractiveConfig::default()
        };
        AbstractiveSummarizer::new(
            Scripted {
                answer,
                prompts: RefCell::new(Vec::new()),
            },
            &config,
        )
    }

    #[tokio::test]
    async fn test_answer_is_capped_to_budget() {
        let s = summarizer(Ok(
            "ExampleCorp beat estimates. Shares rose. Guidance was raised. Analysts cheered.",
        ));
        match s.summarize("ExampleCorp reported results.", 2).await {
            Summary::Generated(result) => {
                assert_eq!(result.text, "ExampleCorp beat estimates. Shares rose.");
                assert_eq!(result.method, SummaryMethod::Abstractive);
            }
            other => panic!("unexpected summary: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_is_truncated() {
        let s = summarizer(Ok("Short."));
        s.summarize(&"x".repeat(100), 3).await;
        let prompts = s.api.prompts.borrow();
        assert!(prompts[0].ends_with(&"x".repeat(20)));
        assert!(!prompts[0].contains(&"x".repeat(21)));
        assert!(prompts[0].contains("between 30 and 130 tokens"));
    }

    #[tokio::test]
    async fn test_api_error_is_failed_summary() {
        let s = summarizer(Err("connection refused"));
        assert_eq!(
            s.summarize("ExampleCorp reported results.", 3).await,
            Summary::Failed {
                reason: "connection refused".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_blank_answer_is_failed_summary() {
        let s = summarizer(Ok(" ... "));
        assert!(matches!(
            s.summarize("ExampleCorp reported results.", 3).await,
            Summary::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_input_skips_the_model() {
        let s = summarizer(Ok("unused"));
        assert_eq!(s.summarize("", 3).await, Summary::NoContent);
        assert!(s.api.prompts.borrow().is_empty());
    }
}
