//! Summarization strategies.
//!
//! - [`lsa`]: extractive sentence ranking over jieba-segmented text (default)
//! - [`abstractive`]: an LLM asked for a short summary
//! - [`translate`]: a decorator translating generated summaries
//!
//! Every strategy returns a [`Summary`]; none of them fails past its boundary.

pub mod abstractive;
pub mod lsa;
pub mod translate;

use crate::api::{ChatCompletionClient, RetryAsk};
use crate::models::Summary;
use abstractive::AbstractiveSummarizer;
use lsa::LsaSummarizer;
use translate::{GoogleTranslator, Translating};

/// Turns article text into a summary of at most `sentence_budget` sentences.
pub trait Summarize {
    async fn summarize(&self, text: &str, sentence_budget: usize) -> Summary;
}

impl Summarize for LsaSummarizer {
    async fn summarize(&self, text: &str, sentence_budget: usize) -> Summary {
        self.summarize_text(text, sentence_budget)
    }
}

/// The summarizers selectable from the command line.
pub enum AnySummarizer {
    Extractive(LsaSummarizer),
    Abstractive(AbstractiveSummarizer<RetryAsk<ChatCompletionClient>>),
}

impl AnySummarizer {
    /// Translate generated summaries into `target`, when one is set.
    pub fn with_translation(
        self,
        translator: GoogleTranslator,
        target: Option<String>,
    ) -> Translating<Self, GoogleTranslator> {
        Translating::new(self, translator, target)
    }
}

impl Summarize for AnySummarizer {
    async fn summarize(&self, text: &str, sentence_budget: usize) -> Summary {
        match self {
            AnySummarizer::Extractive(s) => s.summarize(text, sentence_budget).await,
            AnySummarizer::Abstractive(s) => s.summarize(text, sentence_budget).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryMethod;

    #[tokio::test]
    async fn test_extractive_dispatch() {
        let summarizer = AnySummarizer::Extractive(LsaSummarizer::new());
        match summarizer.summarize("ExampleCorp reported record revenue.", 3).await {
            Summary::Generated(result) => {
                assert_eq!(result.method, SummaryMethod::Extractive);
                assert_eq!(result.text, "ExampleCorp reported record revenue.");
            }
            other => panic!("unexpected summary: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_no_content() {
        let summarizer = AnySummarizer::Extractive(LsaSummarizer::new());
        assert_eq!(summarizer.summarize("   ", 3).await, Summary::NoContent);
    }
}
