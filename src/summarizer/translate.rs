//! Optional translation of generated summaries.
//!
//! [`Translating`] wraps any [`Summarize`] implementation. Generated
//! summaries are sent to a [`Translate`] backend; fallbacks and failures
//! pass through untouched. A translation error keeps the original text.

use crate::models::Summary;
use crate::summarizer::Summarize;
use crate::utils::build_http_client;
use reqwest::Client;
use serde_json::Value;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A translated text and the source language the backend detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub detected_language: Option<String>,
}

pub trait Translate {
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, Box<dyn Error>>;
}

/// The keyless `translate_a/single?client=gtx` endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(
        endpoint: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Translate for GoogleTranslator {
    #[instrument(level = "info", skip(self, text))]
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, Box<dyn Error>> {
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_gtx(&body)
    }
}

/// Parse the nested-array answer of the gtx endpoint:
/// `[[["translated","original",...],...],null,"en",...]`.
pub fn parse_gtx(json: &str) -> Result<Translation, Box<dyn Error>> {
    let value: Value = serde_json::from_str(json)?;
    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or("unexpected translation response shape")?;
    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err("translation response carried no text".into());
    }
    Ok(Translation {
        text,
        detected_language: value.get(2).and_then(Value::as_str).map(str::to_string),
    })
}

/// Summarizer decorator translating generated summaries into `target`.
///
/// With no target the wrapped summarizer is used as-is.
pub struct Translating<S, T> {
    inner: S,
    translator: T,
    target: Option<String>,
}

impl<S, T> Translating<S, T> {
    pub fn new(inner: S, translator: T, target: Option<String>) -> Self {
        Self {
            inner,
            translator,
            target: target.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl<S, T> Summarize for Translating<S, T>
where
    S: Summarize,
    T: Translate,
{
    async fn summarize(&self, text: &str, sentence_budget: usize) -> Summary {
        let summary = self.inner.summarize(text, sentence_budget).await;
        let (Some(target), Summary::Generated(mut result)) = (&self.target, summary.clone()) else {
            return summary;
        };

        match self.translator.translate(&result.text, target).await {
            Ok(translation) if same_language(translation.detected_language.as_deref(), target) => {
                debug!(%target, "Summary already in target language");
                summary
            }
            Ok(translation) => {
                result.text = translation.text;
                result.language = Some(target.clone());
                Summary::Generated(result)
            }
            Err(e) => {
                warn!(error = %e, %target, "Translation failed; keeping original summary");
                summary
            }
        }
    }
}

/// `zh-CN` and `zh-TW` are different targets; `en` matches `en-US`.
fn same_language(detected: Option<&str>, target: &str) -> bool {
    let Some(detected) = detected else {
        return false;
    };
    let detected = detected.to_ascii_lowercase();
    let target = target.to_ascii_lowercase();
    if detected == target {
        return true;
    }
    !detected.contains('-')
        && !detected.starts_with("zh")
        && target.split('-').next() == Some(detected.as_str())
}
