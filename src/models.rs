//! Data models flowing through the search → extract → summarize pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`CandidateItem`]: A news hit returned by a source provider
//! - [`ResolvedLink`]: The best-effort direct URL behind a candidate link
//! - [`ArticleContent`]: Downloaded article text with a sufficiency verdict
//! - [`Summary`] / [`SummaryResult`]: The summarizer's outcome
//! - [`ResultRecord`]: One row of the final digest, with a [`RecordSummary`]
//! - [`Digest`]: Every record produced for a single keyword search
//!
//! Stage outcomes are tags plus payload. Display markers such as
//! [`FALLBACK_MARKER`] only appear when a record is rendered.

use crate::utils::char_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum article body length, in characters, for content to count as usable.
pub const MIN_CONTENT_CHARS: usize = 50;

/// A meta description must be longer than this many characters to stand in for the body.
pub const MIN_META_DESCRIPTION_CHARS: usize = 10;

/// Prefix shown in front of summaries that come from page or provider metadata.
pub const FALLBACK_MARKER: &str = "📌 (source description)";

/// Prefix shown in front of records for which no summary could be produced.
pub const UNAVAILABLE_MARKER: &str = "⚠️";

/// Sentinel text for a summary of empty input.
pub const NO_CONTENT: &str = "no content";

/// A news hit as returned by a source provider.
///
/// The `url` may be a redirect or tracking link; the pipeline resolves it
/// when the provider says its links are indirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Headline of the article.
    pub title: String,
    /// Candidate link, possibly indirect.
    pub url: String,
    /// Publisher name, when the source reports it.
    pub source_name: Option<String>,
    /// Publication time, when the source reports it.
    pub published_at: Option<DateTime<Utc>>,
    /// Short description supplied by the source, used as a fallback summary.
    pub api_summary: Option<String>,
}

impl CandidateItem {
    /// Create a candidate with only a title and a link.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source_name: None,
            published_at: None,
            api_summary: None,
        }
    }
}

/// How a candidate link ended up at its final URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// The link already pointed at the article.
    Direct,
    /// The link was an intermediary and a target URL was found.
    Redirected,
    /// Every strategy failed; the original link is kept.
    Unresolved,
}

/// Output of the link resolver.
///
/// `resolved_url` is never empty: when resolution fails it equals
/// `original_url` and the status is [`ResolutionStatus::Unresolved`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub original_url: String,
    pub resolved_url: String,
    pub status: ResolutionStatus,
}

impl ResolvedLink {
    pub fn direct(url: &str) -> Self {
        Self {
            original_url: url.to_string(),
            resolved_url: url.to_string(),
            status: ResolutionStatus::Direct,
        }
    }

    /// A successful resolution. An empty target degrades to [`ResolvedLink::unresolved`].
    pub fn redirected(original: &str, target: &str) -> Self {
        if target.trim().is_empty() {
            return Self::unresolved(original);
        }
        Self {
            original_url: original.to_string(),
            resolved_url: target.to_string(),
            status: ResolutionStatus::Redirected,
        }
    }

    pub fn unresolved(url: &str) -> Self {
        Self {
            original_url: url.to_string(),
            resolved_url: url.to_string(),
            status: ResolutionStatus::Unresolved,
        }
    }
}

/// Sufficiency verdict for a downloaded article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    TooShort,
    FetchFailed,
}

/// Output of the article extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    /// Plain-text body of the article.
    pub body_text: String,
    /// Page meta description, kept only when long enough to be useful.
    pub meta_description: Option<String>,
    pub status: ExtractionStatus,
    /// Transport or parse error behind a [`ExtractionStatus::FetchFailed`].
    pub error: Option<String>,
}

impl ArticleContent {
    /// Classify a parsed page.
    ///
    /// A body of at least [`MIN_CONTENT_CHARS`] characters is `Ok`; anything
    /// shorter is `TooShort`. The meta description is only kept when it is
    /// longer than [`MIN_META_DESCRIPTION_CHARS`].
    pub fn classify(body_text: String, meta_description: Option<String>) -> Self {
        let body_text = body_text.trim().to_string();
        let meta_description = meta_description
            .map(|m| m.trim().to_string())
            .filter(|m| char_len(m) > MIN_META_DESCRIPTION_CHARS);
        let status = if char_len(&body_text) >= MIN_CONTENT_CHARS {
            ExtractionStatus::Ok
        } else {
            ExtractionStatus::TooShort
        };
        Self {
            body_text,
            meta_description,
            status,
            error: None,
        }
    }

    pub fn fetch_failed(reason: impl Into<String>) -> Self {
        Self {
            body_text: String::new(),
            meta_description: None,
            status: ExtractionStatus::FetchFailed,
            error: Some(reason.into()),
        }
    }
}

/// Which algorithm produced a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMethod {
    Extractive,
    Abstractive,
}

/// A generated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResult {
    pub text: String,
    pub method: SummaryMethod,
    /// Target language tag when the summary was translated.
    pub language: Option<String>,
}

/// Outcome of a summarizer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Generated(SummaryResult),
    /// The input was empty.
    NoContent,
    /// The summarizer failed on this input.
    Failed { reason: String },
}

impl Summary {
    /// Text shown for this outcome. Never empty.
    pub fn display_text(&self) -> String {
        match self {
            Summary::Generated(result) => result.text.clone(),
            Summary::NoContent => NO_CONTENT.to_string(),
            Summary::Failed { reason } => format!("summarization failed: {reason}"),
        }
    }
}

/// Where a fallback summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackOrigin {
    MetaDescription,
    ProviderDescription,
}

/// The summary carried by a [`ResultRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordSummary {
    Generated(SummaryResult),
    Fallback { text: String, origin: FallbackOrigin },
    Unavailable { reason: String },
}

impl RecordSummary {
    /// Render the summary for presentation, adding the fallback or error marker.
    pub fn display_text(&self) -> String {
        match self {
            RecordSummary::Generated(result) => result.text.clone(),
            RecordSummary::Fallback { text, .. } => format!("{FALLBACK_MARKER} {text}"),
            RecordSummary::Unavailable { reason } => format!("{UNAVAILABLE_MARKER} {reason}"),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, RecordSummary::Generated(_))
    }
}

/// One row of the final digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub title: String,
    pub summary: RecordSummary,
    /// The resolved article link.
    pub link: String,
    pub source_name: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub resolution: ResolutionStatus,
}

impl ResultRecord {
    /// The always-populated summary text shown next to the title.
    pub fn summary_text(&self) -> String {
        self.summary.display_text()
    }
}

/// Incremental progress of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Title of the item that just finished.
    pub current_label: String,
}

/// Every record produced for a single keyword search.
///
/// Each execution of the application produces one `Digest`, which is
/// serialized to JSON and rendered as a Markdown table.
#[derive(Debug, Serialize)]
pub struct Digest {
    pub keyword: String,
    /// Name of the source provider that was queried.
    pub source: String,
    /// Local time of the run in RFC 3339 format.
    pub generated_at: String,
    /// Why the search produced nothing, when it did.
    pub diagnostic: Option<String>,
    pub records: Vec<ResultRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_threshold_boundary() {
        let below = ArticleContent::classify("a".repeat(49), None);
        assert_eq!(below.status, ExtractionStatus::TooShort);

        let at = ArticleContent::classify("a".repeat(50), None);
        assert_eq!(at.status, ExtractionStatus::Ok);
    }

    #[test]
    fn test_classify_counts_characters_not_bytes() {
        // 49 CJK characters are 147 bytes but still too short.
        let body = "字".repeat(49);
        assert_eq!(ArticleContent::classify(body, None).status, ExtractionStatus::TooShort);
        assert_eq!(ArticleContent::classify("字".repeat(50), None).status, ExtractionStatus::Ok);
    }

    #[test]
    fn test_classify_drops_short_meta_description() {
        let content = ArticleContent::classify(String::new(), Some("too short".to_string()));
        assert_eq!(content.meta_description, None);

        let content = ArticleContent::classify(
            String::new(),
            Some("ExampleCorp announces Q3 results".to_string()),
        );
        assert_eq!(
            content.meta_description.as_deref(),
            Some("ExampleCorp announces Q3 results")
        );
    }

    #[test]
    fn test_fetch_failed_carries_reason() {
        let content = ArticleContent::fetch_failed("timeout");
        assert_eq!(content.status, ExtractionStatus::FetchFailed);
        assert_eq!(content.error.as_deref(), Some("timeout"));
        assert!(content.body_text.is_empty());
    }

    #[test]
    fn test_redirected_with_empty_target_is_unresolved() {
        let link = ResolvedLink::redirected("https://news.google.com/rss/articles/x", "  ");
        assert_eq!(link.status, ResolutionStatus::Unresolved);
        assert_eq!(link.resolved_url, "https://news.google.com/rss/articles/x");
    }

    #[test]
    fn test_record_summary_display_markers() {
        let fallback = RecordSummary::Fallback {
            text: "ExampleCorp announces Q3 results".to_string(),
            origin: FallbackOrigin::MetaDescription,
        };
        assert!(fallback.display_text().starts_with(FALLBACK_MARKER));
        assert!(fallback.display_text().contains("ExampleCorp announces Q3 results"));

        let unavailable = RecordSummary::Unavailable { reason: "blocked".to_string() };
        assert!(unavailable.display_text().starts_with(UNAVAILABLE_MARKER));
    }

    #[test]
    fn test_summary_display_text_is_never_empty() {
        assert_eq!(Summary::NoContent.display_text(), NO_CONTENT);
        let failed = Summary::Failed { reason: "boom".to_string() };
        assert!(failed.display_text().contains("boom"));
    }

    #[test]
    fn test_record_summary_serialization_is_tagged() {
        let summary = RecordSummary::Fallback {
            text: "desc".to_string(),
            origin: FallbackOrigin::ProviderDescription,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains(r#""kind":"fallback""#));
        assert!(json.contains(r#""origin":"provider_description""#));
    }
}
