//! DuckDuckGo News provider.
//!
//! DuckDuckGo returns real publisher links, so no resolution is needed.
//! Searching takes two requests:
//!
//! 1. `GET https://duckduckgo.com/?q=<keyword>` to obtain the per-query `vqd` token
//! 2. `GET https://duckduckgo.com/news.js?...&vqd=<token>` which answers JSON
//!
//! ```json
//! {"results": [{"title": "...", "url": "...", "source": "...", "date": 1746541800, "excerpt": "..."}]}
//! ```

use crate::config::DuckDuckGoConfig;
use crate::models::CandidateItem;
use crate::sources::SourceProvider;
use crate::sources::rss::strip_tags;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://duckduckgo.com";

static VQD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"vqd=["']?([0-9-]+)"#).expect("VQD_RE should compile")
});

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: Option<String>,
    url: Option<String>,
    source: Option<String>,
    date: Option<i64>,
    excerpt: Option<String>,
}

pub struct DuckDuckGoNews {
    client: Client,
    config: DuckDuckGoConfig,
}

impl DuckDuckGoNews {
    pub fn new(client: Client, config: DuckDuckGoConfig) -> Self {
        Self { client, config }
    }

    fn safesearch_param(&self) -> &'static str {
        match self.config.safesearch.as_str() {
            "on" | "strict" => "1",
            "moderate" => "-1",
            _ => "-2",
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_vqd(&self, keyword: &str) -> Result<String, Box<dyn Error>> {
        let html = self
            .client
            .get(BASE_URL)
            .query(&[("q", keyword)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_vqd(&html).ok_or_else(|| "DuckDuckGo did not return a vqd token".into())
    }
}

impl SourceProvider for DuckDuckGoNews {
    fn name(&self) -> &'static str {
        "DuckDuckGo"
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_candidates(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
        let vqd = self.fetch_vqd(keyword).await?;
        debug!(%vqd, "Obtained DuckDuckGo token");

        let body = self
            .client
            .get(format!("{BASE_URL}/news.js"))
            .query(&[
                ("l", self.config.region.as_str()),
                ("o", "json"),
                ("noamp", "1"),
                ("q", keyword),
                ("vqd", vqd.as_str()),
                ("p", self.safesearch_param()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_results(&body)?.into_iter().take(limit).collect())
    }
}

/// Pull the `vqd` token out of the DuckDuckGo landing page.
pub fn extract_vqd(html: &str) -> Option<String> {
    VQD_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Map a `news.js` JSON answer to candidates.
pub fn parse_results(json: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    let response: NewsResponse = serde_json::from_str(json)?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|r| {
            Some(CandidateItem {
                title: strip_tags(&r.title?),
                url: r.url?,
                source_name: r.source,
                published_at: r.date.and_then(|ts| DateTime::from_timestamp(ts, 0)),
                api_summary: r.excerpt.map(|e| strip_tags(&e)),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_vqd() {
        let html = r#"<script>DDG.deep.initialize('/d.js?q=openai&vqd=4-123456789012345678901234567890&p=1');</script>"#;
        assert_eq!(
            extract_vqd(html).as_deref(),
            Some("4-123456789012345678901234567890")
        );

        let quoted = r#"vqd="4-98765""#;
        assert_eq!(extract_vqd(quoted).as_deref(), Some("4-98765"));

        assert_eq!(extract_vqd("<html>no token</html>"), None);
    }

    #[test]
    fn test_parse_results() {
        let json = r#"{
            "ads": [],
            "results": [
                {
                    "title": "<b>ExampleCorp</b> announces Q3 results",
                    "url": "https://www.example.com/examplecorp-q3",
                    "source": "Example Times",
                    "date": 1746541800,
                    "excerpt": "ExampleCorp said <b>revenue</b> rose 12%.",
                    "image": "https://img.example.com/1.jpg"
                },
                {"title": "No url"}
            ]
        }"#;
        let items = parse_results(json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "ExampleCorp announces Q3 results");
        assert_eq!(items[0].source_name.as_deref(), Some("Example Times"));
        assert_eq!(items[0].api_summary.as_deref(), Some("ExampleCorp said revenue rose 12%."));
        assert_eq!(
            items[0].published_at.unwrap().to_rfc3339(),
            "2025-05-06T14:30:00+00:00"
        );
    }

    #[test]
    fn test_parse_results_without_results_field() {
        assert!(parse_results("{}").unwrap().is_empty());
        assert!(parse_results("not json").is_err());
    }

    #[test]
    fn test_safesearch_param() {
        let source = DuckDuckGoNews::new(Client::new(), DuckDuckGoConfig::default());
        assert_eq!(source.safesearch_param(), "-2");
    }
}
