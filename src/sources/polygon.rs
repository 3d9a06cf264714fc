//! Massive (formerly Polygon.io) ticker news provider.
//!
//! The keyword is treated as a ticker symbol. Articles are limited to a
//! trailing publication window and returned newest first.

use crate::config::PolygonConfig;
use crate::models::CandidateItem;
use crate::sources::{SourceProvider, parse_rfc3339, sort_newest_first, window_start};
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: Option<String>,
    article_url: Option<String>,
    published_utc: Option<String>,
    description: Option<String>,
    publisher: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
}

pub struct PolygonNews {
    client: Client,
    config: PolygonConfig,
}

impl PolygonNews {
    pub fn new(client: Client, config: PolygonConfig) -> Self {
        Self { client, config }
    }
}

impl SourceProvider for PolygonNews {
    fn name(&self) -> &'static str {
        "Massive"
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_candidates(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or("no Massive/Polygon API key configured")?;

        let ticker = keyword.to_uppercase();
        let since = window_start(self.config.window_days).format("%Y-%m-%d").to_string();
        let limit = limit.to_string();

        let body = self
            .client
            .get(format!(
                "{}/v2/reference/news",
                self.config.base_url.trim_end_matches('/')
            ))
            .query(&[
                ("ticker", ticker.as_str()),
                ("published_utc.gte", since.as_str()),
                ("order", "desc"),
                ("sort", "published_utc"),
                ("limit", limit.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut items = parse_results(&body)?;
        sort_newest_first(&mut items);
        Ok(items)
    }
}

/// Map a `/v2/reference/news` answer to candidates.
pub fn parse_results(json: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    let response: NewsResponse = serde_json::from_str(json)?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|r| {
            Some(CandidateItem {
                title: r.title?,
                url: r.article_url?,
                source_name: r.publisher.and_then(|p| p.name),
                published_at: r.published_utc.as_deref().and_then(parse_rfc3339),
                api_summary: r.description,
            })
        })
        .collect())
}
