//! GNews REST API provider.
//!
//! Calls `GET {base_url}/search` with the keyword, a trailing publication
//! window and `sortby=publishedAt`. When a `country` filter is configured and
//! the narrow query returns nothing, the query is retried once without it.
//!
//! Requires an API key. A missing key, an invalid key or an exhausted quota
//! surface as a failed search, never as a crash.

use crate::config::GNewsConfig;
use crate::models::CandidateItem;
use crate::sources::{SourceProvider, parse_rfc3339, sort_newest_first, window_start};
use reqwest::Client;
use serde::Deserialize;
use std::error::Error;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

pub struct GNewsApi {
    client: Client,
    config: GNewsConfig,
}

impl GNewsApi {
    pub fn new(client: Client, config: GNewsConfig) -> Self {
        Self { client, config }
    }

    async fn query(
        &self,
        api_key: &str,
        keyword: &str,
        limit: usize,
        country: Option<&str>,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
        let from = window_start(self.config.window_days)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let max = limit.to_string();

        let mut params = vec![
            ("q", keyword),
            ("max", max.as_str()),
            ("from", from.as_str()),
            ("sortby", "publishedAt"),
            ("apikey", api_key),
        ];
        if let Some(lang) = self.config.lang.as_deref() {
            params.push(("lang", lang));
        }
        if let Some(country) = country {
            params.push(("country", country));
        }

        let body = self
            .client
            .get(format!("{}/search", self.config.base_url.trim_end_matches('/')))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_articles(&body)
    }
}

impl SourceProvider for GNewsApi {
    fn name(&self) -> &'static str {
        "GNews"
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
            .ok_or("no GNews API key configured")?;

        let country = self.config.country.as_deref();
        let mut items = self.query(api_key, keyword, limit, country).await?;
        if items.is_empty() && country.is_some() {
            info!(?country, "No articles with country filter; widening query");
            items = self.query(api_key, keyword, limit, None).await?;
        }

        sort_newest_first(&mut items);
        Ok(items)
    }
}

/// Map a GNews `search` answer to candidates.
pub fn parse_articles(json: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    let response: SearchResponse = serde_json::from_str(json)?;
    Ok(response
        .articles
        .into_iter()
        .filter_map(|a| {
            Some(CandidateItem {
                title: a.title?,
                url: a.url?,
                source_name: a.source.and_then(|s| s.name),
                published_at: a.published_at.as_deref().and_then(parse_rfc3339),
                api_summary: a.description,
            })
        })
        .collect())
}
