//! Yahoo search scrape provider.
//!
//! Fetches a Yahoo web search for `<keyword> news` and approximates "is this
//! a news link" with heuristics instead of a classifier:
//!
//! - Yahoo's `r.search.yahoo.com/.../RU=<encoded target>/RK=...` wrappers are decoded first
//! - the target must contain the `/news/` path marker
//! - the anchor text must have at least `min_anchor_chars` characters
//! - a target already seen on the page is skipped
//!
//! The heuristic is known to be imprecise: it can keep section pages and
//! miss publishers that do not use `/news/` in their paths.

use crate::config::YahooConfig;
use crate::models::CandidateItem;
use crate::sources::SourceProvider;
use crate::utils::{char_len, collapse_whitespace};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use tracing::{debug, instrument};
use url::Url;

const NEWS_PATH_MARKER: &str = "/news/";

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector should parse"));

pub struct YahooNewsScrape {
    client: Client,
    config: YahooConfig,
}

impl YahooNewsScrape {
    pub fn new(client: Client, config: YahooConfig) -> Self {
        Self { client, config }
    }
}

impl SourceProvider for YahooNewsScrape {
    fn name(&self) -> &'static str {
        "Yahoo"
    }

    fn yields_indirect_links(&self) -> bool {
        true
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch_candidates(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
        let base = Url::parse(&self.config.base_url)?;
        let query = format!("{keyword} news");
        let html = self
            .client
            .get(base.clone())
            .query(&[("p", query.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let items = parse_news_links(&html, &base, self.config.min_anchor_chars);
        debug!(count = items.len(), "Yahoo links passing the news heuristic");
        Ok(items.into_iter().take(limit).collect())
    }
}

/// Apply the news-link heuristic to a search result page.
pub fn parse_news_links(html: &str, base: &Url, min_anchor_chars: usize) -> Vec<CandidateItem> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let target = unwrap_redirect(&resolved).unwrap_or_else(|| resolved.to_string());
        if !target.contains(NEWS_PATH_MARKER) {
            continue;
        }

        let text = collapse_whitespace(&anchor.text().collect::<String>());
        if char_len(&text) < min_anchor_chars {
            continue;
        }
        if !seen.insert(target.clone()) {
            continue;
        }
        items.push(CandidateItem::new(text, target));
    }
    items
}

/// Decode the `RU=` segment of an `r.search.yahoo.com` redirect.
pub fn unwrap_redirect(url: &Url) -> Option<String> {
    if url.host_str() != Some("r.search.yahoo.com") {
        return None;
    }
    let path = url.path();
    let start = path.find("/RU=")? + "/RU=".len();
    let encoded = path[start..].split('/').next()?;
    let decoded = urlencoding::decode(encoded).ok()?.into_owned();
    decoded.starts_with("http").then_some(decoded)
}
