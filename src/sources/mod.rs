//! News source providers that turn a keyword into candidate articles.
//!
//! Every provider follows the same contract: given a keyword and a result
//! limit, return an ordered list of [`CandidateItem`]s. Providers differ only
//! in transport and in the raw shape they parse.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Links |
//! |--------|--------|--------|-------|
//! | DuckDuckGo News | [`duckduckgo`] | JSON endpoint behind a `vqd` token | direct |
//! | Google News | [`google_news`] | RSS search feed | redirect pages |
//! | Bing News | [`bing`] | RSS search feed | click-tracking wrappers, unwrapped locally |
//! | GNews | [`gnews`] | REST API, requires key | direct |
//! | Massive/Polygon | [`polygon`] | REST API, requires key | direct |
//! | Yahoo | [`yahoo`] | HTML scrape with link heuristics | mostly direct |
//!
//! # Error Boundary
//!
//! Implementors only write [`SourceProvider::fetch_candidates`] and may fail
//! freely with `?`. The provided [`SourceProvider::search`] validates the
//! input, normalizes the output and turns any failure into an empty
//! [`SearchOutcome`] with a diagnostic. It never returns an error.

use crate::cli::SourceKind;
use crate::config::Config;
use crate::models::CandidateItem;
use crate::utils::{build_http_client, collapse_whitespace};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use std::error::Error;
use tracing::{info, warn};
use url::Url;

pub mod bing;
pub mod duckduckgo;
pub mod gnews;
pub mod google_news;
pub mod polygon;
pub mod rss;
pub mod yahoo;

/// Result of a provider search.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub items: Vec<CandidateItem>,
    /// Human-readable reason when `items` is empty.
    pub diagnostic: Option<String>,
}

/// A news source that can be searched by keyword.
pub trait SourceProvider {
    /// Display name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether returned URLs point at redirect or interstitial pages.
    fn yields_indirect_links(&self) -> bool {
        false
    }

    /// Query the source. Errors are absorbed by [`SourceProvider::search`].
    async fn fetch_candidates(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>>;

    /// Search the source and normalize its answer.
    async fn search(&self, keyword: &str, limit: usize) -> SearchOutcome {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return SearchOutcome {
                items: Vec::new(),
                diagnostic: Some("keyword must not be empty".to_string()),
            };
        }
        if limit == 0 {
            return SearchOutcome {
                items: Vec::new(),
                diagnostic: Some("result limit must be positive".to_string()),
            };
        }

        match self.fetch_candidates(keyword, limit).await {
            Ok(raw) => {
                let raw_count = raw.len();
                let items = normalize_candidates(raw, limit);
                info!(
                    source = self.name(),
                    keyword,
                    raw_count,
                    count = items.len(),
                    "Search completed"
                );
                let diagnostic = items
                    .is_empty()
                    .then(|| format!("{} returned no news for \"{keyword}\"", self.name()));
                SearchOutcome { items, diagnostic }
            }
            Err(e) => {
                warn!(source = self.name(), keyword, error = %e, "Search failed");
                SearchOutcome {
                    items: Vec::new(),
                    diagnostic: Some(format!("{} search failed: {e}", self.name())),
                }
            }
        }
    }
}

/// Validate and clean raw provider output.
///
/// Titles and descriptions are whitespace-collapsed, items without a title or
/// with a non-HTTP link are dropped, duplicate links keep their first
/// occurrence and the list is cut to `limit`.
pub fn normalize_candidates(raw: Vec<CandidateItem>, limit: usize) -> Vec<CandidateItem> {
    raw.into_iter()
        .filter_map(|mut item| {
            item.title = collapse_whitespace(&item.title);
            item.url = item.url.trim().to_string();
            item.source_name = item
                .source_name
                .map(|s| collapse_whitespace(&s))
                .filter(|s| !s.is_empty());
            item.api_summary = item
                .api_summary
                .map(|s| collapse_whitespace(&s))
                .filter(|s| !s.is_empty());
            let valid_url = Url::parse(&item.url)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            (!item.title.is_empty() && valid_url).then_some(item)
        })
        .unique_by(|item| item.url.clone())
        .take(limit)
        .collect()
}

/// Start of a trailing time window of `days` days ending now.
pub fn window_start(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Sort newest first; items without a publication time go last.
pub fn sort_newest_first(items: &mut [CandidateItem]) {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Parse an RFC 3339 timestamp such as `2025-05-06T14:30:00Z`.
pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Any of the supported providers, selected at runtime.
pub enum AnySource {
    DuckDuckGo(duckduckgo::DuckDuckGoNews),
    GoogleNews(google_news::GoogleNewsRss),
    Bing(bing::BingNewsRss),
    GNews(gnews::GNewsApi),
    Polygon(polygon::PolygonNews),
    Yahoo(yahoo::YahooNewsScrape),
}

impl AnySource {
    /// Build the provider chosen on the command line from the configuration.
    pub fn from_config(kind: SourceKind, config: &Config) -> Result<Self, Box<dyn Error>> {
        let client = build_http_client(&config.user_agent, config.request_timeout())?;
        let source = match kind {
            SourceKind::Duckduckgo => AnySource::DuckDuckGo(duckduckgo::DuckDuckGoNews::new(
                client,
                config.duckduckgo.clone(),
            )),
            SourceKind::GoogleNews => AnySource::GoogleNews(google_news::GoogleNewsRss::new(
                client,
                config.google_news.clone(),
            )),
            SourceKind::Bing => {
                AnySource::Bing(bing::BingNewsRss::new(client, config.bing.clone()))
            }
            SourceKind::Gnews => {
                AnySource::GNews(gnews::GNewsApi::new(client, config.gnews.clone()))
            }
            SourceKind::Polygon => {
                AnySource::Polygon(polygon::PolygonNews::new(client, config.polygon.clone()))
            }
            SourceKind::Yahoo => AnySource::Yahoo(yahoo::YahooNewsScrape::new(
                client,
                config.yahoo.clone(),
            )),
        };
        Ok(source)
    }
}

impl SourceProvider for AnySource {
    fn name(&self) -> &'static str {
        match self {
            AnySource::DuckDuckGo(s) => s.name(),
            AnySource::GoogleNews(s) => s.name(),
            AnySource::Bing(s) => s.name(),
            AnySource::GNews(s) => s.name(),
            AnySource::Polygon(s) => s.name(),
            AnySource::Yahoo(s) => s.name(),
        }
    }

    fn yields_indirect_links(&self) -> bool {
        match self {
            AnySource::DuckDuckGo(s) => s.yields_indirect_links(),
            AnySource::GoogleNews(s) => s.yields_indirect_links(),
            AnySource::Bing(s) => s.yields_indirect_links(),
            AnySource::GNews(s) => s.yields_indirect_links(),
            AnySource::Polygon(s) => s.yields_indirect_links(),
            AnySource::Yahoo(s) => s.yields_indirect_links(),
        }
    }

    async fn fetch_candidates(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
        match self {
            AnySource::DuckDuckGo(s) => s.fetch_candidates(keyword, limit).await,
            AnySource::GoogleNews(s) => s.fetch_candidates(keyword, limit).await,
            AnySource::Bing(s) => s.fetch_candidates(keyword, limit).await,
            AnySource::GNews(s) => s.fetch_candidates(keyword, limit).await,
            AnySource::Polygon(s) => s.fetch_candidates(keyword, limit).await,
            AnySource::Yahoo(s) => s.fetch_candidates(keyword, limit).await,
        }
    }
}
