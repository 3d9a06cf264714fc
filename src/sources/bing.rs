//! Bing News RSS search provider.
//!
//! Bing wraps every item link in a click-tracking URL of the form
//! `http://www.bing.com/news/apiclick.aspx?...&url=<encoded target>&...`.
//! The target is recovered from the query string while parsing, so the
//! candidates usually carry direct links. Wrappers that cannot be decoded are
//! left for the link resolver.

use crate::config::BingConfig;
use crate::models::CandidateItem;
use crate::sources::SourceProvider;
use crate::sources::rss::{RssItem, parse_items, parse_pub_date, strip_tags};
use reqwest::Client;
use std::error::Error;
use tracing::{debug, instrument};
use url::Url;

const SEARCH_URL: &str = "https://www.bing.com/news/search";

pub struct BingNewsRss {
    client: Client,
    config: BingConfig,
}

impl BingNewsRss {
    pub fn new(client: Client, config: BingConfig) -> Self {
        Self { client, config }
    }
}

impl SourceProvider for BingNewsRss {
    fn name(&self) -> &'static str {
        "Bing News"
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
        let url = format!(
            "{}?q={}&format=rss&mkt={}",
            SEARCH_URL,
            urlencoding::encode(keyword),
            urlencoding::encode(&self.config.market),
        );
        debug!(%url, "Fetching Bing News RSS");
        let xml = self.client.get(&url).send().await?.error_for_status()?.text().await?;
        Ok(parse_feed(&xml)?.into_iter().take(limit).collect())
    }
}

/// Map a Bing News RSS document to candidates.
pub fn parse_feed(xml: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    Ok(parse_items(xml)?.into_iter().filter_map(to_candidate).collect())
}

fn to_candidate(item: RssItem) -> Option<CandidateItem> {
    let source_name = item.publisher();
    let title = item.title?;
    let link = item.link?;
    let url = unwrap_click_url(&link).unwrap_or(link);
    Some(CandidateItem {
        title,
        url,
        source_name,
        published_at: item.pub_date.as_deref().and_then(parse_pub_date),
        api_summary: item.description.map(|d| strip_tags(&d)),
    })
}

/// Extract the `url` target from a Bing `apiclick.aspx` wrapper.
pub fn unwrap_click_url(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    if !parsed.path().ends_with("apiclick.aspx") {
        return None;
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
        .filter(|target| target.starts_with("http"))
}
