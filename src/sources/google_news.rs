//! Google News RSS search provider.
//!
//! Queries `https://news.google.com/rss/search` and maps each `<item>` to a
//! candidate. Google appends ` - Publisher` to every headline; the suffix is
//! removed using the `<source>` element. Item links point at
//! `news.google.com/rss/articles/...` redirect pages, so this provider
//! reports its links as indirect and the pipeline resolves them.

use crate::config::GoogleNewsConfig;
use crate::models::CandidateItem;
use crate::sources::SourceProvider;
use crate::sources::rss::{RssItem, parse_items, parse_pub_date, strip_tags};
use reqwest::Client;
use std::error::Error;
use tracing::{debug, instrument};

const SEARCH_URL: &str = "https://news.google.com/rss/search";

pub struct GoogleNewsRss {
    client: Client,
    config: GoogleNewsConfig,
}

impl GoogleNewsRss {
    pub fn new(client: Client, config: GoogleNewsConfig) -> Self {
        Self { client, config }
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "{}?q={}&hl={}&gl={}&ceid={}",
            SEARCH_URL,
            urlencoding::encode(keyword),
            urlencoding::encode(&self.config.hl),
            urlencoding::encode(&self.config.gl),
            urlencoding::encode(&self.config.ceid),
        )
    }
}

impl SourceProvider for GoogleNewsRss {
    fn name(&self) -> &'static str {
        "Google News"
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
        let url = self.search_url(keyword);
        debug!(%url, "Fetching Google News RSS");
        let xml = self.client.get(&url).send().await?.error_for_status()?.text().await?;
        Ok(parse_feed(&xml)?.into_iter().take(limit).collect())
    }
}

/// Map a Google News RSS document to candidates.
pub fn parse_feed(xml: &str) -> Result<Vec<CandidateItem>, Box<dyn Error>> {
    Ok(parse_items(xml)?.into_iter().filter_map(to_candidate).collect())
}

fn to_candidate(item: RssItem) -> Option<CandidateItem> {
    let source_name = item.publisher();
    let raw_title = item.title?;
    let url = item.link?;
    let title = match &source_name {
        Some(name) => raw_title
            .strip_suffix(&format!(" - {name}"))
            .unwrap_or(&raw_title)
            .to_string(),
        None => raw_title,
    };

    // The description only repeats the headline and publisher.
    let api_summary = item
        .description
        .map(|d| strip_tags(&d))
        .filter(|d| !d.contains(title.as_str()));

    Some(CandidateItem {
        title,
        url,
        source_name,
        published_at: item.pub_date.as_deref().and_then(parse_pub_date),
        api_summary,
    })
}
