//! RSS 2.0 parsing shared by the feed-based providers.
//!
//! Feeds are deserialized with `quick_xml::de` into a minimal channel/item
//! shape. Unknown elements are ignored, a channel without items parses to an
//! empty list, and HTML inside `<description>` is flattened to text.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use scraper::Html;
use serde::Deserialize;
use std::error::Error;

use crate::utils::collapse_whitespace;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

/// One `<item>` of an RSS feed.
#[derive(Debug, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
    pub source: Option<RssSource>,
    /// Bing's publisher element, `<News:Source>Publisher</News:Source>`.
    #[serde(rename = "News:Source", alias = "Source")]
    pub news_source: Option<String>,
}

impl RssItem {
    /// Publisher name from `<source>` or Bing's `<News:Source>`.
    pub fn publisher(&self) -> Option<String> {
        self.source
            .as_ref()
            .and_then(|s| s.name.clone())
            .or_else(|| self.news_source.clone())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

/// The `<source url="...">Publisher</source>` element.
#[derive(Debug, Deserialize)]
pub struct RssSource {
    #[serde(rename = "$text")]
    pub name: Option<String>,
}

/// Parse the items of an RSS document.
pub fn parse_items(xml: &str) -> Result<Vec<RssItem>, Box<dyn Error>> {
    let rss: Rss = from_str(xml)?;
    Ok(rss.channel.items)
}

/// Parse an RFC 2822 `pubDate` such as `Tue, 06 May 2025 14:30:00 GMT`.
pub fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Flatten an HTML fragment to whitespace-collapsed text.
pub fn strip_tags(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let text = html.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Feed</title>
    <item>
      <title>ExampleCorp announces Q3 results - Example Times</title>
      <link>https://news.google.com/rss/articles/CBMiabc?oc=5</link>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/x"&gt;ExampleCorp announces&lt;/a&gt;&amp;nbsp;&lt;font&gt;Example Times&lt;/font&gt;</description>
      <source url="https://example-times.com">Example Times</source>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/second</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_items() {
        let items = parse_items(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].title.as_deref(),
            Some("ExampleCorp announces Q3 results - Example Times")
        );
        assert_eq!(items[0].publisher().as_deref(), Some("Example Times"));
        assert!(items[1].publisher().is_none());
        assert!(items[1].pub_date.is_none());
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        assert!(parse_items(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(parse_items("<html><body>rate limited</body></html>").is_err());
    }

    #[test]
    fn test_parse_pub_date() {
        let dt = parse_pub_date("Tue, 06 May 2025 14:30:00 GMT").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-05-06T14:30:00+00:00");
        assert!(parse_pub_date("yesterday").is_none());
    }

    #[test]
    fn test_strip_tags() {
        let text = strip_tags(r#"<a href="x">ExampleCorp  announces</a>&nbsp;<font>Example Times</font>"#);
        assert!(text.starts_with("ExampleCorp announces"));
        assert!(text.ends_with("Example Times"));
    }
}
