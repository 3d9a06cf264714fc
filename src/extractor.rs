//! Article download and plain-text extraction.
//!
//! Pages are fetched with a browser identity and a bounded timeout, then
//! reduced to the paragraphs of their main content container. The result is
//! classified against [`MIN_CONTENT_CHARS`](crate::models::MIN_CONTENT_CHARS):
//! long enough bodies are `ok`, shorter ones are `too_short` and carry the
//! page's meta description when one is available. Transport and decoding
//! failures become `fetch_failed`; nothing propagates.

use crate::models::{ArticleContent, MIN_CONTENT_CHARS};
use crate::utils::{build_http_client, char_len, collapse_whitespace};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Article containers in priority order. The first one holding enough text
/// wins; `body` is the last resort.
const CONTAINERS: &[&str] = &["article", "[itemprop=\"articleBody\"]", "main"];

/// Paragraphs nested in these elements are page chrome, not article text.
const CHROME: &[&str] = &["nav", "header", "footer", "aside", "form"];

const META_DESCRIPTION: &[&str] = &[
    "meta[property=\"og:description\"]",
    "meta[name=\"description\"]",
    "meta[name=\"twitter:description\"]",
];

static PARAGRAPH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("paragraph selector should parse"));
static BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("body selector should parse"));

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTAINERS
        .iter()
        .map(|s| Selector::parse(s).expect("container selector should parse"))
        .collect()
});

static META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    META_DESCRIPTION
        .iter()
        .map(|s| Selector::parse(s).expect("meta selector should parse"))
        .collect()
});

/// Downloads articles and reduces them to text.
pub trait ExtractArticle {
    async fn extract(&self, url: &str) -> ArticleContent;
}

/// A page reduced to its text parts.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub body_text: String,
    pub meta_description: Option<String>,
}

/// HTTP-backed extractor.
pub struct ArticleExtractor {
    client: Client,
}

impl ArticleExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    async fn download(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }
}

impl ExtractArticle for ArticleExtractor {
    #[instrument(level = "info", skip(self), fields(%url))]
    async fn extract(&self, url: &str) -> ArticleContent {
        match self.download(url).await {
            Ok(html) => {
                let page = parse_page(&html);
                let content = ArticleContent::classify(page.body_text, page.meta_description);
                info!(
                    chars = char_len(&content.body_text),
                    status = ?content.status,
                    "Parsed article"
                );
                content
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                ArticleContent::fetch_failed(e.to_string())
            }
        }
    }
}

/// Extract the main text and meta description from an HTML document.
pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let body_text = CONTAINER_SELECTORS
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(paragraph_text)
        .find(|text| char_len(text) >= MIN_CONTENT_CHARS)
        .or_else(|| document.select(&BODY).next().map(paragraph_text))
        .unwrap_or_default();

    let meta_description = META_SELECTORS.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|m| m.value().attr("content"))
            .map(collapse_whitespace)
            .find(|c| !c.is_empty())
    });

    ParsedPage {
        body_text,
        meta_description,
    }
}

fn paragraph_text(container: ElementRef) -> String {
    container
        .select(&PARAGRAPH)
        .filter(|p| !inside_chrome(p))
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn inside_chrome(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|e| CHROME.contains(&e.value().name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractionStatus;
    use crate::utils::BROWSER_USER_AGENT;

    const ARTICLE: &str = r#"<html><head>
        <meta property="og:description" content="ExampleCorp   announces Q3 results">
        <meta name="description" content="Generic site description">
        </head><body>
        <nav><p>Home | Markets | Tech</p></nav>
        <article>
          <h1>ExampleCorp announces Q3 results</h1>
          <p>ExampleCorp reported revenue of $12 billion for the third quarter.</p>
          <p>The company raised its full-year guidance.</p>
          <aside><p>Related: other stories</p></aside>
        </article>
        <footer><p>Copyright ExampleCorp News</p></footer>
        </body></html>"#;

    #[test]
    fn test_parse_page_prefers_article_paragraphs() {
        let page = parse_page(ARTICLE);
        assert_eq!(
            page.body_text,
            "ExampleCorp reported revenue of $12 billion for the third quarter.\nThe company raised its full-year guidance."
        );
        assert_eq!(
            page.meta_description.as_deref(),
            Some("ExampleCorp announces Q3 results")
        );
    }

    #[test]
    fn test_parse_page_ignores_text_outside_the_article() {
        let html = r#"<html><body>
            <article><p>ExampleCorp reported revenue of $12 billion for the third quarter.</p></article>
            <div class="comments"><p>Comment: first!</p><p>Subscribe to our newsletter today.</p></div>
            </body></html>"#;
        assert_eq!(
            parse_page(html).body_text,
            "ExampleCorp reported revenue of $12 billion for the third quarter."
        );
    }

    #[test]
    fn test_short_article_container_falls_through_to_main() {
        let html = r#"<html><body>
            <article><p>Teaser.</p></article>
            <main><p>ExampleCorp reported revenue of $12 billion for the third quarter.</p></main>
            <div><p>Subscribe to our newsletter today.</p></div>
            </body></html>"#;
        assert_eq!(
            parse_page(html).body_text,
            "ExampleCorp reported revenue of $12 billion for the third quarter."
        );
    }

    #[test]
    fn test_parse_page_falls_back_to_body() {
        let html =
            "<html><body><div><p>First paragraph.</p><p>Second paragraph.</p></div></body></html>";
        let page = parse_page(html);
        assert_eq!(page.body_text, "First paragraph.\nSecond paragraph.");
        assert_eq!(page.meta_description, None);
    }

    #[test]
    fn test_blocked_page_is_too_short_with_meta() {
        let html = r#"<html><head><meta name="description" content="ExampleCorp announces Q3 results"></head>
            <body><p>Please enable cookies.</p></body></html>"#;
        let page = parse_page(html);
        let content = ArticleContent::classify(page.body_text, page.meta_description);
        assert_eq!(content.status, ExtractionStatus::TooShort);
        assert_eq!(
            content.meta_description.as_deref(),
            Some("ExampleCorp announces Q3 results")
        );
    }

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(parse_page(""), ParsedPage::default());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_failed() {
        let extractor = ArticleExtractor::new(BROWSER_USER_AGENT, Duration::from_secs(2)).unwrap();
        let content = extractor.extract("http://127.0.0.1:9/unreachable").await;
        assert_eq!(content.status, ExtractionStatus::FetchFailed);
        assert!(content.error.is_some());
    }
}
