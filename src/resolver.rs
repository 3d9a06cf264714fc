//! Link resolution for redirect and interstitial URLs.
//!
//! Some sources hand out links that do not point at the article itself
//! (Google News `rss/articles/...` pages, Bing click tracking, Yahoo search
//! redirects). The resolver turns such a link into the publisher URL on a
//! best-effort, one-shot basis:
//!
//! 1. Links whose host is not a known intermediary are returned as-is (`direct`)
//! 2. Otherwise the link is fetched with redirects followed; landing off the
//!    intermediary domain is a success (`redirected`)
//! 3. If the response is still an intermediary page, its body is scanned for
//!    (a) the first anchor pointing off-domain, (b) a client-side redirect in
//!    a script, (c) a link inside a `<noscript>` block, in that order
//! 4. Otherwise the original link is kept (`unresolved`). There is no retry.

use crate::models::ResolvedLink;
use crate::utils::build_http_client;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector should parse"));
static SCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("script selector should parse"));
static NOSCRIPT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("noscript").expect("noscript selector should parse"));

static SCRIPT_REDIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:location\.replace\(\s*|location\.assign\(\s*|location(?:\.href)?\s*=\s*)["']([^"']+)["']"#,
    )
    .expect("SCRIPT_REDIRECT_RE should compile")
});

static NOSCRIPT_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:href\s*=\s*["']([^"']+)["']|url\s*=\s*([^"'>\s;]+))"#)
        .expect("NOSCRIPT_LINK_RE should compile")
});

/// Turns candidate links into direct article URLs.
pub trait ResolveLink {
    async fn resolve(&self, url: &str) -> ResolvedLink;
}

/// HTTP-backed resolver.
pub struct LinkResolver {
    client: Client,
    intermediary_hosts: Vec<String>,
}

impl LinkResolver {
    /// Create a resolver with a browser identity and a bounded timeout.
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        intermediary_hosts: Vec<String>,
    ) -> Result<Self, Box<dyn Error>> {
        Ok(Self::with_client(
            build_http_client(user_agent, timeout)?,
            intermediary_hosts,
        ))
    }

    pub fn with_client(client: Client, intermediary_hosts: Vec<String>) -> Self {
        Self {
            client,
            intermediary_hosts,
        }
    }

    /// Whether `host` (or a parent domain of it) serves redirect pages.
    pub fn is_intermediary(&self, host: &str) -> bool {
        let host = host.trim_start_matches("www.");
        self.intermediary_hosts.iter().any(|known| {
            let known = known.trim_start_matches("www.");
            host == known || host.ends_with(&format!(".{known}"))
        })
    }

    /// Whether redirect following left the intermediary domain behind.
    ///
    /// Landing on another host of the same registrable domain (a consent
    /// wall, a search results page) does not count.
    fn escaped(&self, landed: &Url, original: &Url) -> bool {
        match (landed.host_str(), original.host_str()) {
            (Some(host), Some(original_host)) => {
                !self.is_intermediary(host) && base_domain(host) != base_domain(original_host)
            }
            _ => false,
        }
    }

    fn is_outbound(&self, candidate: &Url, page: &Url) -> bool {
        if !matches!(candidate.scheme(), "http" | "https") {
            return false;
        }
        match (candidate.host_str(), page.host_str()) {
            (Some(host), Some(page_host)) => {
                base_domain(host) != base_domain(page_host) && !self.is_intermediary(host)
            }
            (Some(host), None) => !self.is_intermediary(host),
            _ => false,
        }
    }

    /// Scan an intermediary page for the article it points at.
    ///
    /// Strategies run in priority order and the first match wins.
    pub fn scan_for_outbound(&self, body: &str, page: &Url) -> Option<String> {
        let document = Html::parse_document(body);
        self.first_outbound_anchor(&document, page)
            .or_else(|| self.script_redirect(&document, page))
            .or_else(|| self.noscript_link(&document, page))
    }

    fn first_outbound_anchor(&self, document: &Html, page: &Url) -> Option<String> {
        document
            .select(&ANCHOR)
            .filter(|a| !inside_noscript(a))
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| page.join(href).ok())
            .find(|u| self.is_outbound(u, page))
            .map(String::from)
    }

    fn script_redirect(&self, document: &Html, page: &Url) -> Option<String> {
        document.select(&SCRIPT).find_map(|script| {
            let code = script.text().collect::<String>();
            SCRIPT_REDIRECT_RE
                .captures_iter(&code)
                .filter_map(|caps| caps.get(1))
                .map(|m| unescape_js(m.as_str()))
                .filter_map(|target| page.join(&target).ok())
                .find(|u| self.is_outbound(u, page))
                .map(String::from)
        })
    }

    fn noscript_link(&self, document: &Html, page: &Url) -> Option<String> {
        document.select(&NOSCRIPT).find_map(|block| {
            // With scripting enabled the parser keeps <noscript> content as raw text.
            let raw = block.inner_html().replace("&quot;", "\"");
            NOSCRIPT_LINK_RE
                .captures_iter(&raw)
                .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
                .map(|m| m.as_str().replace("&amp;", "&"))
                .filter_map(|target| page.join(&target).ok())
                .find(|u| self.is_outbound(u, page))
                .map(String::from)
        })
    }
}

impl ResolveLink for LinkResolver {
    #[instrument(level = "info", skip(self), fields(%url))]
    async fn resolve(&self, url: &str) -> ResolvedLink {
        let Ok(parsed) = Url::parse(url) else {
            warn!("Unparseable link; leaving unresolved");
            return ResolvedLink::unresolved(url);
        };
        match parsed.host_str() {
            Some(host) if self.is_intermediary(host) => {}
            _ => return ResolvedLink::direct(url),
        }

        let response = match self.client.get(parsed.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Link resolution request failed");
                return ResolvedLink::unresolved(url);
            }
        };

        let landed = response.url().clone();
        if self.escaped(&landed, &parsed) {
            info!(resolved = %landed, "Resolved by redirect");
            return ResolvedLink::redirected(url, landed.as_str());
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "Could not read intermediary page");
                return ResolvedLink::unresolved(url);
            }
        };

        match self.scan_for_outbound(&body, &landed) {
            Some(target) => {
                info!(resolved = %target, "Resolved from page body");
                ResolvedLink::redirected(url, &target)
            }
            None => {
                debug!(bytes = body.len(), "No outbound link found on intermediary page");
                ResolvedLink::unresolved(url)
            }
        }
    }
}

fn inside_noscript(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "noscript")
}

const SECOND_LEVEL: &[&str] = &["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// Registrable part of a host: `news.google.com` → `google.com`,
/// `tw.news.yahoo.co.jp` → `yahoo.co.jp`.
fn base_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let keep = match labels.as_slice() {
        [.., second, tld]
            if labels.len() > 2 && tld.len() == 2 && SECOND_LEVEL.contains(second) =>
        {
            3
        }
        _ => 2,
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

fn unescape_js(s: &str) -> String {
    s.replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\x26", "&")
        .replace("\\x3d", "=")
}
