//! YAML configuration for sources, network behaviour and summarization.
//!
//! The configuration file is optional. Every field has a default, so an
//! empty file (or none at all) yields a working setup for the key-less
//! sources. API keys for GNews, Massive/Polygon and the abstractive model
//! are supplied here or through the CLI/environment, never compiled in.
//!
//! # Lookup Order
//!
//! 1. `--config <path>` when given
//! 2. `$XDG_CONFIG_HOME/keyword_news/config.yaml` or `~/.config/keyword_news/config.yaml`
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```yaml
//! sentence_budget: 3
//! workers: 5
//! gnews:
//!   api_key: "..."
//!   country: tw
//! abstractive:
//!   endpoint: http://localhost:11434/v1
//!   model: qwen2.5:7b
//! translation:
//!   target: zh-TW
//! ```

use crate::utils::BROWSER_USER_AGENT;
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub user_agent: String,
    /// Timeout for search and article downloads, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for link resolution, in seconds.
    pub resolve_timeout_secs: u64,
    pub sentence_budget: usize,
    pub workers: usize,
    pub limit: usize,
    pub duckduckgo: DuckDuckGoConfig,
    pub google_news: GoogleNewsConfig,
    pub bing: BingConfig,
    pub gnews: GNewsConfig,
    pub polygon: PolygonConfig,
    pub yahoo: YahooConfig,
    pub resolver: ResolverConfig,
    pub abstractive: AbstractiveConfig,
    pub translation: TranslationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            resolve_timeout_secs: 10,
            sentence_budget: 3,
            workers: 5,
            limit: 5,
            duckduckgo: DuckDuckGoConfig::default(),
            google_news: GoogleNewsConfig::default(),
            bing: BingConfig::default(),
            gnews: GNewsConfig::default(),
            polygon: PolygonConfig::default(),
            yahoo: YahooConfig::default(),
            resolver: ResolverConfig::default(),
            abstractive: AbstractiveConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error>> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        if config.sentence_budget == 0 {
            return Err("sentence_budget must be at least 1".into());
        }
        Ok(config)
    }

    /// Load the configuration following the lookup order described in the module docs.
    ///
    /// An explicitly requested file must exist; the default location is optional.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let (path, required) = match path {
            Some(p) => (PathBuf::from(p), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(yaml) => {
                let config = Self::from_yaml(&yaml)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(format!("cannot read config {}: {e}", path.display()).into()),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("keyword_news").join("config.yaml"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DuckDuckGoConfig {
    /// `wt-wt` is worldwide; `tw-tzh` targets Taiwan.
    pub region: String,
    /// `on`, `moderate` or `off`.
    pub safesearch: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            region: "wt-wt".to_string(),
            safesearch: "off".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleNewsConfig {
    pub hl: String,
    pub gl: String,
    pub ceid: String,
}

impl Default for GoogleNewsConfig {
    fn default() -> Self {
        Self {
            hl: "zh-TW".to_string(),
            gl: "TW".to_string(),
            ceid: "TW:zh-Hant".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BingConfig {
    pub market: String,
}

impl Default for BingConfig {
    fn default() -> Self {
        Self {
            market: "zh-TW".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GNewsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub lang: Option<String>,
    /// Geographic filter; dropped on retry when it yields nothing.
    pub country: Option<String>,
    pub window_days: i64,
}

impl Default for GNewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://gnews.io/api/v4".to_string(),
            lang: None,
            country: None,
            window_days: 28,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub window_days: i64,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.polygon.io".to_string(),
            window_days: 28,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    pub base_url: String,
    /// Anchors with shorter text are not considered headlines.
    pub min_anchor_chars: usize,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://search.yahoo.com/search".to_string(),
            min_anchor_chars: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hosts (and their subdomains) that serve redirect or interstitial pages.
    pub intermediary_hosts: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            intermediary_hosts: vec![
                "news.google.com".to_string(),
                "bing.com".to_string(),
                "r.search.yahoo.com".to_string(),
                "news.yahoo.co.jp".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AbstractiveConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub min_tokens: u32,
    pub max_tokens: u32,
    /// Longer inputs are truncated before being sent.
    pub max_input_chars: usize,
}

impl Default for AbstractiveConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1".to_string(),
            api_key: None,
            model: "qwen2.5:7b".to_string(),
            min_tokens: 30,
            max_tokens: 130,
            max_input_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub endpoint: String,
    /// Language tag to translate summaries into; unset disables translation.
    pub target: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            target: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.sentence_budget, 3);
        assert_eq!(config.workers, 5);
        assert_eq!(config.limit, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.duckduckgo.region, "wt-wt");
        assert_eq!(config.gnews.window_days, 28);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
sentence_budget: 2
gnews:
  api_key: secret
  country: tw
translation:
  target: zh-TW
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.sentence_budget, 2);
        assert_eq!(config.gnews.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gnews.country.as_deref(), Some("tw"));
        assert_eq!(config.gnews.base_url, "https://gnews.io/api/v4");
        assert_eq!(config.translation.target.as_deref(), Some("zh-TW"));
        assert_eq!(config.workers, 5);
    }

    #[test]
    fn test_zero_sentence_budget_is_an_error() {
        let err = Config::from_yaml("sentence_budget: 0").unwrap_err();
        assert!(err.to_string().contains("sentence_budget"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(Config::from_yaml("workers: [not a number").is_err());
    }

    #[tokio::test]
    async fn test_missing_explicit_config_is_an_error() {
        let result = Config::load(Some("/nonexistent/keyword_news/config.yaml")).await;
        assert!(result.is_err());
    }
}
