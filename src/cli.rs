//! Command-line interface definitions for Keyword News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! API keys can be provided via command-line flags or environment variables;
//! everything else falls back to the configuration file.

use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};

/// Command-line arguments for the Keyword News application.
///
/// # Examples
///
/// ```sh
/// # Search DuckDuckGo and print a Markdown table
/// keyword_news OpenAI
///
/// # Google News RSS, processed by five parallel workers, newest first
/// keyword_news 台積電 --source google-news --parallel --order newest
///
/// # GNews with the key from the environment, summaries translated to Traditional Chinese
/// GNEWS_API_KEY=... keyword_news Nvidia -s gnews --translate-to zh-TW -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Keyword to search news for
    pub keyword: String,

    /// News source to query
    #[arg(short, long, value_enum, default_value_t = SourceKind::Duckduckgo)]
    pub source: SourceKind,

    /// Maximum number of articles (defaults to the config value, 5)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Summarization strategy
    #[arg(long, value_enum, default_value_t = SummarizerKind::Extractive)]
    pub summarizer: SummarizerKind,

    /// Number of sentences per summary (defaults to the config value, 3)
    #[arg(long, value_parser = at_least_one())]
    pub sentences: Option<usize>,

    /// Process articles concurrently instead of one after another
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for --parallel (defaults to the config value, 5)
    #[arg(long, value_parser = at_least_one())]
    pub workers: Option<usize>,

    /// Order of the final result set
    #[arg(long, value_enum, default_value_t = OrderKind::Provider)]
    pub order: OrderKind,

    /// Translate summaries into this language (e.g. zh-TW)
    #[arg(long)]
    pub translate_to: Option<String>,

    /// Output directory for the JSON digest
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown table (printed to stdout when omitted)
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// GNews API key
    #[arg(long, env = "GNEWS_API_KEY", hide_env_values = true)]
    pub gnews_api_key: Option<String>,

    /// Massive/Polygon API key
    #[arg(long, env = "POLYGON_API_KEY", hide_env_values = true)]
    pub polygon_api_key: Option<String>,

    /// API key for the abstractive summarization endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Duckduckgo,
    GoogleNews,
    Bing,
    Gnews,
    Polygon,
    Yahoo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummarizerKind {
    /// LSA sentence ranking over jieba-segmented text
    Extractive,
    /// OpenAI-compatible sequence-to-sequence model
    Abstractive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderKind {
    /// Keep the order the source returned
    Provider,
    /// Order in which processing finished
    Completion,
    /// Newest publication time first
    Newest,
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(1..)
}
