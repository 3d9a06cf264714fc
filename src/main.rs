//! # Keyword News
//!
//! Search a news source for a keyword, fetch every hit, summarize it and
//! render the result as a table of title, summary and link.
//!
//! ## Features
//!
//! - Six interchangeable sources: DuckDuckGo News, Google News RSS, Bing News
//!   RSS, GNews, Massive/Polygon ticker news and a Yahoo search scrape
//! - Redirect and interstitial link resolution (Google News, Bing, Yahoo)
//! - Article extraction with a browser identity and bounded timeouts
//! - Extractive LSA summaries over jieba-segmented text, or abstractive
//!   summaries from an OpenAI-compatible model
//! - Optional translation of summaries
//! - Fallback to page or provider descriptions when an article cannot be read
//! - Sequential or bounded-parallel processing with progress logging
//!
//! ## Usage
//!
//! ```sh
//! keyword_news 台積電 --source google-news --parallel -j ./json -m ./markdown
//! ```
//!
//! ## Architecture
//!
//! 1. **Search**: the source turns the keyword into candidate items
//! 2. **Resolve**: indirect links are turned into publisher URLs
//! 3. **Extract**: article pages are reduced to plain text
//! 4. **Summarize**: usable text is summarized, everything else falls back
//! 5. **Output**: a JSON digest and a Markdown table

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod extractor;
mod models;
mod outputs;
mod pipeline;
mod resolver;
mod sources;
mod summarizer;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, OrderKind, SummarizerKind};
use config::Config;
use extractor::ArticleExtractor;
use models::Digest;
use outputs::{json, markdown};
use pipeline::{ExecutionMode, Pipeline, PipelineOptions, ResultOrder};
use resolver::LinkResolver;
use sources::{AnySource, SourceProvider};
use summarizer::AnySummarizer;
use summarizer::abstractive::AbstractiveSummarizer;
use summarizer::lsa::LsaSummarizer;
use summarizer::translate::GoogleTranslator;
use utils::{ensure_writable_dir, truncate_for_log};

/// Timeout for a single abstractive summarization request.
const LLM_TIMEOUT_SECS: u64 = 120;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("keyword_news starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(
        keyword = %args.keyword,
        source = ?args.source,
        ?args.json_output_dir,
        ?args.markdown_output_dir,
        "Parsed CLI arguments"
    );

    let mut config = Config::load(args.config.as_deref()).await?;
    apply_overrides(&mut config, &args);

    // Fail early on unwritable output directories
    for dir in [&args.json_output_dir, &args.markdown_output_dir].into_iter().flatten() {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Output directory not writable");
            return Err(e);
        }
    }

    let source = AnySource::from_config(args.source, &config)?;
    let resolver = LinkResolver::new(
        &config.user_agent,
        config.resolve_timeout(),
        config.resolver.intermediary_hosts.clone(),
    )?;
    let extractor = ArticleExtractor::new(&config.user_agent, config.request_timeout())?;

    let base = match args.summarizer {
        SummarizerKind::Extractive => AnySummarizer::Extractive(LsaSummarizer::new()),
        SummarizerKind::Abstractive => {
            AnySummarizer::Abstractive(AbstractiveSummarizer::from_config(
                &config.abstractive,
                std::time::Duration::from_secs(LLM_TIMEOUT_SECS),
            )?)
        }
    };
    let translator = GoogleTranslator::new(
        &config.translation.endpoint,
        &config.user_agent,
        config.request_timeout(),
    )?;
    let summarizer = base.with_translation(translator, config.translation.target.clone());

    let options = PipelineOptions {
        sentence_budget: config.sentence_budget,
        workers: config.workers,
        mode: if args.parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        },
        order: match args.order {
            OrderKind::Provider => ResultOrder::Provider,
            OrderKind::Completion => ResultOrder::Completion,
            OrderKind::Newest => ResultOrder::NewestFirst,
        },
    };
    info!(
        source = source.name(),
        limit = config.limit,
        ?options,
        translate_to = ?config.translation.target,
        "Pipeline configured"
    );

    let pipeline = Pipeline::new(resolver, extractor, summarizer, options);
    let output = pipeline
        .run(&source, &args.keyword, config.limit, |p| {
            info!(
                completed = p.completed,
                total = p.total,
                "Processing ({}/{}): {}",
                p.completed,
                p.total,
                truncate_for_log(&p.current_label, 80)
            );
        })
        .await;

    if let Some(diagnostic) = &output.diagnostic {
        warn!(%diagnostic, "Search produced no results");
    }
    let generated = output.records.iter().filter(|r| r.summary.is_generated()).count();
    info!(
        records = output.records.len(),
        generated,
        fallback = output.records.len() - generated,
        "Pipeline finished"
    );

    let digest = Digest {
        keyword: args.keyword.trim().to_string(),
        source: source.name().to_string(),
        generated_at: Local::now().to_rfc3339(),
        diagnostic: output.diagnostic,
        records: output.records,
    };

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(&digest, dir).await {
            error!(error = %e, "Failed to write JSON digest");
        }
    }

    match &args.markdown_output_dir {
        Some(dir) => {
            if let Err(e) = markdown::write_markdown(&digest, dir).await {
                error!(path = %dir, error = %e, "Failed writing Markdown");
            }
        }
        None => println!("{}", markdown::digest_to_markdown(&digest)),
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis(),
        "keyword_news finished"
    );
    Ok(())
}

/// Let command-line values win over the configuration file.
fn apply_overrides(config: &mut Config, args: &Cli) {
    if let Some(limit) = args.limit {
        config.limit = limit;
    }
    if let Some(sentences) = args.sentences {
        config.sentence_budget = sentences;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(key) = &args.gnews_api_key {
        config.gnews.api_key = Some(key.clone());
    }
    if let Some(key) = &args.polygon_api_key {
        config.polygon.api_key = Some(key.clone());
    }
    if let Some(key) = &args.llm_api_key {
        config.abstractive.api_key = Some(key.clone());
    }
    if let Some(target) = &args.translate_to {
        config.translation.target = Some(target.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_override_config() {
        let args = Cli::parse_from([
            "keyword_news",
            "ExampleCorp",
            "-n",
            "8",
            "--sentences",
            "2",
            "--gnews-api-key",
            "k",
            "--translate-to",
            "zh-TW",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.limit, 8);
        assert_eq!(config.sentence_budget, 2);
        assert_eq!(config.workers, 5);
        assert_eq!(config.gnews.api_key.as_deref(), Some("k"));
        assert_eq!(config.translation.target.as_deref(), Some("zh-TW"));
    }
}
