//! The search → resolve → extract → summarize orchestrator.
//!
//! For every candidate the pipeline resolves the link (only when the source
//! hands out indirect links), extracts the article, summarizes usable text
//! and otherwise falls back to the page's meta description or the
//! provider's own description. Each candidate yields exactly one
//! [`ResultRecord`]; a panic while processing one item degrades that item
//! and never aborts the batch.
//!
//! Items run either one after another or on a bounded number of concurrent
//! futures (`buffer_unordered`). The order of the returned records is set by
//! [`ResultOrder`], not by completion timing.

use crate::extractor::ExtractArticle;
use crate::models::{
    CandidateItem, ExtractionStatus, FallbackOrigin, Progress, RecordSummary, ResolutionStatus,
    ResolvedLink, ResultRecord, Summary,
};
use crate::resolver::ResolveLink;
use crate::sources::SourceProvider;
use crate::summarizer::Summarize;
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, instrument, warn};

/// Concurrent items in parallel mode.
pub const DEFAULT_WORKERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Order of the records returned by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrder {
    /// The order the source returned the candidates in.
    #[default]
    Provider,
    /// The order items finished in. Only differs from `Provider` in parallel mode.
    Completion,
    /// Newest publication time first; undated items last, in provider order.
    NewestFirst,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub sentence_budget: usize,
    pub workers: usize,
    pub mode: ExecutionMode,
    pub order: ResultOrder,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            sentence_budget: 3,
            workers: DEFAULT_WORKERS,
            mode: ExecutionMode::Sequential,
            order: ResultOrder::Provider,
        }
    }
}

/// Records of one run plus the source's diagnostic when it found nothing.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub records: Vec<ResultRecord>,
    pub diagnostic: Option<String>,
}

pub struct Pipeline<R, E, S> {
    resolver: R,
    extractor: E,
    summarizer: S,
    options: PipelineOptions,
}

impl<R, E, S> Pipeline<R, E, S>
where
    R: ResolveLink,
    E: ExtractArticle,
    S: Summarize,
{
    pub fn new(resolver: R, extractor: E, summarizer: S, options: PipelineOptions) -> Self {
        Self {
            resolver,
            extractor,
            summarizer,
            options,
        }
    }

    /// Search `source` for `keyword` and process up to `limit` candidates.
    ///
    /// `progress` is called once per finished item.
    #[instrument(level = "info", skip(self, source, progress), fields(source = source.name()))]
    pub async fn run<P: SourceProvider>(
        &self,
        source: &P,
        keyword: &str,
        limit: usize,
        progress: impl FnMut(Progress),
    ) -> PipelineOutput {
        let outcome = source.search(keyword, limit).await;
        if outcome.items.is_empty() {
            return PipelineOutput {
                records: Vec::new(),
                diagnostic: outcome.diagnostic,
            };
        }
        let records = self
            .process_candidates(outcome.items, source.yields_indirect_links(), progress)
            .await;
        PipelineOutput {
            records,
            diagnostic: outcome.diagnostic,
        }
    }

    /// Turn every candidate into exactly one record.
    pub async fn process_candidates(
        &self,
        candidates: Vec<CandidateItem>,
        resolve_links: bool,
        mut progress: impl FnMut(Progress),
    ) -> Vec<ResultRecord> {
        let total = candidates.len();
        let mut finished: Vec<(usize, ResultRecord)> = Vec::with_capacity(total);

        match self.options.mode {
            ExecutionMode::Sequential => {
                for (i, item) in candidates.into_iter().enumerate() {
                    let record = self.process_guarded(item, resolve_links).await;
                    report(&mut progress, finished.len() + 1, total, &record);
                    finished.push((i, record));
                }
            }
            ExecutionMode::Parallel => {
                let workers = self.options.workers.max(1);
                info!(workers, total, "Starting parallel processing");
                let mut results = stream::iter(candidates.into_iter().enumerate())
                    .map(|(i, item)| async move {
                        (i, self.process_guarded(item, resolve_links).await)
                    })
                    .buffer_unordered(workers);
                while let Some((i, record)) = results.next().await {
                    report(&mut progress, finished.len() + 1, total, &record);
                    finished.push((i, record));
                }
            }
        }

        apply_order(finished, self.options.order)
    }

    /// Process one item, converting a panic into a degraded record.
    async fn process_guarded(&self, item: CandidateItem, resolve_links: bool) -> ResultRecord {
        let original = item.clone();
        match AssertUnwindSafe(self.process_item(item, resolve_links))
            .catch_unwind()
            .await
        {
            Ok(record) => record,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(title = %original.title, %reason, "Item processing panicked");
                let status = if resolve_links {
                    ResolutionStatus::Unresolved
                } else {
                    ResolutionStatus::Direct
                };
                let link = ResolvedLink {
                    original_url: original.url.clone(),
                    resolved_url: original.url.clone(),
                    status,
                };
                let summary =
                    fallback_summary(&original, None, format!("processing failed: {reason}"));
                assemble(original, link, summary)
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(title = %item.title))]
    async fn process_item(&self, item: CandidateItem, resolve_links: bool) -> ResultRecord {
        let link = if resolve_links {
            self.resolver.resolve(&item.url).await
        } else {
            ResolvedLink::direct(&item.url)
        };

        if link.status == ResolutionStatus::Unresolved {
            warn!(url = %link.original_url, "Link unresolved; skipping extraction");
            let summary = fallback_summary(&item, None, "link could not be resolved".to_string());
            return assemble(item, link, summary);
        }

        let content = self.extractor.extract(&link.resolved_url).await;
        let meta = content.meta_description.as_deref();
        let summary = match content.status {
            ExtractionStatus::Ok => {
                match self
                    .summarizer
                    .summarize(&content.body_text, self.options.sentence_budget)
                    .await
                {
                    Summary::Generated(result) => RecordSummary::Generated(result),
                    other => fallback_summary(&item, meta, other.display_text()),
                }
            }
            ExtractionStatus::TooShort => {
                fallback_summary(&item, meta, "article text too short".to_string())
            }
            ExtractionStatus::FetchFailed => {
                let error = content.error.as_deref().unwrap_or("unknown error");
                fallback_summary(&item, meta, format!("article fetch failed: {error}"))
            }
        };
        assemble(item, link, summary)
    }
}

/// Meta description first, then the provider's description, else unavailable.
pub fn fallback_summary(
    item: &CandidateItem,
    meta_description: Option<&str>,
    reason: String,
) -> RecordSummary {
    if let Some(meta) = meta_description.map(str::trim).filter(|m| !m.is_empty()) {
        return RecordSummary::Fallback {
            text: meta.to_string(),
            origin: FallbackOrigin::MetaDescription,
        };
    }
    if let Some(desc) = item.api_summary.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        return RecordSummary::Fallback {
            text: desc.to_string(),
            origin: FallbackOrigin::ProviderDescription,
        };
    }
    RecordSummary::Unavailable { reason }
}

fn assemble(item: CandidateItem, link: ResolvedLink, summary: RecordSummary) -> ResultRecord {
    ResultRecord {
        title: item.title,
        summary,
        link: link.resolved_url,
        source_name: item.source_name,
        published_at: item.published_at,
        resolution: link.status,
    }
}

fn report(
    progress: &mut impl FnMut(Progress),
    completed: usize,
    total: usize,
    record: &ResultRecord,
) {
    progress(Progress {
        completed,
        total,
        current_label: record.title.clone(),
    });
}

fn apply_order(mut finished: Vec<(usize, ResultRecord)>, order: ResultOrder) -> Vec<ResultRecord> {
    match order {
        ResultOrder::Provider => finished.sort_by_key(|(i, _)| *i),
        ResultOrder::Completion => {}
        ResultOrder::NewestFirst => {
            finished.sort_by_key(|(i, _)| *i);
            finished.sort_by(|(_, a), (_, b)| b.published_at.cmp(&a.published_at));
        }
    }
    finished.into_iter().map(|(_, record)| record).collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
