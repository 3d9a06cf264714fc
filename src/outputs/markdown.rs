//! Markdown rendering of a finished search.
//!
//! The digest becomes a single table with a clickable link column and a
//! wide summary column. Fallback and unavailable summaries carry their
//! marker so readers can tell them from generated text.

use crate::models::Digest;
use crate::outputs::{file_timestamp, keyword_slug};
use chrono::Local;
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render a [`Digest`] as Markdown.
pub fn digest_to_markdown(digest: &Digest) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# News for \"{}\"\n", escape_cell(&digest.keyword));
    let _ = writeln!(
        md,
        "_Source: {} · generated {}_\n",
        digest.source, digest.generated_at
    );

    if digest.records.is_empty() {
        let reason = digest.diagnostic.as_deref().unwrap_or("No results.");
        let _ = writeln!(md, "> {}", escape_cell(reason));
        return md;
    }

    md.push_str("| # | Title | Source | Published | Summary | Link |\n");
    md.push_str("|---|-------|--------|-----------|---------|------|\n");
    for (i, record) in digest.records.iter().enumerate() {
        let published = record
            .published_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | [link]({}) |",
            i + 1,
            escape_cell(&record.title),
            escape_cell(record.source_name.as_deref().unwrap_or("")),
            published,
            escape_cell(&record.summary_text()),
            escape_link(&record.link),
        );
    }
    md
}

/// Write the rendered digest to `{markdown_output_dir}/{keyword-slug}_{timestamp}.md`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir))]
pub async fn write_markdown(
    digest: &Digest,
    markdown_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(markdown_output_dir).await?;
    let path = PathBuf::from(markdown_output_dir).join(format!(
        "{}_{}.md",
        keyword_slug(&digest.keyword),
        file_timestamp(&Local::now())
    ));
    fs::write(&path, digest_to_markdown(digest)).await?;
    info!(path = %path.display(), "Wrote Markdown digest");
    Ok(path)
}

/// Keep cell text on one line and stop pipes from splitting the cell.
fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn escape_link(url: &str) -> String {
    url.replace(' ', "%20").replace('(', "%28").replace(')', "%29")
}
