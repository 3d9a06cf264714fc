//! JSON output of a finished search.
//!
//! Each run writes one file, grouped by keyword:
//! ```text
//! json_output_dir/
//! └── examplecorp/
//!     └── 2025-05-06T08-00-00.json
//! ```

use crate::models::Digest;
use crate::outputs::{file_timestamp, keyword_slug};
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`Digest`] to `{json_output_dir}/{keyword-slug}/{timestamp}.json`.
///
/// Returns the path of the written file.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_digest(
    digest: &Digest,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;

    let full_json_dir = PathBuf::from(json_output_dir).join(keyword_slug(&digest.keyword));
    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{}.json", file_timestamp(&Local::now())));
    fs::write(&path, json).await?;
    info!(path = %path.display(), records = digest.records.len(), "Wrote JSON digest");

    Ok(path)
}
