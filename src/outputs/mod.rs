//! Output generation for a finished search.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`Digest`](crate::models::Digest) to a JSON file
//! - [`markdown`]: Renders the digest as a Markdown table
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── examplecorp/
//!     ├── 2025-05-06T08-00-00.json
//!     └── 2025-05-06T20-00-00.json
//!
//! markdown_output_dir/
//! ├── examplecorp_2025-05-06T08-00-00.md
//! └── examplecorp_2025-05-06T20-00-00.md
//! ```

pub mod json;
pub mod markdown;

use crate::utils::slugify_title;
use chrono::{DateTime, Local};

/// File-name stem for a keyword; never empty.
pub fn keyword_slug(keyword: &str) -> String {
    let slug = slugify_title(keyword.trim());
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "keyword".to_string()
    } else {
        slug.to_string()
    }
}

/// Timestamp usable in file names on every platform.
pub fn file_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_keyword_slug() {
        assert_eq!(keyword_slug("ExampleCorp Q3"), "examplecorp-q3");
        assert_eq!(keyword_slug("台積電"), "台積電");
        assert_eq!(keyword_slug("!!!"), "keyword");
    }

    #[test]
    fn test_file_timestamp_has_no_colons() {
        let at = Local.with_ymd_and_hms(2025, 5, 6, 8, 30, 0).unwrap();
        assert_eq!(file_timestamp(&at), "2025-05-06T08-30-00");
    }
}
