//! JSON output of the merged corpus.
//!
//! The file is a single UTF-8 JSON array of documents, indented with four
//! spaces, rewritten whole on every run:
//!
//! ```text
//! {output_dir}/search_results_{YYYYMMDD_HHMMSS}.json
//! ```

use crate::models::Document;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::error::Error;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize documents with a four-space indent. Non-ASCII text is kept as is.
pub fn to_pretty_json(documents: &[Document]) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    documents.serialize(&mut ser)?;
    Ok(buf)
}

/// Path of the report for a run started at `stamp`.
pub fn report_path<Tz>(output_dir: &str, stamp: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Path::new(output_dir).join(format!(
        "search_results_{}.json",
        stamp.format("%Y%m%d_%H%M%S")
    ))
}

/// Write the documents to a timestamped file under `output_dir`.
///
/// Creates the directory if needed and writes the documents as a
/// pretty-printed UTF-8 JSON array.
///
/// # Arguments
///
/// * `documents` - The merged corpus, in report order
/// * `output_dir` - Directory for the report file
/// * `stamp` - Run start time used in the file name
///
/// # Returns
///
/// The path of the written file.
///
/// # Errors
///
/// Fails if the directory cannot be created, serialization fails, or the
/// file cannot be written.
///
/// # Output Path
///
/// The file is written to: `{output_dir}/search_results_{%Y%m%d_%H%M%S}.json`
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, count = documents.len()))]
pub async fn write_report<Tz>(
    documents: &[Document],
    output_dir: &str,
    stamp: &DateTime<Tz>,
) -> Result<PathBuf, Box<dyn Error>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let json = to_pretty_json(documents)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = report_path(output_dir, stamp);
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote crawl report");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn doc() -> Document {
        Document {
            title: "주간 AI 기술 동향 보고서".to_string(),
            url: String::new(),
            content: "본문".to_string(),
            date: "2026-10-18".to_string(),
            source: "퍼플렉시티".to_string(),
            category: "종합".to_string(),
        }
    }

    #[test]
    fn test_pretty_json_uses_four_spaces_and_raw_utf8() {
        let text = String::from_utf8(to_pretty_json(&[doc()]).unwrap()).unwrap();
        assert!(text.starts_with("[\n    {\n        \"title\": \"주간 AI 기술 동향 보고서\""));
        assert!(!text.contains("\\u"));
        let fields: Vec<_> = text
            .lines()
            .filter_map(|l| l.trim().split('"').nth(1))
            .collect();
        assert_eq!(fields, vec!["title", "url", "content", "date", "source", "category"]);
    }

    #[tokio::test]
    async fn test_write_report_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output/searcher");
        let out = out.to_str().unwrap();
        let stamp = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 18, 9, 15, 0)
            .unwrap();

        let path = write_report(&[doc()], out, &stamp).await.unwrap();
        assert!(path.ends_with("search_results_20261018_091500.json"));
        let back: Vec<Document> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, vec![doc()]);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_an_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = chrono::Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let path = write_report(&[], dir.path().to_str().unwrap(), &stamp)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
    }
}
