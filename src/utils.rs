//! Utility functions for text cleanup, URL handling, logging and file system checks.
//!
//! - Whitespace normalization for text pulled out of rendered pages
//! - Relative link resolution against the page that contained them
//! - String truncation for logging long model responses
//! - JSON error classification for truncated model output
//! - Output directory validation

use scraper::ElementRef;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text under `el`, whitespace-collapsed into one line.
pub fn text_of(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Body text as one line per `<p>`, skipping empty paragraphs.
///
/// Containers without paragraphs fall back to [`text_of`].
pub fn paragraph_text(el: ElementRef<'_>) -> String {
    let Ok(p) = scraper::Selector::parse("p") else {
        return text_of(el);
    };
    let lines: Vec<String> = el
        .select(&p)
        .map(text_of)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        text_of(el)
    } else {
        lines.join("\n")
    }
}

/// Resolve `href` against the page it was found on.
///
/// Absolute hrefs are returned normalized; relative ones are joined.
pub fn resolve_url(base: &str, href: &str) -> Result<String, url::ParseError> {
    let base = Url::parse(base)?;
    Ok(base.join(href.trim())?.to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (backing off to a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// A completion cut off by a token limit fails with an EOF error; this is
/// worth calling out separately in the logs from plain malformed output.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
