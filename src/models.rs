//! Data models shared by the crawlers, the synthesis source and the report.
//!
//! - [`Document`]: the normalized unit of output, one per article/paper/post
//! - [`CandidateLink`]: a listing-phase sighting of an item
//! - [`CandidateSet`]: URL-keyed, first-seen-wins set of candidates
//! - [`SourceProfile`]: the label and category stamped on a source's documents
//! - [`Extraction`]: the per-item outcome of the detail phase

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A normalized piece of content.
///
/// Serialized field order matches the corpus consumed downstream:
/// `title, url, content, date, source, category`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Document {
    pub title: String,
    /// Empty for synthesis documents.
    pub url: String,
    pub content: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Human-readable origin label.
    pub source: String,
    /// Coarse topic bucket, assigned per source.
    pub category: String,
}

impl Document {
    /// Build a scraped document, stamping the source's label and category.
    pub fn scraped(
        profile: &SourceProfile,
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
        published: &DateTime<FixedOffset>,
    ) -> Self {
        Document {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            date: published.format("%Y-%m-%d").to_string(),
            source: profile.label.to_string(),
            category: profile.category.to_string(),
        }
    }
}

/// Where a source's documents come from, as shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProfile {
    /// Stable identifier used on the command line and in logs.
    pub id: &'static str,
    pub label: &'static str,
    pub category: &'static str,
}

/// An item seen on a listing page.
///
/// `observed` is the listing's provisional timestamp. Sources that only show
/// the date on the detail page leave it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub observed: Option<DateTime<FixedOffset>>,
}

/// Candidates in discovery order, unique by URL. The first sighting wins.
#[derive(Debug, Default)]
pub struct CandidateSet {
    order: Vec<CandidateLink>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    /// Record a sighting. Returns `false` when the URL was already known,
    /// in which case the earlier date is kept.
    pub fn insert(&mut self, link: CandidateLink) -> bool {
        if self.index.contains_key(&link.url) {
            return false;
        }
        self.index.insert(link.url.clone(), self.order.len());
        self.order.push(link);
        true
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> Option<&CandidateLink> {
        self.index.get(url).map(|&i| &self.order[i])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateLink> {
        self.order.iter()
    }
}

impl IntoIterator for CandidateSet {
    type Item = CandidateLink;
    type IntoIter = std::vec::IntoIter<CandidateLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

/// Outcome of visiting one candidate's detail page.
#[derive(Debug)]
pub enum Extraction {
    Collected(Document),
    /// The detail page showed a date outside the window.
    OutOfWindow { url: String, date: String },
    /// Missing element, stale reference, unparseable date, or timeout.
    Skipped { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PROFILE: SourceProfile = SourceProfile {
        id: "techcrunch",
        label: "TechCrunch",
        category: "산업",
    };

    fn at(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_document_serialization_field_order() {
        let doc = Document::scraped(
            &PROFILE,
            "Title",
            "https://techcrunch.com/a",
            "Body",
            &at(2026, 10, 17),
        );
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"title":"Title","url":"https://techcrunch.com/a","content":"Body","date":"2026-10-17","source":"TechCrunch","category":"산업"}"#
        );
    }

    #[test]
    fn test_document_date_uses_site_offset() {
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let published = kst.with_ymd_and_hms(2026, 10, 18, 1, 30, 0).unwrap();
        let doc = Document::scraped(&PROFILE, "t", "u", "c", &published);
        assert_eq!(doc.date, "2026-10-18");
    }

    #[test]
    fn test_candidate_set_first_sighting_wins() {
        let mut set = CandidateSet::default();
        assert!(set.insert(CandidateLink {
            url: "https://a".to_string(),
            observed: Some(at(2026, 10, 17)),
        }));
        assert!(!set.insert(CandidateLink {
            url: "https://a".to_string(),
            observed: Some(at(2026, 10, 12)),
        }));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("https://a").unwrap().observed, Some(at(2026, 10, 17)));
    }

    #[test]
    fn test_candidate_set_keeps_discovery_order() {
        let mut set = CandidateSet::default();
        for url in ["https://c", "https://a", "https://b", "https://a"] {
            set.insert(CandidateLink {
                url: url.to_string(),
                observed: None,
            });
        }
        let urls: Vec<_> = set.into_iter().map(|c| c.url).collect();
        assert_eq!(urls, vec!["https://c", "https://a", "https://b"]);
    }
}
