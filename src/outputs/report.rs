//! Merging per-source document lists into the run's report.

use crate::models::Document;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// The merged corpus of one run, plus counts over it.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub documents: Vec<Document>,
    pub by_source: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    /// Set once the report has been written.
    pub output_file: Option<PathBuf>,
}

impl CrawlReport {
    pub fn total(&self) -> usize {
        self.documents.len()
    }

    /// Source labels in order of first appearance.
    pub fn sources(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.source.as_str()).unique().collect()
    }

    /// Categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.category.as_str()).unique().collect()
    }

    pub fn log_stats(&self) {
        info!(
            total = self.total(),
            sources = ?self.sources(),
            categories = ?self.categories(),
            path = ?self.output_file,
            "Collected documents"
        );
        for (category, count) in &self.by_category {
            info!(%category, count, "Per-category count");
        }
        for (source, count) in &self.by_source {
            info!(%source, count, "Per-source count");
        }
    }
}

/// Concatenate per-source batches in invocation order and count the result.
///
/// No deduplication happens here: each source already keeps its own
/// candidate URLs unique, and the same URL reported by two sources stays
/// twice.
///
/// # Arguments
///
/// * `batches` - One document list per source, synthesis first
///
/// # Returns
///
/// A [`CrawlReport`] with `output_file` unset.
pub fn aggregate<I>(batches: I) -> CrawlReport
where
    I: IntoIterator<Item = Vec<Document>>,
{
    let documents: Vec<Document> = batches.into_iter().flatten().collect();

    let by_source = documents
        .iter()
        .map(|d| d.source.clone())
        .counts()
        .into_iter()
        .collect();
    let by_category = documents
        .iter()
        .map(|d| d.category.clone())
        .counts()
        .into_iter()
        .collect();

    CrawlReport {
        documents,
        by_source,
        by_category,
        output_file: None,
    }
}
