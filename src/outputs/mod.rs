//! Merging the run's documents and writing them out.
//!
//! # Submodules
//!
//! - [`report`]: merges per-source batches into a [`report::CrawlReport`] with counts
//! - [`json`]: writes the merged documents as one pretty-printed JSON array
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── search_results_20261018_091500.json
//! └── search_results_20261019_091502.json
//! ```

pub mod json;
pub mod report;
