//! # AI News Crawler
//!
//! Collects the last week of AI-related news, papers and forum posts from a
//! fixed set of sources into one normalized JSON corpus for downstream
//! script-writing and review agents.
//!
//! ## Features
//!
//! - Drives one Chrome session through six sites (PyTorch Korea forum,
//!   TechCrunch, Hugging Face trending papers, AI Times, arXiv and AI Times
//!   Korea), stopping each listing at the first item older than the window
//! - Asks Perplexity twice for a weekly trend report on the keyword
//! - Isolates failures per source; only a browser that cannot start aborts
//! - Writes a timestamped, pretty-printed JSON array of documents
//!
//! ## Usage
//!
//! ```sh
//! ai_news_crawler -k "LLM" --headless -o ./output/searcher
//! ```
//!
//! ## Architecture
//!
//! 1. **Synthesis**: two chat-completion calls, each parsed independently
//! 2. **Listing scan**: per source, collect in-window candidate links
//! 3. **Detail extraction**: visit each candidate and build a document
//! 4. **Output**: merge, count and write the report

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod browser;
mod cli;
mod cutoff;
mod dates;
mod error;
mod models;
mod orchestrator;
mod outputs;
mod scrapers;
mod synthesis;
#[cfg(test)]
mod testing;
mod utils;

use api::{PerplexityClient, RetryAsk};
use browser::ChromeSession;
use cli::Cli;
use cutoff::CutoffWindow;
use orchestrator::CrawlOrchestrator;
use outputs::json;
use scrapers::{CrawlSettings, SourceCrawler, SourceId};
use synthesis::SynthesisClient;
use utils::ensure_writable_dir;

const SYNTHESIS_MAX_RETRIES: usize = 2;

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
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let started_at = Local::now();
    info!("ai_news_crawler starting up");

    // Parse CLI
    let mut args = Cli::parse();
    if let Err(e) = args.prompt_missing() {
        warn!(error = %e, "Could not read interactive input; using defaults");
    }
    debug!(keyword = %args.keyword(), output_dir = %args.output_dir, sources = ?args.sources, "Parsed CLI arguments");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let window = CutoffWindow::new(Utc::now(), args.window_days);
    info!(start = %window.start(), end = %window.now(), "Collection window");

    // ---- Synthesis source ----
    let synthesis = match args.synthesis_key() {
        Some(key) => match PerplexityClient::new(
            &args.synthesis_endpoint,
            &args.synthesis_model,
            key,
            args.synthesis_timeout(),
        ) {
            Ok(client) => {
                let api = RetryAsk::new(client, SYNTHESIS_MAX_RETRIES, StdDuration::from_secs(1));
                Some(SynthesisClient::new(api, args.keyword()))
            }
            Err(e) => {
                warn!(error = %e, "Could not build synthesis client; skipping synthesis");
                None
            }
        },
        None => {
            warn!("No Perplexity API key; skipping synthesis");
            None
        }
    };

    // ---- Page-scraping sources, always in the fixed order ----
    let crawlers: Vec<Box<dyn SourceCrawler>> = SourceId::ALL
        .into_iter()
        .filter(|id| args.sources.contains(id))
        .map(|id| id.crawler(args.keyword()))
        .collect();
    info!(count = crawlers.len(), "Sources selected");

    let orchestrator =
        CrawlOrchestrator::new(synthesis, crawlers, window, CrawlSettings::default());
    let browser_settings = args.browser_settings();
    let outcome = match orchestrator
        .run(|| ChromeSession::open(&browser_settings))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Crawl aborted");
            return Err(e.into());
        }
    };

    let failed = outcome.failed_sources();
    if !failed.is_empty() {
        warn!(?failed, "Some sources failed; the report holds partial results");
    }

    // ---- Output ----
    let mut report = outcome.report;
    let path = json::write_report(&report.documents, &args.output_dir, &started_at).await?;
    info!(path = %path.display(), total = report.total(), "Saved crawl report");
    report.output_file = Some(path);
    report.log_stats();

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
