//! One crawl run: the synthesis source, then every page-scraping source in
//! order over a single browser session, then the merged report.
//!
//! Each source moves `Pending → Running → Done | Failed` on its own. A
//! failing source keeps whatever documents it produced before the failure
//! and the run moves on. The browser is released after the last source no
//! matter how the sources ended. Only a browser that cannot be opened stops
//! the run.

use crate::api::AskAsync;
use crate::browser::BrowserSession;
use crate::cutoff::CutoffWindow;
use crate::error::CrawlError;
use crate::models::Document;
use crate::outputs::report::{CrawlReport, aggregate};
use crate::scrapers::{CrawlSettings, SourceCrawler};
use crate::synthesis::{self, SynthesisClient};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Pending,
    Running,
    Done,
    Failed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceState::Pending => "PENDING",
            SourceState::Running => "RUNNING",
            SourceState::Done => "DONE",
            SourceState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Bookkeeping for one source within a run.
#[derive(Debug, Clone)]
pub struct SourceRun {
    pub label: String,
    pub state: SourceState,
    pub documents: usize,
    pub error: Option<String>,
}

impl SourceRun {
    fn pending(label: &str) -> Self {
        Self {
            label: label.to_string(),
            state: SourceState::Pending,
            documents: 0,
            error: None,
        }
    }
}

/// What a finished run hands back.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub report: CrawlReport,
    /// Synthesis first when enabled, then the crawlers in order.
    pub runs: Vec<SourceRun>,
}

impl CrawlOutcome {
    /// Labels of the sources that ended in `FAILED`, in run order.
    pub fn failed_sources(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter(|r| r.state == SourceState::Failed)
            .map(|r| r.label.as_str())
            .collect()
    }
}

pub struct CrawlOrchestrator<A> {
    synthesis: Option<SynthesisClient<A>>,
    crawlers: Vec<Box<dyn SourceCrawler>>,
    window: CutoffWindow,
    settings: CrawlSettings,
}

impl<A> CrawlOrchestrator<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(
        synthesis: Option<SynthesisClient<A>>,
        crawlers: Vec<Box<dyn SourceCrawler>>,
        window: CutoffWindow,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            synthesis,
            crawlers,
            window,
            settings,
        }
    }

    /// Run every source and merge the results.
    ///
    /// `launch` opens the browser; it is only called when there is at least
    /// one page-scraping source, after synthesis has finished.
    #[instrument(level = "info", skip_all, fields(window_days = self.window.days()))]
    pub async fn run<B, F, Fut>(&self, launch: F) -> Result<CrawlOutcome, CrawlError>
    where
        B: BrowserSession,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B, CrawlError>>,
    {
        let t0 = Instant::now();
        let mut batches: Vec<Vec<Document>> = Vec::new();
        let mut runs: Vec<SourceRun> = Vec::new();

        if let Some(client) = &self.synthesis {
            let mut run = SourceRun::pending(synthesis::SOURCE_LABEL);
            run.state = SourceState::Running;
            let docs = client.collect(&self.window).await;
            run.documents = docs.len();
            run.state = SourceState::Done;
            runs.push(run);
            batches.push(docs);
        }

        if !self.crawlers.is_empty() {
            let mut browser = launch().await?;
            let scraped = self.crawl_sources(&mut browser).await;

            if let Err(e) = browser.close().await {
                warn!(error = %e, "Browser did not shut down cleanly");
            } else {
                info!("Browser closed");
            }

            for (run, docs) in scraped {
                runs.push(run);
                batches.push(docs);
            }
        }

        let report = aggregate(batches);
        for run in &runs {
            match &run.error {
                None => info!(source = %run.label, state = %run.state, documents = run.documents, "Source summary"),
                Some(e) => warn!(source = %run.label, state = %run.state, documents = run.documents, error = %e, "Source summary"),
            }
        }
        info!(
            total = report.total(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Crawl finished"
        );
        Ok(CrawlOutcome { report, runs })
    }

    /// Every crawler in order, each isolated from the others' failures.
    async fn crawl_sources(&self, browser: &mut dyn BrowserSession) -> Vec<(SourceRun, Vec<Document>)> {
        let mut runs: Vec<SourceRun> = self
            .crawlers
            .iter()
            .map(|c| SourceRun::pending(c.profile().label))
            .collect();
        let mut out = Vec::with_capacity(self.crawlers.len());

        for (crawler, run) in self.crawlers.iter().zip(runs.iter_mut()) {
            run.state = SourceState::Running;
            info!(source = %run.label, "Source started");

            let mut docs = Vec::new();
            let result = AssertUnwindSafe(crawler.crawl(browser, &self.window, &self.settings, &mut docs))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(CrawlError::SourceFailed {
                        source_label: run.label.clone(),
                        reason: panic_message(panic.as_ref()),
                    })
                });

            run.documents = docs.len();
            match result {
                Ok(()) => {
                    run.state = SourceState::Done;
                    info!(source = %run.label, documents = run.documents, "Source finished");
                }
                Err(e) => {
                    run.state = SourceState::Failed;
                    error!(source = %run.label, documents = run.documents, error = %e, "Source failed; keeping partial results");
                    run.error = Some(e.to_string());
                }
            }
            out.push(docs);
        }

        runs.into_iter().zip(out).collect()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
