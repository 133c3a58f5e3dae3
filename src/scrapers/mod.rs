//! Page-scraping sources and the two-phase protocol they share.
//!
//! Every source follows the same shape:
//!
//! 1. **Listing scan**: read the rendered list, record each new item's URL
//!    and provisional date, and stop at the first item older than the
//!    window (lists are newest-first), when a render adds nothing new, or
//!    when there is no way to load more. Otherwise scroll, click "more" or
//!    follow the next-page link and read again.
//! 2. **Detail extraction**: visit each in-window URL in discovery order,
//!    wait for the page's defining element, and build a [`Document`].
//!
//! The loop lives once, in the provided methods of [`SourceCrawler`];
//! the sources only supply URLs, selectors and a date rule.
//!
//! # Supported Sources
//!
//! | Source | Module | Listing advance | Date rule |
//! |--------|--------|-----------------|-----------|
//! | PyTorch Korea forum | [`pytorch_kr`] | infinite scroll | epoch millis |
//! | TechCrunch AI | [`techcrunch`] | next page | ISO-8601 |
//! | Hugging Face trending papers | [`huggingface`] | infinite scroll | `%b %d, %Y` |
//! | AI Times | [`aitimes`] | "more" button | `%Y.%m.%d %H:%M` on detail |
//! | arXiv advanced search | [`arxiv`] | next page | `%d %B, %Y` |
//! | AI Times Korea | [`aitimes_kr`] | single page | `%Y.%m.%d %H:%M` on detail |

use crate::browser::{BrowserSession, WaitCondition};
use crate::cutoff::CutoffWindow;
use crate::error::CrawlError;
use crate::models::{CandidateLink, CandidateSet, Document, Extraction, SourceProfile};
use crate::utils::resolve_url;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub mod aitimes;
pub mod aitimes_kr;
pub mod arxiv;
pub mod huggingface;
pub mod pytorch_kr;
pub mod techcrunch;

/// Page-scraping sources, in crawl order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SourceId {
    PytorchKr,
    Techcrunch,
    Huggingface,
    Aitimes,
    Arxiv,
    AitimesKr,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::PytorchKr,
        SourceId::Techcrunch,
        SourceId::Huggingface,
        SourceId::Aitimes,
        SourceId::Arxiv,
        SourceId::AitimesKr,
    ];

    /// Build the crawler. Only arXiv uses the keyword.
    pub fn crawler(self, keyword: &str) -> Box<dyn SourceCrawler> {
        match self {
            SourceId::PytorchKr => Box::new(pytorch_kr::PyTorchKr),
            SourceId::Techcrunch => Box::new(techcrunch::TechCrunch),
            SourceId::Huggingface => Box::new(huggingface::HuggingFace),
            SourceId::Aitimes => Box::new(aitimes::AiTimes),
            SourceId::Arxiv => Box::new(arxiv::Arxiv::new(keyword)),
            SourceId::AitimesKr => Box::new(aitimes_kr::AiTimesKr),
        }
    }
}

/// Per-run timing knobs handed to every crawler.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Bound on waiting for a listing to render.
    pub listing_timeout: Duration,
    /// Bound on waiting for a detail page's defining element.
    pub detail_timeout: Duration,
    /// Pause after scrolling, clicking or paging so new content can render.
    pub settle: Duration,
    /// Safety bound on listing renders per source.
    pub max_renders: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            listing_timeout: Duration::from_secs(15),
            detail_timeout: Duration::from_secs(10),
            settle: Duration::from_secs(2),
            max_renders: 50,
        }
    }
}

/// Which date a source's documents carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicy {
    /// The listing date is final; detail pages are not re-checked.
    TrustListing,
    /// Only the detail page shows the real date; out-of-window items are dropped there.
    ConfirmOnDetail,
}

/// How a listing loads more items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Infinite scroll.
    Scroll,
    /// Click a "more" button that appends items in place.
    ClickMore(&'static str),
    /// Follow the `href` of a next-page link.
    FollowNext(&'static str),
    /// Everything is on the first render.
    SinglePage,
}

/// Why a listing scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStop {
    /// An item older than the window was seen.
    BoundaryReached,
    /// A render produced no new items.
    EndOfContent,
    /// No scroll/button/next link left to load more.
    NoMoreContent,
    /// The source's render cap was hit.
    RenderCap,
    /// A bounded wait expired.
    TimedOut,
    /// The next listing page could not be loaded.
    PageUnreachable,
}

/// Result of the listing phase.
#[derive(Debug)]
pub struct ListingScan {
    pub candidates: CandidateSet,
    pub stop: ScanStop,
    pub renders: usize,
}

/// Fields read from a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub title: String,
    pub content: String,
    /// Authoritative date, for sources that show one on the detail page.
    pub published: Option<DateTime<FixedOffset>>,
}

/// A source of scraped documents.
///
/// Implementors hold only selector and format data. [`scan_listing`],
/// [`extract_detail`] and [`crawl`] are shared.
///
/// [`scan_listing`]: SourceCrawler::scan_listing
/// [`extract_detail`]: SourceCrawler::extract_detail
/// [`crawl`]: SourceCrawler::crawl
#[async_trait(?Send)]
pub trait SourceCrawler {
    fn profile(&self) -> SourceProfile;

    fn listing_url(&self) -> String;

    /// What must be on the page before the listing is read.
    fn listing_ready(&self) -> WaitCondition;

    fn advance(&self) -> Advance;

    fn date_policy(&self) -> DatePolicy;

    /// Upper bound on listing renders.
    fn render_cap(&self, settings: &CrawlSettings) -> usize {
        settings.max_renders
    }

    /// Every list item currently rendered, in page order. Items that cannot
    /// be read come back as errors and are skipped.
    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>>;

    fn detail_ready(&self) -> WaitCondition;

    fn read_detail(&self, html: &str, page_url: &str) -> Result<DetailPage, CrawlError>;

    /// Phase 1: boundary search over the listing.
    #[instrument(level = "info", skip_all, fields(source = self.profile().id))]
    async fn scan_listing(
        &self,
        browser: &mut dyn BrowserSession,
        window: &CutoffWindow,
        settings: &CrawlSettings,
    ) -> Result<ListingScan, CrawlError> {
        let source = self.profile().id;
        let mut candidates = CandidateSet::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut renders = 0usize;

        let url = self.listing_url();
        info!(source, %url, "Opening listing");
        browser.navigate(&url).await?;
        if let Err(e) = browser
            .wait_until(&self.listing_ready(), settings.listing_timeout)
            .await
        {
            if e.is_timeout() {
                warn!(source, error = %e, "Listing never rendered");
                return Ok(ListingScan {
                    candidates,
                    stop: ScanStop::TimedOut,
                    renders,
                });
            }
            return Err(e);
        }

        let cap = self.render_cap(settings);
        let stop = loop {
            let page_url = browser.current_url().await?;
            let html = browser.html().await?;
            renders += 1;

            let mut fresh = 0usize;
            let mut boundary = false;
            for entry in self.read_listing(&html, &page_url) {
                let link = match entry {
                    Ok(link) => link,
                    Err(e) => {
                        debug!(source, error = %e, "Skipping unreadable listing item");
                        continue;
                    }
                };
                if !seen.insert(link.url.clone()) {
                    continue;
                }
                fresh += 1;
                if let Some(observed) = &link.observed {
                    if !window.contains(observed) {
                        info!(source, url = %link.url, date = %observed.format("%Y-%m-%d"), "Reached item older than the window");
                        boundary = true;
                        break;
                    }
                }
                candidates.insert(link);
            }
            debug!(source, renders, fresh, collected = candidates.len(), "Listing render read");

            if boundary {
                break ScanStop::BoundaryReached;
            }
            if fresh == 0 {
                break ScanStop::EndOfContent;
            }
            if renders >= cap {
                break ScanStop::RenderCap;
            }

            match self.advance() {
                Advance::SinglePage => break ScanStop::NoMoreContent,
                Advance::Scroll => browser.scroll_to_bottom().await?,
                Advance::ClickMore(button) => match browser.click(button).await {
                    Ok(()) => {}
                    Err(CrawlError::ElementNotFound(_)) | Err(CrawlError::StaleElement(_)) => {
                        break ScanStop::NoMoreContent;
                    }
                    Err(e) => return Err(e),
                },
                Advance::FollowNext(link) => match next_page_url(&html, link, &page_url) {
                    Some(next) => {
                        debug!(source, %next, "Following next page");
                        match browser.navigate(&next).await {
                            Ok(()) => {}
                            Err(e @ CrawlError::Navigation { .. }) => {
                                warn!(source, error = %e, "Next page unreachable; keeping earlier pages");
                                break ScanStop::PageUnreachable;
                            }
                            Err(e) => return Err(e),
                        }
                        if let Err(e) = browser
                            .wait_until(&self.listing_ready(), settings.listing_timeout)
                            .await
                        {
                            if e.is_timeout() {
                                warn!(source, error = %e, "Next page never rendered");
                                break ScanStop::TimedOut;
                            }
                            return Err(e);
                        }
                    }
                    None => break ScanStop::NoMoreContent,
                },
            }
            if !settings.settle.is_zero() {
                tokio::time::sleep(settings.settle).await;
            }
        };

        info!(source, ?stop, renders, candidates = candidates.len(), "Listing scan finished");
        Ok(ListingScan {
            candidates,
            stop,
            renders,
        })
    }

    /// Phase 2 for one candidate. Never fails; problems become
    /// [`Extraction::Skipped`].
    #[instrument(level = "info", skip_all, fields(source = self.profile().id, url = %candidate.url))]
    async fn extract_detail(
        &self,
        browser: &mut dyn BrowserSession,
        candidate: &CandidateLink,
        window: &CutoffWindow,
        settings: &CrawlSettings,
    ) -> Extraction {
        let skipped = |e: CrawlError| Extraction::Skipped {
            url: candidate.url.clone(),
            reason: e.to_string(),
        };

        let detail = match load_detail(self, browser, &candidate.url, settings).await {
            Ok(detail) => detail,
            Err(e) => return skipped(e),
        };

        let published = match self.date_policy() {
            DatePolicy::TrustListing => candidate.observed,
            DatePolicy::ConfirmOnDetail => detail.published,
        };
        let Some(published) = published else {
            return skipped(CrawlError::date_parse("", "no publication date"));
        };
        if self.date_policy() == DatePolicy::ConfirmOnDetail && !window.contains(&published) {
            return Extraction::OutOfWindow {
                url: candidate.url.clone(),
                date: published.format("%Y-%m-%d").to_string(),
            };
        }

        Extraction::Collected(Document::scraped(
            &self.profile(),
            detail.title,
            candidate.url.clone(),
            detail.content,
            &published,
        ))
    }

    /// Run both phases, appending documents to `out` as they are produced so
    /// a failure part-way keeps what was already collected.
    #[instrument(level = "info", skip_all, fields(source = self.profile().id))]
    async fn crawl(
        &self,
        browser: &mut dyn BrowserSession,
        window: &CutoffWindow,
        settings: &CrawlSettings,
        out: &mut Vec<Document>,
    ) -> Result<(), CrawlError> {
        let label = self.profile().label;
        let scan = self.scan_listing(browser, window, settings).await?;
        if scan.candidates.is_empty() {
            info!(source = label, stop = ?scan.stop, renders = scan.renders, "No candidates in the window");
            return Ok(());
        }
        let total = scan.candidates.len();
        debug!(source = label, stop = ?scan.stop, renders = scan.renders, total, "Visiting candidates");

        for (i, candidate) in scan.candidates.iter().enumerate() {
            match self.extract_detail(browser, candidate, window, settings).await {
                Extraction::Collected(doc) => {
                    info!(source = label, index = i + 1, total, title = %doc.title, date = %doc.date, "Collected");
                    out.push(doc);
                }
                Extraction::OutOfWindow { url, date } => {
                    info!(source = label, %url, %date, "Detail date outside the window; dropped");
                }
                Extraction::Skipped { url, reason } => {
                    warn!(source = label, %url, %reason, "Detail extraction failed; skipped");
                }
            }
        }
        Ok(())
    }
}

/// Open a detail page, wait for it and read it. An empty title is an error.
async fn load_detail<C: SourceCrawler + ?Sized>(
    crawler: &C,
    browser: &mut dyn BrowserSession,
    url: &str,
    settings: &CrawlSettings,
) -> Result<DetailPage, CrawlError> {
    browser.navigate(url).await?;
    browser
        .wait_until(&crawler.detail_ready(), settings.detail_timeout)
        .await?;
    let html = browser.html().await?;
    let detail = crawler.read_detail(&html, url)?;
    if detail.title.is_empty() {
        return Err(CrawlError::ElementNotFound("title text".to_string()));
    }
    Ok(detail)
}

/// Parse a CSS selector, reporting failures as crawl errors.
pub(crate) fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| CrawlError::Script(format!("invalid selector {css}: {e:?}")))
}

/// First element under `scope` matching `css`.
pub(crate) fn first<'a>(scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>, CrawlError> {
    scope
        .select(&selector(css)?)
        .next()
        .ok_or_else(|| CrawlError::ElementNotFound(css.to_string()))
}

/// Required attribute of an element.
pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> Result<String, CrawlError> {
    el.value()
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| CrawlError::ElementNotFound(format!("{}[{name}]", el.value().name())))
}

/// Absolute URL of an element's `href`.
pub(crate) fn href(el: ElementRef<'_>, page_url: &str) -> Result<String, CrawlError> {
    let raw = attr(el, "href")?;
    resolve_url(page_url, &raw).map_err(|e| CrawlError::Script(format!("bad href {raw:?}: {e}")))
}

/// Absolute URL of the next-page link, if the page has one.
pub(crate) fn next_page_url(html: &str, link_css: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link = first(document.root_element(), link_css).ok()?;
    href(link, page_url).ok()
}

static DOTTED_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}\.\d{2}\.\d{2})\s+(\d{2}:\d{2})").expect("valid regex"));

/// Pull a `YYYY.MM.DD HH:MM` stamp out of free text, normalized to one space.
pub(crate) fn find_dotted_stamp(text: &str) -> Option<String> {
    DOTTED_STAMP
        .captures(text)
        .map(|c| format!("{} {}", &c[1], &c[2]))
}
