//! Automated browser session shared by every page-scraping source.
//!
//! [`BrowserSession`] is the small set of primitives the crawlers need:
//! navigate, scroll, click, bounded waits and a snapshot of the rendered
//! DOM. Crawlers never hold browser elements across calls; they read the
//! snapshot with `scraper` and drive the page by CSS selector, so a stale
//! reference can only surface as [`CrawlError::StaleElement`] from a click.
//!
//! [`ChromeSession`] implements it over `chromiumoxide` (CDP). It is opened
//! once per run by the orchestrator and lent to each crawler in turn.

use crate::error::CrawlError;
use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Desktop Chrome on Windows, the most common client profile.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Hides the automation flag before any page script runs.
const WEBDRIVER_MASK_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['ko-KR', 'ko', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
"#;

const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Something to wait for on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// At least one element matches the selector.
    Present(&'static str),
    /// Some element matching the selector has exactly this trimmed text.
    TextIs {
        selector: &'static str,
        text: &'static str,
    },
}

impl WaitCondition {
    /// Evaluate the condition against a DOM snapshot.
    pub fn is_met_in(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        match self {
            WaitCondition::Present(css) => match Selector::parse(css) {
                Ok(sel) => document.select(&sel).next().is_some(),
                Err(_) => false,
            },
            WaitCondition::TextIs { selector, text } => match Selector::parse(selector) {
                Ok(sel) => document
                    .select(&sel)
                    .any(|el| el.text().collect::<String>().trim() == *text),
                Err(_) => false,
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            WaitCondition::Present(css) => css.to_string(),
            WaitCondition::TextIs { selector, text } => format!("{selector} = {text:?}"),
        }
    }
}

/// Browser primitives with no source-specific knowledge.
#[async_trait(?Send)]
pub trait BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), CrawlError>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), CrawlError>;

    /// Block until `condition` holds or `timeout` expires
    /// ([`CrawlError::WaitTimeout`]).
    async fn wait_until(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), CrawlError>;

    /// Serialized DOM of the current page.
    async fn html(&mut self) -> Result<String, CrawlError>;

    async fn current_url(&mut self) -> Result<String, CrawlError>;

    async fn close(&mut self) -> Result<(), CrawlError>;
}

/// How to launch the browser.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Explicit executable; discovered when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub width: u32,
    pub height: u32,
    pub user_agent: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: false,
            width: 1920,
            height: 1080,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

/// Locate a Chromium-family executable: `PATH` first, then well-known paths.
pub fn find_chrome_executable() -> Option<PathBuf> {
    let names = [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
    ];
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            for name in names {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
    }

    let well_known = [
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/opt/google/chrome/google-chrome",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    ];
    well_known
        .iter()
        .map(Path::new)
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

fn build_config(exe: &Path, settings: &BrowserSettings) -> Result<BrowserConfig, CrawlError> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: settings.width,
            height: settings.height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(settings.width, settings.height)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--lang=ko-KR")
        .arg(format!("--user-agent={}", settings.user_agent));

    if !settings.headless {
        builder = builder.with_head();
    }

    builder.build().map_err(CrawlError::Provisioning)
}

/// A single Chrome instance with one working tab.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch the browser and open one working tab.
    ///
    /// # Arguments
    ///
    /// * `settings` - Executable override, headless flag, window size and user agent
    ///
    /// # Returns
    ///
    /// A session with the webdriver-masking script installed on its tab.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Provisioning`] when no executable is found, Chrome
    /// fails to start, or the tab cannot be created. Failure here aborts
    /// the run.
    #[instrument(level = "info", skip_all, fields(headless = settings.headless))]
    pub async fn open(settings: &BrowserSettings) -> Result<Self, CrawlError> {
        let exe = match &settings.executable {
            Some(p) => p.clone(),
            None => find_chrome_executable().ok_or_else(|| {
                CrawlError::Provisioning(
                    "no Chrome/Chromium executable found; pass --chrome-path or set CHROME_EXECUTABLE"
                        .to_string(),
                )
            })?,
        };
        info!(exe = %exe.display(), "Launching browser");

        let config = build_config(&exe, settings)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Provisioning(format!("{}: {e}", exe.display())))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Provisioning(format!("failed to open tab: {e}")))?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            WEBDRIVER_MASK_SCRIPT,
        ))
        .await
        .map_err(|e| CrawlError::Provisioning(format!("failed to inject stealth script: {e}")))?;

        info!("Browser ready");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait(?Send)]
impl BrowserSession for ChromeSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), CrawlError> {
        self.page
            .evaluate(SCROLL_TO_BOTTOM_SCRIPT)
            .await
            .map_err(|e| CrawlError::Script(e.to_string()))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), CrawlError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| CrawlError::ElementNotFound(selector.to_string()))?;
        // script click: not blocked by overlays the way a synthetic mouse event is
        element
            .call_js_fn("function() { this.click(); }", false)
            .await
            .map_err(|e| CrawlError::StaleElement(format!("{selector}: {e}")))?;
        Ok(())
    }

    async fn wait_until(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), CrawlError> {
        let started = Instant::now();
        loop {
            // a page mid-navigation may refuse to serialize; treat it as "not yet"
            if let Ok(html) = self.page.content().await {
                if condition.is_met_in(&html) {
                    debug!(condition = %condition.describe(), elapsed_ms = started.elapsed().as_millis() as u64, "Wait satisfied");
                    return Ok(());
                }
            }
            if started.elapsed() >= timeout {
                return Err(CrawlError::WaitTimeout {
                    condition: condition.describe(),
                    timeout,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        self.page
            .content()
            .await
            .map_err(|e| CrawlError::Script(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        self.page
            .url()
            .await
            .map_err(|e| CrawlError::Script(e.to_string()))?
            .ok_or_else(|| CrawlError::Script("page has no URL".to_string()))
    }

    #[instrument(level = "info", skip_all)]
    async fn close(&mut self) -> Result<(), CrawlError> {
        let closed = self.browser.close().await;
        if let Err(e) = &closed {
            warn!(error = %e, "Browser did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        info!("Browser closed");
        closed
            .map(|_| ())
            .map_err(|e| CrawlError::Script(e.to_string()))
    }
}
