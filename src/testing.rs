//! Test doubles for the browser session and the completion API.

use crate::api::AskAsync;
use crate::browser::{BrowserSession, WaitCondition};
use crate::error::{CrawlError, SynthesisError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

/// Serves canned HTML keyed by URL.
///
/// Each URL has a list of renders; scrolling or clicking moves to the next
/// render (sticking at the last one), navigating resets to the first. Waits
/// succeed or time out immediately based on the current render.
#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    pages: HashMap<String, Vec<String>>,
    broken: HashSet<String>,
    current: Option<String>,
    render: usize,
    pub visits: Vec<String>,
    /// Shared so a test can observe the close after handing the browser off.
    pub closed: Rc<Cell<bool>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page with one or more successive renders.
    pub fn page(mut self, url: &str, renders: Vec<String>) -> Self {
        self.pages.insert(url.to_string(), renders);
        self
    }

    /// Navigating to `url` fails outright.
    pub fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    fn current_html(&self) -> Result<&str, CrawlError> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| CrawlError::Script("no page loaded".to_string()))?;
        self.pages
            .get(url)
            .and_then(|renders| renders.get(self.render))
            .map(String::as_str)
            .ok_or_else(|| CrawlError::Script(format!("no render for {url}")))
    }

    fn advance_render(&mut self) {
        if let Some(renders) = self.current.as_ref().and_then(|u| self.pages.get(u)) {
            if self.render + 1 < renders.len() {
                self.render += 1;
            }
        }
    }
}

#[async_trait(?Send)]
impl BrowserSession for ScriptedBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        self.visits.push(url.to_string());
        if self.broken.contains(url) || !self.pages.contains_key(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "unreachable".to_string(),
            });
        }
        self.current = Some(url.to_string());
        self.render = 0;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), CrawlError> {
        self.advance_render();
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), CrawlError> {
        let document = Html::parse_document(self.current_html()?);
        let present = Selector::parse(selector)
            .map(|sel| document.select(&sel).next().is_some())
            .unwrap_or(false);
        if !present {
            return Err(CrawlError::ElementNotFound(selector.to_string()));
        }
        self.advance_render();
        Ok(())
    }

    async fn wait_until(
        &mut self,
        condition: &WaitCondition,
        timeout: Duration,
    ) -> Result<(), CrawlError> {
        if condition.is_met_in(self.current_html()?) {
            Ok(())
        } else {
            Err(CrawlError::WaitTimeout {
                condition: format!("{condition:?}"),
                timeout,
            })
        }
    }

    async fn html(&mut self) -> Result<String, CrawlError> {
        self.current_html().map(str::to_string)
    }

    async fn current_url(&mut self) -> Result<String, CrawlError> {
        self.current
            .clone()
            .ok_or_else(|| CrawlError::Script("no page loaded".to_string()))
    }

    async fn close(&mut self) -> Result<(), CrawlError> {
        self.closed.set(true);
        Ok(())
    }
}

/// Replays canned completion outcomes in order and records every prompt.
/// Once the script runs out each call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedAsk {
    replies: RefCell<Vec<Result<String, SynthesisError>>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedAsk {
    pub fn new(mut replies: Vec<Result<String, SynthesisError>>) -> Self {
        replies.reverse();
        Self {
            replies: RefCell::new(replies),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl AskAsync for ScriptedAsk {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<String, SynthesisError> {
        self.prompts.borrow_mut().push(text.to_string());
        self.replies
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Err(SynthesisError::Transport("script exhausted".to_string())))
    }
}
