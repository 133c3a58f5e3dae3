//! AI Times (aitimes.com), industry section.
//!
//! The listing shows no dates, so every link is a candidate and the scan is
//! bounded by clicking the "more" button at most five times. The real date
//! is read on the article page, preferring the original input stamp over
//! the last-update stamp, and out-of-window articles are dropped there.

use super::{
    Advance, CrawlSettings, DatePolicy, DetailPage, SourceCrawler, find_dotted_stamp, first, href,
    selector,
};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, KST};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::{paragraph_text, text_of};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const PROFILE: SourceProfile = SourceProfile {
    id: "aitimes",
    label: "AI타임즈",
    category: "산업",
};

const LISTING_URL: &str =
    "https://www.aitimes.com/news/articleList.html?sc_section_code=S1N3&view_type=sm";
const LIST_LINKS: &str = "h2.altlist-subject > a";
const MORE_BUTTON: &str = "button.list-btn-more";
const MORE_CLICKS: usize = 5;
const HEADLINE: &str = "h1.heading";
const BODY: &str = "article#article-view-content-div";
const INPUT_STAMP: &str = "div.info-update-origin";
const UPDATE_STAMP: &str = "li.info-update.show";
const INPUT_LABEL: &str = "입력";

const DATE_FORMAT: DateFormat = DateFormat::DateTime {
    pattern: "%Y.%m.%d %H:%M",
    offset_secs: KST,
};

#[derive(Debug, Default)]
pub struct AiTimes;

impl AiTimes {
    /// Input stamp first, then any `li` labelled as input, then the update stamp.
    fn stamp_element<'a>(root: ElementRef<'a>) -> Option<ElementRef<'a>> {
        if let Ok(el) = first(root, INPUT_STAMP) {
            return Some(el);
        }
        let items = selector("li").ok()?;
        root.select(&items)
            .find(|li| text_of(*li).contains(INPUT_LABEL))
            .or_else(|| first(root, UPDATE_STAMP).ok())
    }
}

#[async_trait(?Send)]
impl SourceCrawler for AiTimes {
    fn profile(&self) -> SourceProfile {
        PROFILE
    }

    fn listing_url(&self) -> String {
        LISTING_URL.to_string()
    }

    fn listing_ready(&self) -> WaitCondition {
        WaitCondition::Present(LIST_LINKS)
    }

    fn advance(&self) -> Advance {
        Advance::ClickMore(MORE_BUTTON)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::ConfirmOnDetail
    }

    fn render_cap(&self, settings: &CrawlSettings) -> usize {
        settings.max_renders.min(MORE_CLICKS + 1)
    }

    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>> {
        let document = Html::parse_document(html);
        let links = match selector(LIST_LINKS) {
            Ok(links) => links,
            Err(e) => return vec![Err(e)],
        };
        document
            .select(&links)
            .map(|a| {
                Ok(CandidateLink {
                    url: href(a, page_url)?,
                    observed: None,
                })
            })
            .collect()
    }

    fn detail_ready(&self) -> WaitCondition {
        WaitCondition::Present(HEADLINE)
    }

    fn read_detail(&self, html: &str, _page_url: &str) -> Result<DetailPage, CrawlError> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let stamp_el = Self::stamp_element(root)
            .ok_or_else(|| CrawlError::ElementNotFound("input/update date".to_string()))?;
        let raw = text_of(stamp_el);
        let stamp = find_dotted_stamp(&raw)
            .ok_or_else(|| CrawlError::date_parse(raw.clone(), "no YYYY.MM.DD HH:MM stamp"))?;
        let published = DATE_FORMAT.parse(&stamp)?;

        let content = first(root, BODY).map(paragraph_text).unwrap_or_default();
        Ok(DetailPage {
            title: text_of(first(root, HEADLINE)?),
            content,
            published: Some(published),
        })
    }
}
