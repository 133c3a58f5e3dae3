//! PyTorch Korea user group forum, news category.
//!
//! A Discourse board rendered with infinite scroll. Each topic row carries
//! its timestamp as epoch milliseconds in `span.relative-date[data-time]`.
//! Pinned topics are excluded from the scan since they sit above the
//! newest-first ordering.

use super::{
    Advance, DatePolicy, DetailPage, SourceCrawler, attr, first, href, selector,
};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, KST};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::{paragraph_text, text_of};
use async_trait::async_trait;
use scraper::Html;

const PROFILE: SourceProfile = SourceProfile {
    id: "pytorch-kr",
    label: "파이토치 한국 사용자 모임",
    category: "기술",
};

const LISTING_URL: &str = "https://discuss.pytorch.kr/c/news";
const TOPIC_ROWS: &str = "tbody.topic-list-body tr.topic-list-item";
const UNPINNED_ROWS: &str = "tbody.topic-list-body tr.topic-list-item:not(.pinned)";
const TOPIC_DATE: &str = "span.relative-date";
const TOPIC_LINK: &str = "a.title";
const POST_BODY: &str = "article#post_1 div.cooked";
const POST_TITLE: &str = "a.fancy-title";

const DATE_FORMAT: DateFormat = DateFormat::EpochMillis { offset_secs: KST };

#[derive(Debug, Default)]
pub struct PyTorchKr;

#[async_trait(?Send)]
impl SourceCrawler for PyTorchKr {
    fn profile(&self) -> SourceProfile {
        PROFILE
    }

    fn listing_url(&self) -> String {
        LISTING_URL.to_string()
    }

    fn listing_ready(&self) -> WaitCondition {
        WaitCondition::Present(TOPIC_ROWS)
    }

    fn advance(&self) -> Advance {
        Advance::Scroll
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::TrustListing
    }

    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>> {
        let document = Html::parse_document(html);
        let rows = match selector(UNPINNED_ROWS) {
            Ok(rows) => rows,
            Err(e) => return vec![Err(e)],
        };
        document
            .select(&rows)
            .map(|row| {
                let stamp = attr(first(row, TOPIC_DATE)?, "data-time")?;
                let observed = DATE_FORMAT.parse(&stamp)?;
                let url = href(first(row, TOPIC_LINK)?, page_url)?;
                Ok(CandidateLink {
                    url,
                    observed: Some(observed),
                })
            })
            .collect()
    }

    fn detail_ready(&self) -> WaitCondition {
        WaitCondition::Present(POST_BODY)
    }

    fn read_detail(&self, html: &str, _page_url: &str) -> Result<DetailPage, CrawlError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        Ok(DetailPage {
            title: text_of(first(root, POST_TITLE)?),
            content: paragraph_text(first(root, POST_BODY)?),
            published: None,
        })
    }
}
