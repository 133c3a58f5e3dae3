//! arXiv advanced search, computer science, keyword matched against abstracts.
//!
//! Results are ordered by announcement date, newest first. Each result has a
//! `Submitted 15 October, 2026; originally announced ...` line that bounds
//! the scan; the abstract is read from the paper's `abs` page.

use super::{Advance, DatePolicy, DetailPage, SourceCrawler, first, href, selector};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, UTC};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::text_of;
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const PROFILE: SourceProfile = SourceProfile {
    id: "arxiv",
    label: "arXiv",
    category: "기술",
};

const SEARCH_URL: &str = "https://arxiv.org/search/advanced";
const RESULTS: &str = "li.arxiv-result";
const RESULT_META: &str = "p.is-size-7";
const RESULT_LINK: &str = "p.list-title > a";
const NEXT_PAGE: &str = "a.pagination-next";
const TITLE: &str = "h1.title";
const ABSTRACT: &str = "blockquote.abstract";
const SUBMITTED: &str = "Submitted";

const DATE_FORMAT: DateFormat = DateFormat::Date {
    pattern: "%d %B, %Y",
    offset_secs: UTC,
};

/// Search for `keyword` in abstracts of computer science papers.
#[derive(Debug, Clone)]
pub struct Arxiv {
    keyword: String,
}

impl Arxiv {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }

    /// `15 October, 2026` out of the result's submitted line.
    fn submitted_date(result: ElementRef<'_>) -> Result<String, CrawlError> {
        let metas = selector(RESULT_META)?;
        let line = result
            .select(&metas)
            .map(text_of)
            .find(|text| text.starts_with(SUBMITTED))
            .ok_or_else(|| CrawlError::ElementNotFound("submitted date line".to_string()))?;
        let head = line.split(';').next().unwrap_or_default();
        Ok(head.trim_start_matches(SUBMITTED).trim().to_string())
    }
}

fn strip_label(text: String, label: &str) -> String {
    match text.strip_prefix(label) {
        Some(rest) => rest.trim().to_string(),
        None => text,
    }
}

#[async_trait(?Send)]
impl SourceCrawler for Arxiv {
    fn profile(&self) -> SourceProfile {
        PROFILE
    }

    fn listing_url(&self) -> String {
        format!(
            "{SEARCH_URL}?advanced=&terms-0-operator=AND&terms-0-term={}&terms-0-field=abstract\
             &classification-computer_science=y&classification-physics_archives=all\
             &classification-include_cross_list=include&date-filter_by=all_dates&date-year=\
             &date-from_date=&date-to_date=&date-date_type=submitted_date&abstracts=show\
             &size=50&order=-announced_date_first",
            urlencoding::encode(&self.keyword)
        )
    }

    fn listing_ready(&self) -> WaitCondition {
        WaitCondition::Present(RESULTS)
    }

    fn advance(&self) -> Advance {
        Advance::FollowNext(NEXT_PAGE)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::TrustListing
    }

    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>> {
        let document = Html::parse_document(html);
        let results = match selector(RESULTS) {
            Ok(results) => results,
            Err(e) => return vec![Err(e)],
        };
        document
            .select(&results)
            .map(|result| {
                let observed = DATE_FORMAT.parse(&Self::submitted_date(result)?)?;
                let url = href(first(result, RESULT_LINK)?, page_url)?;
                Ok(CandidateLink {
                    url,
                    observed: Some(observed),
                })
            })
            .collect()
    }

    fn detail_ready(&self) -> WaitCondition {
        WaitCondition::Present(ABSTRACT)
    }

    fn read_detail(&self, html: &str, _page_url: &str) -> Result<DetailPage, CrawlError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        Ok(DetailPage {
            title: strip_label(text_of(first(root, TITLE)?), "Title:"),
            content: strip_label(text_of(first(root, ABSTRACT)?), "Abstract:"),
            published: None,
        })
    }
}
