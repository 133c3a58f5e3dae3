//! Hugging Face trending papers.
//!
//! The board scrolls infinitely. Each `article` card has a span reading
//! `Published on Oct 15, 2026`; the card's other spans are skipped until one
//! parses. The abstract sits in the `div` following the `Abstract` heading.

use super::{Advance, DatePolicy, DetailPage, SourceCrawler, first, href, selector};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, UTC};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::text_of;
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const PROFILE: SourceProfile = SourceProfile {
    id: "huggingface",
    label: "HuggingFace Trending",
    category: "기술",
};

const LISTING_URL: &str = "https://huggingface.co/papers/trending";
const CARDS: &str = "article";
const CARD_LINK: &str = "h3 a";
const PUBLISHED_PREFIX: &str = "Published on ";
const ABSTRACT_HEADING: &str = "Abstract";

const DATE_FORMAT: DateFormat = DateFormat::Date {
    pattern: "%b %d, %Y",
    offset_secs: UTC,
};

#[derive(Debug, Default)]
pub struct HuggingFace;

#[async_trait(?Send)]
impl SourceCrawler for HuggingFace {
    fn profile(&self) -> SourceProfile {
        PROFILE
    }

    fn listing_url(&self) -> String {
        LISTING_URL.to_string()
    }

    fn listing_ready(&self) -> WaitCondition {
        WaitCondition::Present(CARDS)
    }

    fn advance(&self) -> Advance {
        Advance::Scroll
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::TrustListing
    }

    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>> {
        let document = Html::parse_document(html);
        let (cards, spans) = match (selector(CARDS), selector("span")) {
            (Ok(cards), Ok(spans)) => (cards, spans),
            (Err(e), _) | (_, Err(e)) => return vec![Err(e)],
        };
        document
            .select(&cards)
            .map(|card| {
                let observed = card
                    .select(&spans)
                    .find_map(|span| {
                        let text = text_of(span);
                        DATE_FORMAT
                            .parse(text.strip_prefix(PUBLISHED_PREFIX).unwrap_or(&text))
                            .ok()
                    })
                    .ok_or_else(|| CrawlError::date_parse("", "no publication date on card"))?;
                let url = href(first(card, CARD_LINK)?, page_url)?;
                Ok(CandidateLink {
                    url,
                    observed: Some(observed),
                })
            })
            .collect()
    }

    fn detail_ready(&self) -> WaitCondition {
        WaitCondition::TextIs {
            selector: "h2",
            text: ABSTRACT_HEADING,
        }
    }

    fn read_detail(&self, html: &str, _page_url: &str) -> Result<DetailPage, CrawlError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let headings = selector("h2")?;
        let heading = root
            .select(&headings)
            .find(|h| text_of(*h) == ABSTRACT_HEADING)
            .ok_or_else(|| CrawlError::ElementNotFound("h2 Abstract".to_string()))?;
        let body = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div")
            .ok_or_else(|| CrawlError::ElementNotFound("abstract body".to_string()))?;

        Ok(DetailPage {
            title: text_of(first(root, "h1")?),
            content: text_of(body),
            published: None,
        })
    }
}
