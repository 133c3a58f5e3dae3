//! TechCrunch, artificial intelligence category.
//!
//! A paginated WordPress block listing. Cards carry ISO-8601 timestamps with
//! an offset in `time[datetime]`; the "next" pagination link is followed
//! until the boundary is reached.

use super::{Advance, DatePolicy, DetailPage, SourceCrawler, attr, first, href, selector};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, UTC};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::{paragraph_text, text_of};
use async_trait::async_trait;
use scraper::Html;

const PROFILE: SourceProfile = SourceProfile {
    id: "techcrunch",
    label: "TechCrunch",
    category: "산업",
};

const LISTING_URL: &str = "https://techcrunch.com/category/artificial-intelligence/";
const CARDS: &str = "li.wp-block-post";
const CARD_LINK: &str = "h3 a";
const CARD_TIME: &str = "time";
const NEXT_PAGE: &str = "a.wp-block-query-pagination-next";
const HEADLINE: &str = "h1.wp-block-post-title";
const BODY: &str = "div.entry-content";

const DATE_FORMAT: DateFormat = DateFormat::Iso8601 { offset_secs: UTC };

#[derive(Debug, Default)]
pub struct TechCrunch;

#[async_trait(?Send)]
impl SourceCrawler for TechCrunch {
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
        Advance::FollowNext(NEXT_PAGE)
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::TrustListing
    }

    fn read_listing(&self, html: &str, page_url: &str) -> Vec<Result<CandidateLink, CrawlError>> {
        let document = Html::parse_document(html);
        let cards = match selector(CARDS) {
            Ok(cards) => cards,
            Err(e) => return vec![Err(e)],
        };
        document
            .select(&cards)
            .map(|card| {
                let url = href(first(card, CARD_LINK)?, page_url)?;
                let stamp = attr(first(card, CARD_TIME)?, "datetime")?;
                Ok(CandidateLink {
                    url,
                    observed: Some(DATE_FORMAT.parse(&stamp)?),
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
        Ok(DetailPage {
            title: text_of(first(root, HEADLINE)?),
            content: paragraph_text(first(root, BODY)?),
            published: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutoff::CutoffWindow;
    use crate::scrapers::{CrawlSettings, ScanStop};
    use crate::testing::ScriptedBrowser;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn card(slug: &str, datetime: &str) -> String {
        format!(
            r#"<li class="wp-block-post"><h3 class="loop-card__title"><a href="https://techcrunch.com/2026/10/{slug}/">{slug}</a></h3><time datetime="{datetime}">x</time></li>"#
        )
    }

    fn page(cards: &[String], next: Option<&str>) -> String {
        let next = next
            .map(|href| format!(r#"<a class="wp-block-query-pagination-next" href="{href}">Next</a>"#))
            .unwrap_or_default();
        format!("<html><body><ul>{}</ul>{next}</body></html>", cards.concat())
    }

    #[test]
    fn test_read_listing_parses_offset_timestamps() {
        let html = page(&[card("openai-devday", "2026-10-16T09:05:12-07:00")], None);
        let entries = TechCrunch.read_listing(&html, LISTING_URL);
        let link = entries[0].as_ref().unwrap();
        assert_eq!(link.url, "https://techcrunch.com/2026/10/openai-devday/");
        assert_eq!(link.observed.unwrap().to_rfc3339(), "2026-10-16T09:05:12-07:00");
    }

    #[tokio::test]
    async fn test_pagination_until_boundary() {
        let first_page = page(
            &[
                card("a", "2026-10-17T10:00:00-07:00"),
                card("b", "2026-10-15T10:00:00-07:00"),
            ],
            Some("/category/artificial-intelligence/page/2/"),
        );
        let second_page = page(
            &[
                card("c", "2026-10-12T10:00:00-07:00"),
                card("d", "2026-10-09T10:00:00-07:00"),
                card("e", "2026-10-08T10:00:00-07:00"),
            ],
            Some("/category/artificial-intelligence/page/3/"),
        );
        let mut browser = ScriptedBrowser::new()
            .page(LISTING_URL, vec![first_page])
            .page(
                "https://techcrunch.com/category/artificial-intelligence/page/2/",
                vec![second_page],
            );
        let window = CutoffWindow::new(Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(), 7);
        let settings = CrawlSettings {
            settle: Duration::ZERO,
            ..CrawlSettings::default()
        };

        let scan = TechCrunch
            .scan_listing(&mut browser, &window, &settings)
            .await
            .unwrap();
        assert_eq!(scan.stop, ScanStop::BoundaryReached);
        assert_eq!(scan.renders, 2);
        let urls: Vec<_> = scan.candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://techcrunch.com/2026/10/a/",
                "https://techcrunch.com/2026/10/b/",
                "https://techcrunch.com/2026/10/c/",
            ]
        );
    }

    #[test]
    fn test_read_detail() {
        let html = r#"<html><body>
            <h1 class="wp-block-post-title">Anthropic ships a thing</h1>
            <div class="entry-content"><p>Lead.</p><script>track()</script><p>More.</p></div>
        </body></html>"#;
        let detail = TechCrunch.read_detail(html, "https://techcrunch.com/x/").unwrap();
        assert_eq!(detail.title, "Anthropic ships a thing");
        assert_eq!(detail.content, "Lead.\nMore.");
    }
}
