//! AI Times Korea (aitimes.kr), technology section.
//!
//! One page of links with no dates. Each article is opened by URL and its
//! `입력` stamp decides whether it is kept.

use super::{Advance, DatePolicy, DetailPage, SourceCrawler, find_dotted_stamp, first, href, selector};
use crate::browser::WaitCondition;
use crate::dates::{DateFormat, KST};
use crate::error::CrawlError;
use crate::models::{CandidateLink, SourceProfile};
use crate::utils::{paragraph_text, text_of};
use async_trait::async_trait;
use scraper::Html;

const PROFILE: SourceProfile = SourceProfile {
    id: "aitimes-kr",
    label: "인공지능 신문",
    category: "기술",
};

const LISTING_URL: &str =
    "https://www.aitimes.kr/news/articleList.html?sc_section_code=S1N2&view_type=sm";
const LIST_LINKS: &str = "h4.titles a, a.list-title";
const HEADLINE: &str = "h3.heading";
const STAMP: &str = "ul.infomation li:nth-child(2)";
const BODY: &str = "article#article-view-content-div";

const DATE_FORMAT: DateFormat = DateFormat::DateTime {
    pattern: "%Y.%m.%d %H:%M",
    offset_secs: KST,
};

#[derive(Debug, Default)]
pub struct AiTimesKr;

#[async_trait(?Send)]
impl SourceCrawler for AiTimesKr {
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
        Advance::SinglePage
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::ConfirmOnDetail
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

        let raw = text_of(first(root, STAMP)?);
        let stamp = find_dotted_stamp(&raw)
            .ok_or_else(|| CrawlError::date_parse(raw.clone(), "no YYYY.MM.DD HH:MM stamp"))?;

        Ok(DetailPage {
            title: text_of(first(root, HEADLINE)?),
            content: first(root, BODY).map(paragraph_text).unwrap_or_default(),
            published: Some(DATE_FORMAT.parse(&stamp)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutoff::CutoffWindow;
    use crate::scrapers::CrawlSettings;
    use crate::testing::ScriptedBrowser;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    const LISTING: &str = r#"<html><body>
        <h4 class="titles"><a href="/news/articleView.html?idxno=101">새 모델</a></h4>
        <a class="list-title" href="/news/articleView.html?idxno=102">지난 소식</a>
        <a class="other" href="/ad">광고</a>
    </body></html>"#;

    fn article(title: &str, stamp: &str, body: Option<&str>) -> String {
        let body = body
            .map(|b| format!(r#"<article id="article-view-content-div"><p>{b}</p></article>"#))
            .unwrap_or_default();
        format!(
            r#"<html><body><h3 class="heading">{title}</h3>
               <ul class="infomation"><li>기자명 김기자</li><li>입력 {stamp}</li></ul>{body}</body></html>"#
        )
    }

    #[test]
    fn test_read_listing_matches_both_link_shapes() {
        let entries = AiTimesKr.read_listing(LISTING, LISTING_URL);
        let urls: Vec<_> = entries.into_iter().map(|e| e.unwrap().url).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.aitimes.kr/news/articleView.html?idxno=101",
                "https://www.aitimes.kr/news/articleView.html?idxno=102",
            ]
        );
    }

    #[test]
    fn test_missing_body_yields_empty_content() {
        let detail = AiTimesKr
            .read_detail(&article("제목", "2026.10.17 11:20", None), LISTING_URL)
            .unwrap();
        assert_eq!(detail.content, "");
        assert_eq!(
            detail.published.unwrap().to_rfc3339(),
            "2026-10-17T11:20:00+09:00"
        );
    }

    #[tokio::test]
    async fn test_crawl_keeps_only_recent_articles() {
        let mut browser = ScriptedBrowser::new()
            .page(LISTING_URL, vec![LISTING.to_string()])
            .page(
                "https://www.aitimes.kr/news/articleView.html?idxno=101",
                vec![article("새 모델", "2026.10.17 11:20", Some("본문"))],
            )
            .page(
                "https://www.aitimes.kr/news/articleView.html?idxno=102",
                vec![article("지난 소식", "2026.10.01 08:00", Some("옛 본문"))],
            );
        let window = CutoffWindow::new(Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap(), 7);
        let settings = CrawlSettings {
            settle: Duration::ZERO,
            ..CrawlSettings::default()
        };

        let mut docs = Vec::new();
        AiTimesKr
            .crawl(&mut browser, &window, &settings, &mut docs)
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "새 모델");
        assert_eq!(docs[0].date, "2026-10-17");
        assert_eq!(docs[0].source, "인공지능 신문");
        assert_eq!(docs[0].content, "본문");
    }
}
