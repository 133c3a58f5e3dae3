//! The LLM-backed source.
//!
//! Instead of scraping a page, the model is asked (twice, with two phrasings
//! of the same topic) for a weekly trend report shaped as a one-element JSON
//! array of documents. Each call is parsed on its own; a failed call
//! contributes nothing and the other call's output is still used.

use crate::api::AskAsync;
use crate::cutoff::CutoffWindow;
use crate::error::SynthesisError;
use crate::models::Document;
use crate::utils::{looks_truncated, truncate_for_log};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

pub const SOURCE_LABEL: &str = "퍼플렉시티";
pub const CATEGORY: &str = "종합";

/// Builds the report prompt and turns completions into documents.
#[derive(Debug)]
pub struct SynthesisClient<A> {
    asker: A,
    keyword: String,
}

impl<A> SynthesisClient<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(asker: A, keyword: impl Into<String>) -> Self {
        Self {
            asker,
            keyword: keyword.into(),
        }
    }

    /// The two topic phrasings sent with the shared prompt.
    pub fn queries(&self) -> [String; 2] {
        let kw = &self.keyword;
        [
            format!("{kw} AI 기술 동향 최신 뉴스 연구 발전"),
            format!("{kw} 인공지능 기술 발전 기업 투자 연구 동향 최신 소식"),
        ]
    }

    /// Run both calls and concatenate their documents in call order.
    #[instrument(level = "info", skip_all, fields(keyword = %self.keyword))]
    pub async fn collect(&self, window: &CutoffWindow) -> Vec<Document> {
        let prompt = build_prompt(&self.keyword, window);
        let defaults = report_defaults(window);
        let mut documents = Vec::new();

        for (i, query) in self.queries().iter().enumerate() {
            let call = i + 1;
            match self.call(&prompt, query, &defaults).await {
                Ok(docs) => {
                    info!(call, count = docs.len(), "Synthesis call finished");
                    documents.extend(docs);
                }
                Err(e) => warn!(call, error = %e, "Synthesis call yielded nothing"),
            }
        }
        info!(count = documents.len(), "Synthesis source finished");
        documents
    }

    #[instrument(level = "info", skip_all, fields(query = %query))]
    async fn call(
        &self,
        prompt: &str,
        query: &str,
        defaults: &Document,
    ) -> Result<Vec<Document>, SynthesisError> {
        let full = format!("{prompt}\n\n**검색 주제**: {query}");
        let reply = self.asker.ask(&full).await?;
        let values = parse_json_array(&reply).map_err(|e| {
            warn!(reply = %truncate_for_log(&reply, 200), "Unparseable synthesis reply");
            e
        })?;
        Ok(values
            .into_iter()
            .filter_map(|v| into_document(v, defaults))
            .collect())
    }
}

/// The single-report instruction, dated to the window.
pub fn build_prompt(keyword: &str, window: &CutoffWindow) -> String {
    let start = window.start().format("%Y-%m-%d");
    let Document {
        title, date: end, ..
    } = report_defaults(window);
    format!(
        r#"# 목표
아래 구조와 규칙을 그대로 따르는 JSON 배열 하나만 출력하세요. 배열 밖에는 설명, 인사, 추가 텍스트를 절대 쓰지 마세요.

# JSON 구조
[
    {{
        "title": "{title}",
        "url": "",
        "content": "{{CONTENT_PLACEHOLDER}}",
        "date": "{end}",
        "source": "{SOURCE_LABEL}",
        "category": "{CATEGORY}"
    }}
]

# content 작성 규칙
1. 주제: {start}부터 {end}까지 지난 {days}일 동안의 AI 동향 가운데 "{keyword}"와 직접 관련된 뉴스, 연구, 기술 발전, 기업 발표가 전체의 70% 이상이 되도록 구성하세요.
2. 분량: 한국어 기준 1000자 내외.
3. 형식: 여러 주제를 엮은 줄글로 작성하고 마크다운 헤더(#)나 글머리 기호(-)는 쓰지 마세요.
4. 출처: 신뢰할 수 있는 최신 기사와 논문을 바탕으로 하되 content 안에는 URL, 웹사이트 이름, 논문 제목 같은 출처를 절대 표기하지 마세요.
5. 집중: "{keyword}" 관련 기술, 연구, 기업의 전략과 투자, 실제 적용 사례와 그 의미를 구체적인 기술명, 기업명, 수치와 함께 다루세요.
6. 보조 내용: 나머지 30%는 "{keyword}"와 간접적으로 연결되는 전반적인 AI 동향으로 채우세요."#,
        days = window.days(),
    )
}

fn report_defaults(window: &CutoffWindow) -> Document {
    let start = window.start().format("%Y-%m-%d");
    let end = window.now().format("%Y-%m-%d").to_string();
    Document {
        title: format!("주간 AI 기술 동향 보고서 ({start} ~ {end})"),
        url: String::new(),
        content: String::new(),
        date: end,
        source: SOURCE_LABEL.to_string(),
        category: CATEGORY.to_string(),
    }
}

/// Extract the JSON array embedded in free text.
///
/// The substring from the first `[` to the last `]` is parsed. A single
/// object is wrapped into a one-element list; any other JSON value yields an
/// empty list. Text without brackets is an empty list, not an error.
///
/// # Arguments
///
/// * `text` - The raw model reply, possibly with prose around the array
///
/// # Returns
///
/// The array elements in order, not yet checked to be objects.
///
/// # Errors
///
/// [`SynthesisError::ResponseParse`] when the bracketed text is not valid
/// JSON. The message notes when the reply looks cut off.
pub fn parse_json_array(text: &str) -> Result<Vec<Value>, SynthesisError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        warn!("No JSON array in synthesis reply");
        return Ok(Vec::new());
    };
    if end < start {
        warn!("No JSON array in synthesis reply");
        return Ok(Vec::new());
    }

    let parsed: Value = serde_json::from_str(&text[start..=end]).map_err(|e| {
        let reason = if looks_truncated(&e) {
            format!("truncated JSON: {e}")
        } else {
            e.to_string()
        };
        SynthesisError::ResponseParse(reason)
    })?;

    Ok(match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => Vec::new(),
    })
}

/// Fill a model-returned object into a document. Non-objects are dropped.
fn into_document(value: Value, defaults: &Document) -> Option<Document> {
    let Value::Object(fields) = value else {
        warn!("Dropping non-object entry from synthesis reply");
        return None;
    };
    let field = |name: &str, fallback: &str| -> String {
        string_field(&fields, name).unwrap_or_else(|| fallback.to_string())
    };
    Some(Document {
        title: field("title", &defaults.title),
        url: field("url", &defaults.url),
        content: field("content", &defaults.content),
        date: field("date", &defaults.date),
        source: field("source", &defaults.source),
        category: field("category", &defaults.category),
    })
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAsk;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn window() -> CutoffWindow {
        CutoffWindow::new(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap(), 7)
    }

    const REPORT: &str = r#"Here is the report:
[
    {"title": "주간 AI 기술 동향 보고서 (2026-10-11 ~ 2026-10-18)", "url": "", "content": "이번 주에는...", "date": "2026-10-18", "source": "퍼플렉시티", "category": "종합"}
]
Hope this helps."#;

    #[test]
    fn test_parse_array_surrounded_by_prose() {
        let values = parse_json_array(REPORT).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["content"], "이번 주에는...");
    }

    #[test]
    fn test_parse_without_brackets_is_empty() {
        assert!(parse_json_array("I cannot help with that.").unwrap().is_empty());
        assert!(parse_json_array("] backwards [").unwrap().is_empty());
    }

    #[test]
    fn test_parse_scalar_array_contents_and_bad_json() {
        assert_eq!(parse_json_array("[1, 2]").unwrap().len(), 2);
        assert!(matches!(
            parse_json_array("[{\"title\": ]"),
            Err(SynthesisError::ResponseParse(_))
        ));
    }

    #[test]
    fn test_into_document_fills_defaults_and_drops_non_objects() {
        let defaults = report_defaults(&window());
        let partial = serde_json::json!({"title": "요약", "content": "본문", "url": null});
        let doc = into_document(partial, &defaults).unwrap();
        assert_eq!(doc.title, "요약");
        assert_eq!(doc.url, "");
        assert_eq!(doc.date, "2026-10-18");
        assert_eq!(doc.source, SOURCE_LABEL);
        assert_eq!(doc.category, CATEGORY);
        assert!(into_document(Value::from(3), &defaults).is_none());
    }

    #[test]
    fn test_prompt_names_window_and_keyword() {
        let prompt = build_prompt("LLM", &window());
        assert!(prompt.contains("주간 AI 기술 동향 보고서 (2026-10-11 ~ 2026-10-18)"));
        assert!(prompt.contains("\"LLM\"와 직접 관련된"));
        assert!(prompt.contains("{CONTENT_PLACEHOLDER}"));
    }

    #[tokio::test]
    async fn test_second_call_timeout_keeps_first_result() {
        let asker = ScriptedAsk::new(vec![
            Ok(REPORT.to_string()),
            Err(SynthesisError::Timeout(Duration::from_secs(60))),
        ]);
        let client = SynthesisClient::new(asker, "LLM");
        let docs = client.collect(&window()).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "이번 주에는...");

        let prompts = client.asker.prompts.borrow();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].ends_with("**검색 주제**: LLM AI 기술 동향 최신 뉴스 연구 발전"));
        assert!(prompts[1].ends_with("**검색 주제**: LLM 인공지능 기술 발전 기업 투자 연구 동향 최신 소식"));
    }

    #[tokio::test]
    async fn test_results_are_concatenated_without_dedup() {
        let asker = ScriptedAsk::new(vec![Ok(REPORT.to_string()), Ok(REPORT.to_string())]);
        let docs = SynthesisClient::new(asker, "AI").collect(&window()).await;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0], docs[1]);
    }
}
