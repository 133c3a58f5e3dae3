//! Error kinds for crawling and synthesis.
//!
//! Only [`CrawlError::Provisioning`] is fatal to a run. Everything else is
//! caught at the item, phase, call or source level and degrades to "fewer
//! documents".

use std::time::Duration;
use thiserror::Error;

/// Failures raised while driving the browser or reading a page.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The browser could not be located or launched.
    #[error("browser provisioning failed: {0}")]
    Provisioning(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element existed on an earlier render but is gone now.
    #[error("stale element: {0}")]
    StaleElement(String),

    #[error("timed out after {timeout:?} waiting for {condition}")]
    WaitTimeout { condition: String, timeout: Duration },

    #[error("could not parse date {raw:?}: {reason}")]
    DateParse { raw: String, reason: String },

    #[error("browser script failed: {0}")]
    Script(String),

    /// Anything escaping a whole source's logic.
    #[error("source {source_label} failed: {reason}")]
    SourceFailed { source_label: String, reason: String },
}

impl CrawlError {
    /// A bounded wait expired; callers stop the current phase instead of failing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::WaitTimeout { .. })
    }

    pub fn date_parse(raw: impl Into<String>, reason: impl ToString) -> Self {
        CrawlError::DateParse {
            raw: raw.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures of a single synthesis call. Each one yields an empty result for that call.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    /// The completion envelope lacked `choices[0].message.content`.
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("could not parse JSON array from response: {0}")]
    ResponseParse(String),
}

impl SynthesisError {
    /// Rate limiting, server errors and transport hiccups are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            SynthesisError::Http { status, .. } => *status == 429 || *status >= 500,
            SynthesisError::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest does not expose the configured limit on the error
            SynthesisError::Timeout(Duration::ZERO)
        } else if let Some(status) = e.status() {
            SynthesisError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            SynthesisError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_recognised() {
        let e = CrawlError::WaitTimeout {
            condition: "li.arxiv-result".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert!(e.is_timeout());
        assert!(!CrawlError::ElementNotFound("h1".to_string()).is_timeout());
    }

    #[test]
    fn test_retryable_classification() {
        let too_many = SynthesisError::Http {
            status: 429,
            body: String::new(),
        };
        let bad_gateway = SynthesisError::Http {
            status: 502,
            body: String::new(),
        };
        let unauthorized = SynthesisError::Http {
            status: 401,
            body: String::new(),
        };
        assert!(too_many.is_retryable());
        assert!(bad_gateway.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(SynthesisError::Transport("reset".to_string()).is_retryable());
        assert!(!SynthesisError::Timeout(Duration::from_secs(60)).is_retryable());
        assert!(!SynthesisError::ResponseParse("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let e = CrawlError::date_parse("Jul 32, 2025", "input is out of range");
        assert_eq!(
            e.to_string(),
            "could not parse date \"Jul 32, 2025\": input is out of range"
        );
    }
}
