//! Turning a provider's HTML error page into a readable message.
//!
//! The upload endpoint reports failures as HTML rather than structured data, so the
//! extraction is a best-effort heuristic kept behind [`ErrorPageExtractor`].

use once_cell::sync::Lazy;
use regex::Regex;

/// Pulls a human-readable message out of an error response body.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait ErrorPageExtractor: Send + Sync {
    /// `None` when nothing readable is left.
    fn extract(&self, body: &str) -> Option<String>;
}

/// Default extractor: `<br>` becomes a newline, other tags are dropped, `&nbsp;` becomes a space.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlErrorPage;

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br[\s/]*>").expect("valid line break pattern"));

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("valid tag pattern"));

impl HtmlErrorPage {
    /// The cleaned text, before trimming and emptiness checks.
    pub fn clean(body: &str) -> String {
        let with_breaks = LINE_BREAK.replace_all(body, "\n");
        let stripped = ANY_TAG.replace_all(&with_breaks, "");
        stripped.replace("&nbsp;", " ")
    }
}

impl ErrorPageExtractor for HtmlErrorPage {
    fn extract(&self, body: &str) -> Option<String> {
        let cleaned = Self::clean(body);
        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
