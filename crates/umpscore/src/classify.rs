//! Response classification: which observed responses are data worth capturing.
//!
//! The target site is not a documented API, so capture is inferred from
//! conventions. False positives are cheap; a false negative loses data with no
//! retry inside the same visit.

use serde::{Deserialize, Serialize};

/// URL substrings that mark a response as API-like under [`UrlPolicy::Strict`].
pub const CAPTURE_URL_INDICATORS: &[&str] =
    &["api", "data", "json", "xhr", "graphql", "rest", "ajax"];

/// URL markers used by endpoint discovery to flag requests.
pub const ENDPOINT_INDICATORS: &[&str] = &[
    "/api/", "/data/", "/json/", "ajax", "xhr", ".json", "graphql", "rest",
];

/// How much the URL has to say before a JSON response is captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlPolicy {
    /// Any successful JSON response is captured.
    #[default]
    Permissive,
    /// The URL must also contain one of [`CAPTURE_URL_INDICATORS`].
    Strict,
}

/// Decides whether a response should be captured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    policy: UrlPolicy,
}

impl Classifier {
    pub fn new(policy: UrlPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UrlPolicy {
        self.policy
    }

    /// True if the response is a successful JSON response the policy accepts.
    pub fn is_capturable(&self, url: &str, status: u16, content_type: &str) -> bool {
        if !(200..300).contains(&status) {
            return false;
        }
        if !is_json_content_type(content_type) {
            return false;
        }
        match self.policy {
            UrlPolicy::Permissive => true,
            UrlPolicy::Strict => contains_any(url, CAPTURE_URL_INDICATORS),
        }
    }
}

/// True if the media type names JSON (`application/json`, `+json` suffixes, `text/json`).
pub fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if media_type.is_empty() || !media_type.contains('/') {
        return false;
    }
    media_type.to_ascii_lowercase().contains("json")
}

/// True if a request URL looks like an API endpoint.
pub fn looks_like_endpoint(url: &str) -> bool {
    contains_any(url, ENDPOINT_INDICATORS)
}

fn contains_any(url: &str, needles: &[&str]) -> bool {
    let url = url.to_ascii_lowercase();
    needles.iter().any(|n| url.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_failures_and_html() {
        let c = Classifier::new(UrlPolicy::Strict);
        assert!(!c.is_capturable("https://x.com/api/umpires", 404, "application/json"));
        assert!(!c.is_capturable("https://x.com/api/umpires", 200, "text/html"));
        assert!(!c.is_capturable("https://x.com/api/umpires", 500, "application/json"));
        assert!(c.is_capturable("https://x.com/api/umpires", 200, "application/json; charset=utf-8"));
    }

    #[test]
    fn test_content_type_markers() {
        assert!(is_json_content_type("application/vnd.api+json"));
        assert!(is_json_content_type("TEXT/JSON"));
        assert!(!is_json_content_type(""));
        assert!(!is_json_content_type("json"));
        assert!(!is_json_content_type(";;;"));
        assert!(!is_json_content_type("text/plain; note=json"));
    }

    #[test]
    fn test_policy_url_indicators() {
        let strict = Classifier::new(UrlPolicy::Strict);
        let permissive = Classifier::default();
        let url = "https://cdn.example.com/static/bundle";
        assert!(!strict.is_capturable(url, 200, "application/json"));
        assert!(permissive.is_capturable(url, 200, "application/json"));
        assert!(strict.is_capturable("https://x.com/GraphQL", 200, "application/json"));
    }

    #[test]
    fn test_endpoint_indicators() {
        assert!(looks_like_endpoint("https://umpscorecards.com/api/umpires"));
        assert!(looks_like_endpoint("https://x.com/feed.JSON"));
        assert!(!looks_like_endpoint("https://x.com/static/app.css"));
    }
}
