//! Renderer abstraction for browser-driven page visits.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). A context
//! records the network traffic of its page so JSON responses can be drained
//! after the page has settled.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use umpscore::CapturedResponse;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken until the network went idle (or the idle wait gave up).
    pub load_time_ms: u64,
    /// Whether the network actually went idle before the idle timeout.
    pub reached_idle: bool,
}

/// A request the page issued, JSON or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    pub method: String,
    pub resource_type: Option<String>,
    pub headers: serde_json::Value,
    pub observed_at: DateTime<Utc>,
}

/// Which elements to click after a page settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionPlan {
    /// CSS selectors; every match is a click candidate.
    pub selectors: Vec<String>,
    /// When non-empty, a candidate is clicked only if its text contains one of these.
    pub text_filter: Vec<String>,
    /// Maximum clicks per selector.
    pub per_selector_limit: usize,
}

impl InteractionPlan {
    /// "Load more" style buttons, used when harvesting a target.
    pub fn load_more() -> Self {
        Self {
            selectors: vec![
                "button".into(),
                ".load-more".into(),
                ".show-more".into(),
            ],
            text_filter: vec!["Load".into(), "More".into(), "Show".into()],
            per_selector_limit: 5,
        }
    }

    /// Broad poking around, used by endpoint discovery.
    pub fn exploratory() -> Self {
        Self {
            selectors: vec![
                "button".into(),
                "[role=\"button\"]".into(),
                ".load-more".into(),
                ".show-more".into(),
                "a[href*=\"umpire\"]".into(),
                "select".into(),
                "input[type=\"date\"]".into(),
            ],
            text_filter: Vec::new(),
            per_selector_limit: 3,
        }
    }

    /// Whether an element with this visible text should be clicked.
    pub fn accepts_text(&self, text: &str) -> bool {
        self.text_filter.is_empty() || self.text_filter.iter().any(|t| text.contains(t.as_str()))
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new, isolated browser context.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (page) that records its network traffic.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL, then wait for network idle bounded by `idle_timeout_ms`.
    async fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
        idle_timeout_ms: u64,
    ) -> Result<NavigationResult>;
    /// Fixed wait for late requests.
    async fn settle(&mut self, ms: u64);
    /// Click elements according to `plan`, waiting `delay_ms` after each click.
    /// Individual click failures are skipped. Returns the number of clicks made.
    async fn interact(&mut self, plan: &InteractionPlan, delay_ms: u64) -> usize;
    /// Drain the captured JSON responses observed so far.
    async fn take_responses(&mut self) -> Vec<CapturedResponse>;
    /// Every request the page issued so far.
    async fn observed_requests(&self) -> Vec<ObservedRequest>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// Every scrape attempted through it fails at context creation, which lets
/// the CLI still serve roster listing and offline commands.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
