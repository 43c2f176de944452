//! Endpoint discovery: visit pages, record every request, and summarize the
//! JSON the site sends back.

use crate::config::ScrapeConfig;
use crate::http_client::HttpClient;
use crate::renderer::{InteractionPlan, ObservedRequest, Renderer};
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use umpscore::structure::{analyze, ResponseShape};
use umpscore::{looks_like_endpoint, CapturedResponse, Target};

/// Game used as the sample single-game page.
const SAMPLE_GAME_ID: &str = "715723";

/// Everything learned from one discovery run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Request URLs that look like data endpoints, sorted.
    pub endpoints: Vec<String>,
    pub requests: Vec<ObservedRequest>,
    pub responses: Vec<CapturedResponse>,
    /// Shape of the body returned by each response URL.
    pub patterns: BTreeMap<String, ResponseShape>,
}

/// Outcome of fetching one endpoint directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub items: Option<usize>,
    pub error: Option<String>,
}

/// Pages worth visiting when no URLs are given.
pub fn default_urls(base_url: &str) -> Result<Vec<String>> {
    let base = base_url.trim_end_matches('/');
    let mut urls = vec![base.to_string(), format!("{base}/data/umpires")];
    for name in ["Angel Hernandez", "Adam Beck", "Pat Hoberg"] {
        urls.push(Target::umpire(name)?.page_url(base_url)?);
    }
    urls.push(Target::game(SAMPLE_GAME_ID)?.page_url(base_url)?);
    Ok(urls)
}

/// Visit `urls` in one context and collect what the pages asked for.
///
/// A page that fails to load is logged and skipped.
pub async fn discover(
    renderer: &dyn Renderer,
    urls: &[String],
    config: &ScrapeConfig,
) -> Result<DiscoveryReport> {
    let timing = &config.timing;
    let mut ctx = renderer
        .new_context()
        .await
        .context("failed to open browser context")?;
    let mut responses = Vec::new();

    for url in urls {
        tracing::info!("Visiting: {url}");
        if let Err(e) = ctx
            .navigate(url, timing.nav_timeout_ms, timing.idle_timeout_ms)
            .await
        {
            tracing::error!("Error visiting {url}: {e:#}");
            continue;
        }
        ctx.settle(timing.settle_ms).await;
        ctx.interact(&InteractionPlan::exploratory(), timing.interaction_delay_ms)
            .await;
        responses.extend(ctx.take_responses().await);
    }

    let requests = ctx.observed_requests().await;
    if let Err(e) = ctx.close().await {
        tracing::warn!("failed to close discovery context: {e}");
    }

    Ok(DiscoveryReport::build(requests, responses))
}

impl DiscoveryReport {
    pub fn build(requests: Vec<ObservedRequest>, responses: Vec<CapturedResponse>) -> Self {
        let endpoints: BTreeSet<String> = requests
            .iter()
            .filter(|r| looks_like_endpoint(&r.url))
            .map(|r| r.url.clone())
            .collect();
        for url in &endpoints {
            tracing::info!("API request: {url}");
        }

        let responses: Vec<CapturedResponse> = responses
            .into_iter()
            .filter(|r| looks_like_endpoint(r.url()))
            .collect();

        let mut patterns = BTreeMap::new();
        for response in &responses {
            if let Some(shape) = analyze(response.body()) {
                patterns.insert(response.url().to_string(), shape);
            }
        }

        Self {
            endpoints: endpoints.into_iter().collect(),
            requests,
            responses,
            patterns,
        }
    }

    /// Write the report as pretty JSON under `dir`.
    pub fn save(&self, dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let name = file_name.map(str::to_string).unwrap_or_else(|| {
            format!("api_discovery_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
        });
        let path = dir.join(name);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Discovery results saved to {}", path.display());
        Ok(path)
    }

    pub fn print_summary(&self) {
        println!();
        println!("  API discovery summary");
        println!("  {}", "-".repeat(40));

        println!("\n  {} endpoints:", self.endpoints.len());
        for endpoint in &self.endpoints {
            println!("    {endpoint}");
        }

        println!("\n  {} JSON responses:", self.responses.len());
        for response in self.responses.iter().take(10) {
            println!("    {} {}", response.status(), response.url());
        }
        if self.responses.len() > 10 {
            println!("    ... and {} more", self.responses.len() - 10);
        }

        println!("\n  Structure patterns:");
        for (url, shape) in &self.patterns {
            println!("\n    {url}");
            match shape {
                ResponseShape::Object { keys, .. } => {
                    println!("      object with keys: {}", keys.join(", "));
                }
                ResponseShape::Array {
                    count, item_keys, ..
                } => {
                    println!("      array of {count} items");
                    println!("      item keys: {}", item_keys.join(", "));
                }
            }
        }
        println!();
    }
}

/// GET up to `limit` endpoints directly and count the items each returns.
pub async fn probe(client: &HttpClient, endpoints: &[String], limit: usize) -> Vec<ProbeResult> {
    let mut results = Vec::new();
    for url in endpoints.iter().take(limit) {
        let result = match client.get_json(url, &[]).await {
            Ok(value) => ProbeResult {
                url: url.clone(),
                items: Some(item_count(&value)),
                error: None,
            },
            Err(e) => ProbeResult {
                url: url.clone(),
                items: None,
                error: Some(format!("{e:#}")),
            },
        };
        results.push(result);
    }
    results
}

fn item_count(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => items.len(),
        serde_json::Value::Object(fields) => fields.len(),
        serde_json::Value::Null => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn request(url: &str) -> ObservedRequest {
        ObservedRequest {
            url: url.to_string(),
            method: "GET".into(),
            resource_type: Some("Fetch".into()),
            headers: json!({}),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_report() {
        let requests = vec![
            request("https://umpscorecards.com/"),
            request("https://umpscorecards.com/api/games"),
            request("https://umpscorecards.com/api/games"),
            request("https://cdn.example.com/app.js"),
        ];
        let responses = vec![
            CapturedResponse::new(
                "https://umpscorecards.com/api/games",
                200,
                "application/json",
                json!([{"id": 1}]),
                Utc::now(),
            ),
            CapturedResponse::new(
                "https://umpscorecards.com/manifest",
                200,
                "application/json",
                json!({"name": "site"}),
                Utc::now(),
            ),
        ];

        let report = DiscoveryReport::build(requests, responses);
        assert_eq!(report.endpoints, vec!["https://umpscorecards.com/api/games"]);
        assert_eq!(report.requests.len(), 4);
        assert_eq!(report.responses.len(), 1);
        assert!(matches!(
            report.patterns["https://umpscorecards.com/api/games"],
            ResponseShape::Array { count: 1, .. }
        ));
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = DiscoveryReport::default();
        let path = report.save(dir.path(), Some("d.json")).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["endpoints"], json!([]));
    }

    #[test]
    fn test_default_urls() {
        let urls = default_urls("https://umpscorecards.com").unwrap();
        assert_eq!(urls.len(), 6);
        assert_eq!(
            urls[2],
            "https://umpscorecards.com/data/single-umpire/Angel%20Hernandez"
        );
        assert!(urls[5].ends_with("game_id=715723"));
    }

    #[test]
    fn test_item_count() {
        assert_eq!(item_count(&json!([1, 2, 3])), 3);
        assert_eq!(item_count(&json!({"a": 1})), 1);
        assert_eq!(item_count(&json!(null)), 0);
    }
}
