//! `umpscore discover [URLS...]`: find the data endpoints a site calls.

use crate::cli::output::{print_json, Output};
use crate::config::ScrapeConfig;
use crate::discovery::{default_urls, discover, probe};
use crate::http_client::HttpClient;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::Result;
use std::path::PathBuf;

pub async fn run(
    mut config: ScrapeConfig,
    output: Output,
    urls: Vec<String>,
    probe_limit: usize,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(dir) = out_dir {
        config.output_dir = dir;
    }
    let urls = if urls.is_empty() {
        default_urls(&config.base_url)?
    } else {
        urls
    };
    output.line(format!("  Checking {} URLs for API endpoints", urls.len()));

    let renderer = ChromiumRenderer::launch(&config).await?;
    let report = discover(&renderer, &urls, &config).await;
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e}");
    }
    let report = report?;
    let path = report.save(&config.output_dir, None)?;

    let probes = if probe_limit > 0 && !report.endpoints.is_empty() {
        let client = HttpClient::new(config.timing.nav_timeout_ms, &config.user_agent)?;
        probe(&client, &report.endpoints, probe_limit).await
    } else {
        Vec::new()
    };

    if output.is_json() {
        print_json(&serde_json::json!({
            "file": path,
            "endpoints": report.endpoints,
            "responses": report.responses.len(),
            "patterns": report.patterns,
            "probes": probes,
        }));
        return Ok(());
    }

    report.print_summary();
    if !probes.is_empty() {
        println!("  Direct probes:");
        for result in &probes {
            match (&result.items, &result.error) {
                (Some(n), _) => println!("    {n:>5} items  {}", result.url),
                (None, Some(e)) => println!("    failed       {}: {e}", result.url),
                (None, None) => println!("    ?            {}", result.url),
            }
        }
        println!();
    }
    println!("  Full results saved to: {}", path.display());
    Ok(())
}
