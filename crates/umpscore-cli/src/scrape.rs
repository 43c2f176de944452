//! The runner: visits targets one by one and turns their traffic into rows.

use crate::config::ScrapeConfig;
use crate::fallback::extract_tables;
use crate::progress::{emit, ProgressEventKind, ProgressSender};
use crate::renderer::{InteractionPlan, RenderContext, Renderer};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use umpscore::pipeline::normalize_records;
use umpscore::{
    collect_records, records_from_rows, DateRange, FlatRow, Normalized, Record, RunSummary, Target,
};

/// What one target produced.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: Target,
    pub page_url: String,
    /// JSON responses captured from the page.
    pub responses: usize,
    /// Whether the records came from HTML tables instead of JSON.
    pub used_fallback: bool,
    pub normalized: Normalized,
}

/// Drives a renderer over a list of targets.
pub struct Scraper {
    renderer: Arc<dyn Renderer>,
    config: ScrapeConfig,
    progress: Option<ProgressSender>,
    run_id: String,
    seq: u64,
    summary: RunSummary,
}

impl Scraper {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        config: ScrapeConfig,
        progress: Option<ProgressSender>,
    ) -> Self {
        Self {
            renderer,
            config,
            progress,
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            summary: RunSummary::default(),
        }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Counters of the current or most recent [`Scraper::scrape_all`] run.
    ///
    /// Stays accurate when the run future was dropped part way through.
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    fn emit(&mut self, event: ProgressEventKind) {
        emit(&self.progress, &self.run_id, &mut self.seq, event);
    }

    /// Visit one target and normalize what it produced.
    ///
    /// The context is closed whether or not the visit succeeds. A navigation
    /// failure is returned as an error and the target yields nothing.
    pub async fn scrape_target(
        &mut self,
        target: &Target,
        range: &DateRange,
    ) -> Result<TargetOutcome> {
        let page_url = target.page_url(&self.config.base_url)?;
        tracing::info!("Fetching data for {target}: {page_url}");

        let mut ctx = self
            .renderer
            .new_context()
            .await
            .context("failed to open browser context")?;

        let visit = self.visit(ctx.as_mut(), target, &page_url).await;
        if let Err(e) = ctx.close().await {
            tracing::warn!("failed to close context for {target}: {e}");
        }
        let (records, responses, used_fallback) = visit?;

        let normalized = normalize_records(records, range, &self.config.separator);
        tracing::info!(
            "Collected {} records for {} ({} kept)",
            normalized.records_captured,
            target.entity(),
            normalized.records_kept
        );

        Ok(TargetOutcome {
            target: target.clone(),
            page_url,
            responses,
            used_fallback,
            normalized,
        })
    }

    async fn visit(
        &mut self,
        ctx: &mut dyn RenderContext,
        target: &Target,
        page_url: &str,
    ) -> Result<(Vec<Record>, usize, bool)> {
        let timing = self.config.timing.clone();

        ctx.navigate(page_url, timing.nav_timeout_ms, timing.idle_timeout_ms)
            .await
            .with_context(|| format!("error loading page {page_url}"))?;
        ctx.settle(timing.settle_ms).await;

        if self.config.interact {
            let clicks = ctx
                .interact(&InteractionPlan::load_more(), timing.interaction_delay_ms)
                .await;
            if clicks > 0 {
                tracing::debug!("{clicks} load-more clicks on {page_url}");
            }
        }

        let responses = ctx.take_responses().await;
        for response in &responses {
            self.emit(ProgressEventKind::ResponseCaptured {
                url: response.url().to_string(),
            });
        }

        let records = collect_records(&responses, target);
        if !records.is_empty() {
            return Ok((records, responses.len(), false));
        }

        tracing::info!("No JSON data found for {target}, reading HTML tables");
        let html = match ctx.get_html().await {
            Ok(html) => html,
            Err(e) => {
                let message = format!("could not read page HTML for {target}: {e:#}");
                tracing::warn!("{message}");
                self.emit(ProgressEventKind::Warning { message });
                return Ok((Vec::new(), responses.len(), false));
            }
        };
        let rows = extract_tables(&html);
        if rows.is_empty() {
            return Ok((Vec::new(), responses.len(), false));
        }

        self.emit(ProgressEventKind::FallbackUsed {
            entity: target.entity(),
            rows: rows.len(),
        });
        let records = records_from_rows(rows, target, page_url, Utc::now());
        Ok((records, responses.len(), true))
    }

    /// Visit every target in order, appending rows of completed targets to `rows`.
    ///
    /// A failed target is logged and skipped. Rows are appended only once a
    /// target completes, so dropping this future mid-run leaves `rows`
    /// holding exactly the completed targets.
    pub async fn scrape_all(
        &mut self,
        targets: &[Target],
        range: &DateRange,
        rows: &mut Vec<FlatRow>,
    ) -> RunSummary {
        self.summary = RunSummary::default();
        let total = targets.len();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                let ms = self.config.timing.inter_target_delay_ms;
                self.emit(ProgressEventKind::Waiting { ms });
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }

            self.emit(ProgressEventKind::TargetStarted {
                index,
                total,
                entity: target.entity(),
            });

            match self.scrape_target(target, range).await {
                Ok(outcome) => {
                    self.summary.record_target(&outcome.normalized);
                    self.emit(ProgressEventKind::TargetCompleted {
                        entity: target.entity(),
                        captured: outcome.normalized.records_captured,
                        kept: outcome.normalized.records_kept,
                    });
                    rows.extend(outcome.normalized.rows);
                }
                Err(e) => {
                    tracing::error!("Error processing {target}: {e:#}");
                    self.summary.record_failure();
                    self.emit(ProgressEventKind::TargetFailed {
                        entity: target.entity(),
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        tracing::info!("Run complete: {}", self.summary);
        self.summary
    }
}
