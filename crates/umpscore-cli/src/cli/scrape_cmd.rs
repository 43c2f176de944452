//! `umpscore scrape` and `umpscore game`: harvest targets into one CSV file.

use crate::cli::output::{print_json, Output};
use crate::config::ScrapeConfig;
use crate::progress::{self, ProgressSender};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::scrape::Scraper;
use anyhow::{bail, Result};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use umpscore::table::file_name_for;
use umpscore::{save_rows, DateRange, RunSummary, SaveOutcome, Target, UrlPolicy};

/// Flags shared by the scrape-style commands.
#[derive(Debug, Clone, Default)]
pub struct ScrapeArgs {
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<String>,
    pub out_dir: Option<PathBuf>,
    pub strict: bool,
    pub no_interact: bool,
}

impl ScrapeArgs {
    /// Layer these flags over the loaded config.
    pub fn apply(&self, config: &mut ScrapeConfig) {
        if let Some(dir) = &self.out_dir {
            config.output_dir = dir.clone();
        }
        if self.strict {
            config.url_policy = UrlPolicy::Strict;
        }
        if self.no_interact {
            config.interact = false;
        }
    }

    /// The date range from `--start`/`--end`. A bad bound is logged and
    /// leaves the run unfiltered.
    pub fn range(&self) -> DateRange {
        DateRange::parse_or_unbounded(self.start.as_deref(), self.end.as_deref())
    }
}

/// What a run produced, printed at the end of every run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub summary: RunSummary,
    pub file: Option<PathBuf>,
    pub rows: usize,
    pub columns: usize,
    pub interrupted: bool,
}

/// Expand positional names, each of which may itself be a comma-separated list.
pub fn targets_from_names(names: &[String]) -> Vec<Target> {
    names.iter().flat_map(|n| Target::parse_list(n)).collect()
}

/// Output file name when none was given: per-target for a single target,
/// timestamped otherwise.
pub fn output_name(targets: &[Target], range: &DateRange, explicit: Option<&str>) -> Option<String> {
    if let Some(name) = explicit {
        return Some(name.to_string());
    }
    match targets {
        [single] => {
            let suffix = if range.is_unbounded() {
                "scorecard_data"
            } else {
                "filtered_data"
            };
            Some(file_name_for(&single.file_stem(), suffix))
        }
        _ => None,
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run `targets` through `renderer` and save the rows.
///
/// If `interrupt` resolves first, the in-flight target is abandoned and the
/// rows of the targets completed so far are saved.
pub async fn harvest<F>(
    renderer: Arc<dyn Renderer>,
    config: &ScrapeConfig,
    targets: &[Target],
    range: DateRange,
    file_name: Option<String>,
    progress: Option<ProgressSender>,
    interrupt: F,
) -> Result<RunReport>
where
    F: Future<Output = ()>,
{
    let delimiter = config.delimiter_byte()?;
    let mut scraper = Scraper::new(renderer, config.clone(), progress);
    let mut rows = Vec::new();

    let interrupted = tokio::select! {
        _ = scraper.scrape_all(targets, &range, &mut rows) => false,
        _ = interrupt => true,
    };
    if interrupted {
        tracing::warn!(
            "Interrupted; saving {} rows from completed targets",
            rows.len()
        );
    }

    let summary = scraper.summary();
    let run_id = scraper.run_id().to_string();
    let (file, rows, columns) =
        match save_rows(rows, &config.output_dir, file_name.as_deref(), delimiter)? {
            SaveOutcome::NothingToSave => (None, 0, 0),
            SaveOutcome::Saved {
                path,
                rows,
                columns,
            } => (Some(path), rows, columns),
        };

    Ok(RunReport {
        run_id,
        summary,
        file,
        rows,
        columns,
        interrupted,
    })
}

/// Launch Chromium, harvest with progress output and Ctrl-C handling, print the report.
pub async fn execute(
    config: &ScrapeConfig,
    output: Output,
    targets: &[Target],
    range: DateRange,
    file_name: Option<String>,
) -> Result<RunReport> {
    if targets.is_empty() {
        bail!("no targets given");
    }
    output.line(format!(
        "  Scraping {} target(s) from {range}",
        targets.len()
    ));

    let renderer: Arc<dyn Renderer> = Arc::new(ChromiumRenderer::launch(config).await?);

    let (tx, rx) = progress::channel();
    let printer = (!output.is_json()).then(|| progress::spawn_printer(rx));

    let result = harvest(
        Arc::clone(&renderer),
        config,
        targets,
        range,
        file_name,
        Some(tx),
        ctrl_c(),
    )
    .await;

    if let Some(printer) = printer {
        let _ = printer.await;
    }
    if let Err(e) = renderer.shutdown().await {
        tracing::warn!("browser shutdown failed: {e}");
    }

    let report = result?;
    print_report(output, &report);
    Ok(report)
}

pub fn print_report(output: Output, report: &RunReport) {
    if output.is_json() {
        print_json(report);
        return;
    }
    println!();
    if report.interrupted {
        println!("  Interrupted. Completed targets were kept.");
    }
    println!("  {}", report.summary);
    match &report.file {
        Some(path) => {
            println!("  Data saved to: {}", path.display());
            println!("  Records: {} rows x {} columns", report.rows, report.columns);
        }
        None => println!("  No data found"),
    }
}

/// `umpscore scrape <NAMES...>`
pub async fn run(
    mut config: ScrapeConfig,
    output: Output,
    names: &[String],
    args: &ScrapeArgs,
) -> Result<()> {
    args.apply(&mut config);
    let targets = targets_from_names(names);
    if targets.is_empty() {
        bail!("no umpire names given");
    }
    let range = args.range();
    let file_name = output_name(&targets, &range, args.output.as_deref());
    execute(&config, output, &targets, range, file_name).await?;
    Ok(())
}

/// `umpscore game <GAME_ID>`
pub async fn run_game(
    mut config: ScrapeConfig,
    output: Output,
    game_id: &str,
    args: &ScrapeArgs,
) -> Result<()> {
    args.apply(&mut config);
    let targets = vec![Target::game(game_id)?];
    let range = args.range();
    let file_name = output_name(&targets, &range, args.output.as_deref());
    execute(&config, output, &targets, range, file_name).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_from_names() {
        let names = vec!["Adam Beck, Pat Hoberg".to_string(), "Laz Diaz".to_string()];
        let targets = targets_from_names(&names);
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[1], Target::umpire("Pat Hoberg").unwrap());
    }

    #[test]
    fn test_output_name() {
        let one = vec![Target::umpire("Adam Beck").unwrap()];
        let range = DateRange::unbounded();
        assert_eq!(
            output_name(&one, &range, None).as_deref(),
            Some("adam_beck_scorecard_data.csv")
        );

        let bounded = DateRange::parse(Some("2024-01-01"), None).unwrap();
        assert_eq!(
            output_name(&one, &bounded, None).as_deref(),
            Some("adam_beck_filtered_data.csv")
        );

        let two = targets_from_names(&["Adam Beck,Laz Diaz".to_string()]);
        assert_eq!(output_name(&two, &range, None), None);
        assert_eq!(
            output_name(&two, &range, Some("x.csv")).as_deref(),
            Some("x.csv")
        );
    }

    #[test]
    fn test_args_override_config() {
        let mut config = ScrapeConfig::default();
        ScrapeArgs {
            out_dir: Some(PathBuf::from("elsewhere")),
            strict: true,
            no_interact: true,
            ..Default::default()
        }
        .apply(&mut config);
        assert_eq!(config.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.url_policy, UrlPolicy::Strict);
        assert!(!config.interact);
    }

    #[test]
    fn test_bad_date_bound_runs_unfiltered() {
        let args = ScrapeArgs {
            start: Some("2024-13-45".to_string()),
            end: Some("2024-12-31".to_string()),
            ..Default::default()
        };
        let range = args.range();
        assert!(range.is_unbounded());

        let one = vec![Target::umpire("Adam Beck").unwrap()];
        assert_eq!(
            output_name(&one, &range, None).as_deref(),
            Some("adam_beck_scorecard_data.csv")
        );

        let args = ScrapeArgs {
            start: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            args.range(),
            DateRange::parse(Some("2024-01-01"), None).unwrap()
        );
    }
}
