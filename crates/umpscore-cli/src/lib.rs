//! umpscore-cli: headless-browser harvesting of umpire scorecards.
//!
//! Drives Chromium over the scorecard pages, drains the JSON the pages fetch,
//! and hands it to the `umpscore` pipeline for filtering, flattening and CSV
//! output. Also hosts endpoint discovery and the interactive REPL.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod fallback;
pub mod http_client;
pub mod progress;
pub mod renderer;
pub mod scrape;

pub use config::ScrapeConfig;
pub use renderer::{NoopRenderer, RenderContext, Renderer};
pub use scrape::{Scraper, TargetOutcome};
