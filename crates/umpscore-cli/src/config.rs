//! Configuration loading and resolution.
//!
//! A [`ScrapeConfig`] is built once per invocation and passed to every
//! component. Resolution order for the file: explicit path, `UMPSCORE_CONFIG`,
//! `./umpscore.json`, then built-in defaults. Command-line flags are applied
//! on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use umpscore::{UrlPolicy, DEFAULT_SEPARATOR};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "UMPSCORE_CONFIG";

/// Config file picked up from the working directory.
pub const CWD_CONFIG: &str = "umpscore.json";

pub const DEFAULT_BASE_URL: &str = "https://umpscorecards.com";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Fixed waits around a page visit, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Upper bound for navigation.
    pub nav_timeout_ms: u64,
    /// Upper bound for the network-idle wait after navigation.
    pub idle_timeout_ms: u64,
    /// Unconditional wait after the page settles.
    pub settle_ms: u64,
    /// Wait after each exploratory click.
    pub interaction_delay_ms: u64,
    /// Wait between consecutive targets.
    pub inter_target_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 60_000,
            idle_timeout_ms: 10_000,
            settle_ms: 5_000,
            interaction_delay_ms: 2_000,
            inter_target_delay_ms: 3_000,
        }
    }
}

/// Everything a scrape invocation needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    /// Field delimiter for output files, e.g. `,` or `\t`.
    pub delimiter: char,
    /// Path separator used when flattening nested keys.
    pub separator: String,
    pub url_policy: UrlPolicy,
    /// Click "load more" style elements after the page settles.
    pub interact: bool,
    pub user_agent: String,
    pub chromium_path: Option<PathBuf>,
    pub timing: Timing,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            delimiter: ',',
            separator: DEFAULT_SEPARATOR.to_string(),
            url_policy: UrlPolicy::Permissive,
            interact: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chromium_path: None,
            timing: Timing::default(),
        }
    }
}

impl ScrapeConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the first config source that exists, or defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// The delimiter as a single byte, as the CSV writer wants it.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("delimiter must be ASCII, got {:?}", self.delimiter))
    }

    fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        if self.separator.is_empty() {
            anyhow::bail!("separator must not be empty");
        }
        url_check(&self.base_url)
    }
}

fn url_check(base_url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(base_url)
        .with_context(|| format!("base_url is not a valid URL: {base_url}"))?;
    if parsed.cannot_be_a_base() {
        anyhow::bail!("base_url cannot be used as a base: {base_url}");
    }
    Ok(())
}

/// Resolve which config file to read, if any.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd_config = PathBuf::from(CWD_CONFIG);
    cwd_config.exists().then_some(cwd_config)
}

/// Directory for REPL history and a downloaded Chromium: `~/.umpscore`.
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".umpscore")
}
