//! umpscore: umpire scorecard harvester, entry point.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use umpscore_cli::cli::output::{print_json, Output};
use umpscore_cli::cli::scrape_cmd::ScrapeArgs;
use umpscore_cli::cli::{discover_cmd, doctor, repl, scrape_cmd, umpires_cmd};
use umpscore_cli::config::ScrapeConfig;

#[derive(Parser)]
#[command(
    name = "umpscore",
    about = "umpscore: harvest umpire scorecards into flat CSV files",
    version,
    after_help = "Run 'umpscore <command> --help' for details on each command.\nRun 'umpscore' with no command to enter interactive mode."
)]
struct Cli {
    /// Path to a JSON config file (else UMPSCORE_CONFIG, then ./umpscore.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output results as JSON (machine-readable).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
struct ScrapeFlags {
    /// Keep records dated on or after this day (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// Keep records dated on or before this day (YYYY-MM-DD).
    #[arg(long)]
    end: Option<String>,

    /// Output file name inside the output directory.
    #[arg(long, short)]
    output: Option<String>,

    /// Output directory (overrides config).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Only capture JSON from URLs that look like API endpoints.
    #[arg(long)]
    strict: bool,

    /// Do not click "load more" buttons.
    #[arg(long)]
    no_interact: bool,
}

impl From<ScrapeFlags> for ScrapeArgs {
    fn from(flags: ScrapeFlags) -> Self {
        Self {
            start: flags.start,
            end: flags.end,
            output: flags.output,
            out_dir: flags.out_dir,
            strict: flags.strict,
            no_interact: flags.no_interact,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one or more umpires into a single CSV file.
    Scrape {
        /// Umpire names; each argument may also be a comma-separated list.
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        flags: ScrapeFlags,
    },

    /// Scrape a single game page.
    Game {
        /// Game id, e.g. 715723.
        game_id: String,

        #[command(flatten)]
        flags: ScrapeFlags,
    },

    /// List known umpires, optionally filtered by a name pattern.
    Umpires {
        /// Case-insensitive substring to search for.
        pattern: Option<String>,
    },

    /// Visit pages and report the data endpoints they call.
    Discover {
        /// Pages to visit (defaults to a representative set).
        urls: Vec<String>,

        /// GET up to N discovered endpoints directly.
        #[arg(long, default_value = "0")]
        probe: usize,

        /// Directory for the discovery report (overrides config).
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Check environment and diagnose issues.
    Doctor,

    /// Launch interactive REPL mode.
    Repl,

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = match log_file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?,
        ),
        None => None,
    };
    let file = file.map(std::sync::Mutex::new);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()?;
    }
    Ok(())
}

async fn dispatch(cli: Cli, output: Output) -> Result<()> {
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "umpscore", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.log_json, cli.log_file.as_deref())?;
    let config = ScrapeConfig::load(cli.config.as_deref())?;

    match cli.command {
        // No subcommand → launch interactive REPL
        None | Some(Commands::Repl) => repl::run(config, output).await,

        Some(Commands::Scrape { names, flags }) => {
            scrape_cmd::run(config, output, &names, &flags.into()).await
        }
        Some(Commands::Game { game_id, flags }) => {
            scrape_cmd::run_game(config, output, &game_id, &flags.into()).await
        }
        Some(Commands::Umpires { pattern }) => umpires_cmd::run(output, pattern.as_deref()),
        Some(Commands::Discover {
            urls,
            probe,
            out_dir,
        }) => discover_cmd::run(config, output, urls, probe, out_dir).await,
        Some(Commands::Doctor) => doctor::run(&config, output, cli.config.as_deref()).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.json);

    let result = dispatch(cli, output).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output.is_json() {
            print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
