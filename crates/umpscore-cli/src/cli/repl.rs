//! Interactive REPL for umpscore.
//!
//! Launch with `umpscore` (no subcommand) or `umpscore repl`.
//! Type `/help` for available commands, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use crate::cli::output::Output;
use crate::cli::scrape_cmd::{execute, output_name, targets_from_names};
use crate::cli::{discover_cmd, umpires_cmd};
use crate::config::{home_dir, ScrapeConfig};
use umpscore::roster::KNOWN_UMPIRES;
use umpscore::{DateRange, Target};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/scrape", "Scrape one umpire: /scrape Adam Beck"),
    ("/bulk", "Scrape several umpires: /bulk Adam Beck, Pat Hoberg"),
    ("/game", "Scrape one game: /game 715723"),
    ("/umpires", "List or search known umpires"),
    ("/filter", "Set the date range: /filter 2024-01-01 2024-12-31"),
    ("/discover", "Find data endpoints on the site"),
    ("/config", "Show the active configuration"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct ScoreHelper;

impl Completer for ScoreHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<12} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, _) = input.split_once(' ').unwrap_or((input, ""));
        if cmd == "/scrape" || cmd == "/bulk" || cmd == "/umpires" {
            let start = name_start(input, cmd == "/bulk");
            let partial = input[start..].to_lowercase();
            let matches: Vec<Pair> = KNOWN_UMPIRES
                .iter()
                .filter(|name| name.to_lowercase().starts_with(&partial))
                .map(|name| Pair {
                    display: name.to_string(),
                    replacement: name.to_string(),
                })
                .collect();
            return Ok((start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

/// Byte offset where the name being typed begins.
fn name_start(input: &str, comma_separated: bool) -> usize {
    let after_cmd = input.find(' ').map_or(input.len(), |i| i + 1);
    let mut start = after_cmd;
    if comma_separated {
        if let Some(comma) = input[after_cmd..].rfind(',') {
            start = after_cmd + comma + 1;
        }
    }
    start + input[start..].len() - input[start..].trim_start().len()
}

impl Hinter for ScoreHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for ScoreHelper {}
impl Validator for ScoreHelper {}
impl Helper for ScoreHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Session state.
struct ReplState {
    config: ScrapeConfig,
    range: DateRange,
    output: Output,
}

/// Run the interactive REPL.
///
/// Needs the multi-threaded runtime: line editing blocks in place.
pub async fn run(config: ScrapeConfig, output: Output) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mumpscore v{}\x1b[0m \x1b[90mumpire scorecard harvester\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ScoreHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(ScoreHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let hist_path = home_dir().join("history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState {
        config,
        range: DateRange::unbounded(),
        output,
    };
    let prompt = " \x1b[36mumpscore>\x1b[0m ";

    loop {
        match tokio::task::block_in_place(|| rl.readline(prompt)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "scrape" => cmd_scrape(args, &state).await,
                    "bulk" => cmd_bulk(args, &state).await,
                    "game" => cmd_game(args, &state).await,
                    "umpires" => {
                        let pattern = (!args.is_empty()).then_some(args);
                        if let Err(e) = umpires_cmd::run(state.output, pattern) {
                            eprintln!("  Error: {e:#}");
                        }
                    }
                    "filter" => cmd_filter(args, &mut state),
                    "discover" => {
                        let urls = args.split_whitespace().map(str::to_string).collect();
                        let result =
                            discover_cmd::run(state.config.clone(), state.output, urls, 0, None)
                                .await;
                        if let Err(e) = result {
                            eprintln!("  Error: {e:#}");
                        }
                    }
                    "config" => cmd_config(&state),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<12} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and known umpire names.");
    eprintln!();
}

async fn scrape_targets(targets: Vec<Target>, state: &ReplState) {
    let file_name = output_name(&targets, &state.range, None);
    if let Err(e) = execute(&state.config, state.output, &targets, state.range, file_name).await {
        eprintln!("  Error: {e:#}");
    }
}

async fn cmd_scrape(args: &str, state: &ReplState) {
    match Target::umpire(args) {
        Ok(target) => scrape_targets(vec![target], state).await,
        Err(_) => eprintln!("  Usage: /scrape <umpire name>"),
    }
}

async fn cmd_bulk(args: &str, state: &ReplState) {
    let targets = targets_from_names(&[args.to_string()]);
    if targets.is_empty() {
        eprintln!("  Usage: /bulk <name>, <name>, ...");
        return;
    }
    scrape_targets(targets, state).await;
}

async fn cmd_game(args: &str, state: &ReplState) {
    match Target::game(args) {
        Ok(target) => scrape_targets(vec![target], state).await,
        Err(_) => eprintln!("  Usage: /game <game id>"),
    }
}

fn cmd_filter(args: &str, state: &mut ReplState) {
    if args.is_empty() {
        eprintln!("  Date range: {}", state.range);
        return;
    }
    if args == "clear" {
        state.range = DateRange::unbounded();
        eprintln!("  Date range cleared.");
        return;
    }

    let mut parts = args.split_whitespace();
    let start = parts.next().filter(|s| *s != "-");
    let end = parts.next().filter(|s| *s != "-");
    match DateRange::parse(start, end) {
        Ok(range) => {
            state.range = range;
            eprintln!("  Date range: {range}");
        }
        Err(e) => {
            tracing::error!("{e}; date filtering disabled");
            state.range = DateRange::unbounded();
            eprintln!("  {e}. Date filtering is off.");
            eprintln!("  Usage: /filter <start|-> [end], dates as YYYY-MM-DD");
        }
    }
}

fn cmd_config(state: &ReplState) {
    match serde_json::to_string_pretty(&state.config) {
        Ok(text) => {
            eprintln!();
            for line in text.lines() {
                eprintln!("  {line}");
            }
            eprintln!("  date range: {}", state.range);
            eprintln!();
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_start() {
        assert_eq!(name_start("/scrape Ad", false), 8);
        assert_eq!(name_start("/bulk Adam Beck, Pa", true), 17);
        assert_eq!(name_start("/bulk Adam Beck,Pa", true), 16);
    }

    #[test]
    fn test_filter_command() {
        let mut state = ReplState {
            config: ScrapeConfig::default(),
            range: DateRange::unbounded(),
            output: Output::default(),
        };
        cmd_filter("2024-01-01 2024-06-30", &mut state);
        assert_eq!(
            state.range,
            DateRange::parse(Some("2024-01-01"), Some("2024-06-30")).unwrap()
        );

        cmd_filter("- 2024-06-30", &mut state);
        assert_eq!(state.range, DateRange::parse(None, Some("2024-06-30")).unwrap());

        cmd_filter("garbage", &mut state);
        assert!(state.range.is_unbounded());

        cmd_filter("2024-01-01", &mut state);
        assert!(!state.range.is_unbounded());
        cmd_filter("clear", &mut state);
        assert!(state.range.is_unbounded());
    }
}
