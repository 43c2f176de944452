//! CLI subcommand implementations for the `umpscore` binary.

pub mod discover_cmd;
pub mod doctor;
pub mod output;
pub mod repl;
pub mod scrape_cmd;
pub mod umpires_cmd;
