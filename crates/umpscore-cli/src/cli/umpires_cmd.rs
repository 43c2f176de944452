//! `umpscore umpires [PATTERN]`: list or search the known umpires.

use crate::cli::output::{print_json, Output};
use anyhow::Result;
use umpscore::roster::{search, KNOWN_UMPIRES};

pub fn run(output: Output, pattern: Option<&str>) -> Result<()> {
    let names = match pattern {
        Some(p) => search(p),
        None => KNOWN_UMPIRES.to_vec(),
    };

    if output.is_json() {
        print_json(&names);
        return Ok(());
    }

    if names.is_empty() {
        println!("  No umpires match '{}'", pattern.unwrap_or_default());
        return Ok(());
    }
    println!();
    for (i, name) in names.iter().enumerate() {
        println!("  {:2}. {name}", i + 1);
    }
    println!();
    println!("  Total: {} umpires", names.len());
    Ok(())
}
