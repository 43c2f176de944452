//! Tabular assembly and delimited-file output.
//!
//! Columns are the union of all row keys in first-seen order, so column order
//! is stable for one input sequence but may differ between runs.

use crate::types::{FlatRow, HarvestResult};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A set of rows with a shared column list.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl Table {
    /// Build a table; columns are collected in first-seen order across rows.
    pub fn from_rows(rows: Vec<FlatRow>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text at `row` × `column`; empty when the row lacks the column.
    pub fn cell(&self, row: usize, column: &str) -> Option<String> {
        self.rows.get(row).map(|r| r.to_cell(column))
    }
}

/// Writes a [`Table`] as delimited text with a header row.
#[derive(Debug, Clone, Copy)]
pub struct TableWriter {
    delimiter: u8,
}

impl Default for TableWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl TableWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Write header + rows to any writer.
    pub fn write<W: Write>(&self, table: &Table, out: W) -> HarvestResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(out);
        wtr.write_record(table.columns())?;
        for row in table.rows() {
            wtr.write_record(table.columns().iter().map(|c| row.to_cell(c)))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write to `path`, replacing any existing file.
    pub fn write_to_path(&self, table: &Table, path: &Path) -> HarvestResult<()> {
        let file = std::fs::File::create(path)?;
        self.write(table, std::io::BufWriter::new(file))
    }
}

/// Result of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Input was empty; no file was written.
    NothingToSave,
    Saved {
        path: PathBuf,
        rows: usize,
        columns: usize,
    },
}

/// Timestamped default output name, e.g. `umpire_scorecards_20250901_120000.csv`.
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("umpire_scorecards_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Per-entity output name, e.g. `adam_beck_scorecard_data.csv`.
pub fn file_name_for(stem: &str, suffix: &str) -> String {
    format!("{}_{suffix}.csv", stem.to_lowercase().replace(' ', "_"))
}

/// Assemble `rows` into a table and write it under `dir`.
///
/// `dir` is created if absent. A missing `file_name` gets a timestamped
/// default. Empty input writes nothing and reports [`SaveOutcome::NothingToSave`].
pub fn save_rows(
    rows: Vec<FlatRow>,
    dir: &Path,
    file_name: Option<&str>,
    delimiter: u8,
) -> HarvestResult<SaveOutcome> {
    if rows.is_empty() {
        tracing::info!("No data to save");
        return Ok(SaveOutcome::NothingToSave);
    }

    let table = Table::from_rows(rows);
    std::fs::create_dir_all(dir)?;
    let name = file_name
        .map(str::to_string)
        .unwrap_or_else(|| default_file_name(Local::now()));
    let path = dir.join(name);

    TableWriter::new(delimiter).write_to_path(&table, &path)?;

    tracing::info!("Data saved to {}", path.display());
    tracing::info!(
        "Saved {} rows with {} columns",
        table.row_count(),
        table.column_count()
    );

    Ok(SaveOutcome::Saved {
        path,
        rows: table.row_count(),
        columns: table.column_count(),
    })
}
