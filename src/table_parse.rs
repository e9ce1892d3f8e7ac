use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::model::Sample;

pub const COL_ROUND: usize = 0;
pub const COL_GAME: usize = 1;
pub const COL_WEIGHT: usize = 19;
pub const COL_P: usize = 20;
pub const COL_P_HOME: usize = 21;
pub const COL_P_AWAY: usize = 22;
pub const COL_P_DRAW: usize = 23;

/// Minimum columns a row needs to carry every consumed field.
pub const MIN_COLUMNS: usize = COL_P_DRAW + 1;

#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub header: Vec<String>,
    pub samples: Vec<Sample>,
    /// Rows after the header that were rejected (short, non-numeric, blank).
    pub dropped: usize,
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

pub fn load_table(path: &Path, delimiter: char) -> Result<ParsedTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading table {}", path.display()))?;
    let table = parse_table(&raw, delimiter);
    info!(
        path = %path.display(),
        samples = table.samples.len(),
        dropped = table.dropped,
        "loaded source table"
    );
    Ok(table)
}

/// Parse the whole table. The first line is a header and is discarded
/// without validation; bad rows are counted and skipped.
pub fn parse_table(raw: &str, delimiter: char) -> ParsedTable {
    let mut lines = raw.lines();
    let header: Vec<String> = lines
        .next()
        .map(|line| split_row(line, delimiter).map(str::to_string).collect())
        .unwrap_or_default();
    let required = header.len().max(MIN_COLUMNS);

    let mut samples = Vec::new();
    let mut dropped = 0usize;
    for (idx, line) in lines.enumerate() {
        match parse_row(line, delimiter, required) {
            Some(sample) => samples.push(sample),
            None => {
                // +2: one for the header, one for 1-based line numbers.
                debug!(line = idx + 2, "dropping malformed row");
                dropped += 1;
            }
        }
    }

    ParsedTable {
        header,
        samples,
        dropped,
    }
}

fn split_row(line: &str, delimiter: char) -> impl Iterator<Item = &str> {
    line.split(delimiter).map(str::trim)
}

fn parse_row(line: &str, delimiter: char, required: usize) -> Option<Sample> {
    if line.trim().is_empty() {
        return None;
    }
    let cells: Vec<&str> = split_row(line, delimiter).collect();
    if cells.len() < required {
        return None;
    }

    let weight = parse_float(cells[COL_WEIGHT])?;
    if weight < 0.0 {
        return None;
    }
    Some(Sample {
        round: parse_int(cells[COL_ROUND])?,
        game: parse_int(cells[COL_GAME])?,
        weight,
        p: parse_float(cells[COL_P])?,
        p_home: parse_float(cells[COL_P_HOME])?,
        p_away: parse_float(cells[COL_P_AWAY])?,
        p_draw: parse_float(cells[COL_P_DRAW])?,
    })
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw == "-" {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
