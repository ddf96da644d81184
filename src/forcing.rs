use crate::error::{PrepError, PrepResult};
use crate::io::csv::{TIME_COLUMN, TIME_FORMAT};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use glob::glob;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One simulation loop's forcing inputs: the discovered file set in its
/// canonical order, the requested step count, and the terminal timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RunWindow {
    /// Basenames, lexicographically sorted. This order is the canonical
    /// file order used downstream.
    pub file_list: Vec<String>,
    pub step_count: usize,
    pub final_timestamp: NaiveDateTime,
}

/// Discover the forcing file set for one run.
///
/// The terminal timestamp is read from the last row of the first file in
/// sorted order: the files are co-temporal per-flowpath series of a single
/// run, so one file's extent stands in for the whole set.
pub fn build_run_window(folder: &Path, pattern: &str, step_count: usize) -> PrepResult<RunWindow> {
    let full_pattern = folder.join(pattern).to_string_lossy().into_owned();

    let mut file_list = Vec::new();
    let entries = glob(&full_pattern).map_err(|e| PrepError::Pattern {
        pattern: full_pattern.clone(),
        message: e.to_string(),
    })?;
    for entry in entries {
        let path = entry.map_err(|e| PrepError::Io(e.into_error()))?;
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            file_list.push(name.to_string());
        }
    }
    file_list.sort();

    if file_list.is_empty() {
        return Err(PrepError::EmptyInput {
            pattern: full_pattern,
        });
    }

    let final_timestamp = read_final_timestamp(&folder.join(&file_list[0]))?;

    Ok(RunWindow {
        file_list,
        step_count,
        final_timestamp,
    })
}

/// Last `Time` value of a forcing file.
fn read_final_timestamp(path: &Path) -> PrepResult<NaiveDateTime> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let time_idx = rdr
        .headers()?
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| PrepError::Schema {
            table: name.clone(),
            column: TIME_COLUMN.to_string(),
        })?;

    let mut last = None;
    let mut line = 1;
    for result in rdr.records() {
        let record = result?;
        line += 1;
        last = Some((record.get(time_idx).unwrap_or_default().to_string(), line));
    }

    let (raw, line) = last.ok_or_else(|| PrepError::EmptyInput {
        pattern: name.clone(),
    })?;
    NaiveDateTime::parse_from_str(&raw, TIME_FORMAT).map_err(|e| PrepError::BadRecord {
        file: name,
        line,
        message: format!("bad {TIME_COLUMN} '{raw}': {e}"),
    })
}
