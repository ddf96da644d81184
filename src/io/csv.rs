use crate::error::{PrepError, PrepResult};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const TIME_COLUMN: &str = "Time";
pub const FLOW_COLUMN: &str = "Q_OUT";

/// Wall-clock format used inside catchment output files.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact key format used for merged-table timestamp columns. Lexicographic
/// order equals chronological order.
pub const TIMESTAMP_KEY_FORMAT: &str = "%Y%m%d%H%M";

/// Lateral flow series parsed from one per-catchment output file.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchmentTimeSeries {
    pub feature_id: u32,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl CatchmentTimeSeries {
    pub fn timestamp_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.timestamps
            .iter()
            .map(|t| t.format(TIMESTAMP_KEY_FORMAT).to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Segment id from a forcing filename: strip the `cat-` prefix and take
/// everything up to the first `_` or `.`.
///
/// `cat-1091162_synthetic.forcing.csv` -> `1091162`
pub fn feature_id_from_filename(path: &Path) -> PrepResult<u32> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let id_part = name
        .strip_prefix("cat-")
        .and_then(|rest| rest.split(['_', '.']).next())
        .unwrap_or_default();
    id_part
        .parse::<u32>()
        .map_err(|_| PrepError::FilenameFormat { name })
}

/// Parse one catchment output file into a time-indexed series. `Time` and
/// `Q_OUT` are located by header; timestamp monotonicity is not checked.
pub fn parse_catchment_file(path: &Path) -> PrepResult<CatchmentTimeSeries> {
    let feature_id = feature_id_from_filename(path)?;
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

    let headers = rdr.headers()?.clone();
    let column = |wanted: &str| {
        headers
            .iter()
            .position(|h| h == wanted)
            .ok_or_else(|| PrepError::Schema {
                table: name.clone(),
                column: wanted.to_string(),
            })
    };
    let time_idx = column(TIME_COLUMN)?;
    let flow_idx = column(FLOW_COLUMN)?;

    let mut timestamps = Vec::new();
    let mut values = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = row + 2; // header is line 1

        let raw_time = record.get(time_idx).unwrap_or_default();
        let timestamp =
            NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT).map_err(|e| {
                PrepError::BadRecord {
                    file: name.clone(),
                    line,
                    message: format!("bad {TIME_COLUMN} '{raw_time}': {e}"),
                }
            })?;

        let raw_flow = record.get(flow_idx).unwrap_or_default();
        let value = raw_flow.parse::<f64>().map_err(|e| PrepError::BadRecord {
            file: name.clone(),
            line,
            message: format!("bad {FLOW_COLUMN} '{raw_flow}': {e}"),
        })?;

        timestamps.push(timestamp);
        values.push(value);
    }

    Ok(CatchmentTimeSeries {
        feature_id,
        timestamps,
        values,
    })
}
