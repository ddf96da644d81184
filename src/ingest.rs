use crate::attributes::FlowpathAttributeIndex;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{PrepError, PrepResult};
use crate::io::csv::{parse_catchment_file, CatchmentTimeSeries};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Merged per-segment lateral flows. Columns are the sorted union of the
/// per-file timestamp keys; a cell is `None` where a segment's file had no
/// record for that timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LateralFlowTable {
    pub timestamps: Vec<String>,
    pub rows: BTreeMap<u32, Vec<Option<f64>>>,
}

impl LateralFlowTable {
    /// Stack per-file series into one table. Callers sort the series by
    /// feature id first so the result is independent of parse order; a
    /// repeated feature id keeps the last series and records a diagnostic.
    pub fn from_series(
        series: &[CatchmentTimeSeries],
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut keys = BTreeSet::new();
        for s in series {
            keys.extend(s.timestamp_keys());
        }
        let timestamps: Vec<String> = keys.into_iter().collect();
        let positions: HashMap<&str, usize> = timestamps
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();

        let mut rows: BTreeMap<u32, Vec<Option<f64>>> = BTreeMap::new();
        for s in series {
            let mut row = vec![None; timestamps.len()];
            for (key, value) in s.timestamp_keys().zip(&s.values) {
                row[positions[key.as_str()]] = Some(*value);
            }
            if rows.insert(s.feature_id, row).is_some() {
                diagnostics.record(Diagnostic::DuplicateFeature {
                    feature_id: s.feature_id,
                });
            }
        }

        LateralFlowTable { timestamps, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_timestamps(&self) -> usize {
        self.timestamps.len()
    }

    pub fn get(&self, feature_id: u32, timestamp_key: &str) -> Option<f64> {
        let column = self.timestamps.iter().position(|k| k == timestamp_key)?;
        self.rows.get(&feature_id)?.get(column).copied().flatten()
    }
}

/// Parse every discovered file and merge the results into one table.
///
/// Parsing is embarrassingly parallel and runs on a bounded pool; the
/// collect is the barrier, and the first failed file aborts the whole batch
/// with no partial table. Rows outside `known_segments` are dropped with an
/// `UnknownSegment` diagnostic.
pub fn merge_catchment_files(
    dir: &Path,
    files: &[String],
    known_segments: &HashSet<u32>,
    max_threads: usize,
    progress: Option<&ProgressBar>,
    diagnostics: &mut Diagnostics,
) -> PrepResult<LateralFlowTable> {
    let workers = num_cpus::get().min(max_threads.max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| PrepError::Pool(e.to_string()))?;

    let mut series = pool.install(|| {
        files
            .par_iter()
            .map(|name| {
                let parsed = parse_catchment_file(&dir.join(name));
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                parsed
            })
            .collect::<PrepResult<Vec<_>>>()
    })?;

    // Deterministic regardless of task completion order
    series.sort_by_key(|s| s.feature_id);
    series.retain(|s| {
        if known_segments.contains(&s.feature_id) {
            true
        } else {
            diagnostics.record(Diagnostic::UnknownSegment {
                feature_id: s.feature_id,
            });
            false
        }
    });

    Ok(LateralFlowTable::from_series(&series, diagnostics))
}

/// Rescale each row by its unit factor, returning a new table. Rows with no
/// factor are carried through unscaled with a diagnostic; this is the one
/// non-fatal anomaly in the pipeline. Not idempotent: scale exactly once.
pub fn scale_lateral_flows(
    table: &LateralFlowTable,
    index: &FlowpathAttributeIndex,
    diagnostics: &mut Diagnostics,
) -> LateralFlowTable {
    let mut rows = BTreeMap::new();
    for (&feature_id, row) in &table.rows {
        match index.unit_factor(feature_id) {
            Some(factor) => {
                rows.insert(
                    feature_id,
                    row.iter().map(|cell| cell.map(|q| q * factor)).collect(),
                );
            }
            None => {
                diagnostics.record(Diagnostic::UnmappedUnitFactor { feature_id });
                rows.insert(feature_id, row.clone());
            }
        }
    }

    LateralFlowTable {
        timestamps: table.timestamps.clone(),
        rows,
    }
}
