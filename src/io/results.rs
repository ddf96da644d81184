use crate::error::PrepResult;
use crate::gage::GageAssignment;
use crate::ingest::LateralFlowTable;
use csv::WriterBuilder;
use std::path::Path;

/// Write the scaled lateral flows in long form for the routing engine.
/// Missing cells are skipped rather than written as empty fields.
pub fn write_lateral_flows(path: &Path, table: &LateralFlowTable) -> PrepResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    wtr.write_record(["feature_id", "timestamp", "qlat"])?;

    for (feature_id, row) in &table.rows {
        for (key, cell) in table.timestamps.iter().zip(row) {
            if let Some(q) = cell {
                wtr.write_record([feature_id.to_string(), key.clone(), q.to_string()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Write the gage assignment set for the data-assimilation setup.
pub fn write_gage_assignments(path: &Path, assignments: &[GageAssignment]) -> PrepResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    wtr.write_record(["segment_id", "gage", "lake_id"])?;

    for assignment in assignments {
        let lake = assignment
            .lake_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        wtr.write_record([
            assignment.segment_id.to_string(),
            assignment.gage_code.clone(),
            lake,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
