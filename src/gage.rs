use crate::attributes::{numeric_id_strict, FlowpathRow};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::PrepResult;
use std::collections::{HashMap, HashSet};

/// One observation gage tied to one routing segment. A segment carrying
/// several gage codes produces several assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GageAssignment {
    pub segment_id: u32,
    pub gage_code: String,
    pub lake_id: Option<u32>,
}

/// Derive the segment -> gage mapping straight from the attribute table.
///
/// Rows with no gage are skipped, duplicate `(id, gage)` pairs collapse to
/// their first occurrence, multi-gage strings explode into one assignment
/// per code, and codes that are not purely numeric are excluded with a
/// diagnostic. Lake membership comes from the waterbody-connection map.
/// No downstream-topology filtering is applied; the association in the
/// attribute table is taken as already correct.
pub fn map_gages(
    flowpaths: &[FlowpathRow],
    waterbody_connections: &HashMap<u32, u32>,
    diagnostics: &mut Diagnostics,
) -> PrepResult<Vec<GageAssignment>> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut assignments = Vec::new();

    for row in flowpaths {
        let Some(gage) = row.gage.as_deref() else {
            continue;
        };
        let gage = gage.trim();
        if gage.is_empty() {
            continue;
        }
        if !seen.insert((row.id.as_str(), gage)) {
            continue;
        }

        let segment_id = numeric_id_strict(&row.id)?;
        let lake_id = waterbody_connections.get(&segment_id).copied();

        for code in gage.split_whitespace() {
            if !code.bytes().all(|b| b.is_ascii_digit()) {
                diagnostics.record(Diagnostic::NonNumericGage {
                    segment_id,
                    code: code.to_string(),
                });
                continue;
            }
            assignments.push(GageAssignment {
                segment_id,
                gage_code: code.to_string(),
                lake_id,
            });
        }
    }

    Ok(assignments)
}

/// Collapse assignments into the segment -> codes shape consumed by the
/// data-assimilation setup. One-to-many is retained.
pub fn codes_by_segment(assignments: &[GageAssignment]) -> HashMap<u32, Vec<String>> {
    let mut by_segment: HashMap<u32, Vec<String>> = HashMap::new();
    for assignment in assignments {
        by_segment
            .entry(assignment.segment_id)
            .or_default()
            .push(assignment.gage_code.clone());
    }
    by_segment
}
