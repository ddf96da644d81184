use std::fmt;

/// Recoverable anomalies and policy drops observed during preprocessing.
///
/// These never abort a run. They are collected instead of printed inline so
/// callers (and tests) can inspect both the counts and the identities of the
/// affected rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A segment in the flow table has no unit factor; its row was left
    /// unscaled.
    UnmappedUnitFactor { feature_id: u32 },
    /// A parsed file's segment is not part of the routing network; its row
    /// was dropped from the merge.
    UnknownSegment { feature_id: u32 },
    /// A gage code failed the numeric USGS convention and was excluded.
    NonNumericGage { segment_id: u32, code: String },
    /// Two parsed files resolved to the same segment; the later one (in
    /// feature-id-sorted order) won.
    DuplicateFeature { feature_id: u32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmappedUnitFactor { feature_id } => {
                write!(f, "WARN no unit factor for segment {feature_id}, row left unscaled")
            }
            Diagnostic::UnknownSegment { feature_id } => {
                write!(f, "DROP segment {feature_id} is outside the routing network")
            }
            Diagnostic::NonNumericGage { segment_id, code } => {
                write!(f, "DROP gage '{code}' on segment {segment_id} is not a numeric code")
            }
            Diagnostic::DuplicateFeature { feature_id } => {
                write!(f, "WARN multiple files map to segment {feature_id}, keeping the last")
            }
        }
    }
}

/// Accumulator threaded through the ingestion and gage-mapping passes.
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn record(&mut self, event: Diagnostic) {
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn unmapped_unit_factors(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::UnmappedUnitFactor { .. }))
    }

    pub fn unknown_segments(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::UnknownSegment { .. }))
    }

    pub fn non_numeric_gages(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::NonNumericGage { .. }))
    }

    pub fn duplicate_features(&self) -> usize {
        self.count(|e| matches!(e, Diagnostic::DuplicateFeature { .. }))
    }

    fn count(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let mut diags = Diagnostics::new();
        diags.record(Diagnostic::UnmappedUnitFactor { feature_id: 7 });
        diags.record(Diagnostic::UnknownSegment { feature_id: 4 });
        diags.record(Diagnostic::UnknownSegment { feature_id: 9 });
        diags.record(Diagnostic::NonNumericGage {
            segment_id: 7,
            code: "BADCODE".to_string(),
        });

        assert_eq!(diags.len(), 4);
        assert_eq!(diags.unmapped_unit_factors(), 1);
        assert_eq!(diags.unknown_segments(), 2);
        assert_eq!(diags.non_numeric_gages(), 1);
        assert_eq!(diags.duplicate_features(), 0);
    }

    #[test]
    fn identities_are_preserved() {
        let mut diags = Diagnostics::new();
        diags.record(Diagnostic::UnknownSegment { feature_id: 4 });

        let dropped: Vec<_> = diags
            .iter()
            .filter_map(|e| match e {
                Diagnostic::UnknownSegment { feature_id } => Some(*feature_id),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, vec![4]);
    }
}
