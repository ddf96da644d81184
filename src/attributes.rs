use crate::config::ColumnConfig;
use crate::error::{PrepError, PrepResult};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

/// Hydrofabric table the attribute and waterbody loaders read from.
pub const ATTRIBUTES_TABLE: &str = "flowpath-attributes";

/// One raw row of the flowpath attribute table.
#[derive(Debug, Clone)]
pub struct FlowpathRow {
    /// Compound flowpath id, usually `wb-<number>`.
    pub id: String,
    /// Incremental catchment area in km^2; nullable in the hydrofabric.
    pub areasqkm: Option<f64>,
    /// Space-separated gage codes, absent for ungaged flowpaths.
    pub gage: Option<String>,
}

/// Numeric suffix of a compound flowpath id (`wb-123` -> `123`). Ids with no
/// separator are parsed whole.
pub fn numeric_id_lenient(id: &str) -> Option<u32> {
    let token = id.split('-').nth(1).unwrap_or(id);
    token.trim().parse::<u32>().ok()
}

/// Strict variant used for gage assignment: the separator is required, and
/// the suffix may carry a float rendering of the integer id.
pub fn numeric_id_strict(id: &str) -> PrepResult<u32> {
    let token = id.split('-').nth(1).ok_or_else(|| PrepError::IdFormat { id: id.to_string() })?;
    let value: f64 = token
        .trim()
        .parse()
        .map_err(|_| PrepError::IdFormat { id: id.to_string() })?;
    Ok(value as u32)
}

fn table_columns(conn: &Connection, table: &str) -> PrepResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{table}')"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(columns)
}

/// Check a table's declared schema once at the boundary, before any
/// transformation touches it.
pub fn validate_columns(conn: &Connection, table: &str, required: &[&str]) -> PrepResult<()> {
    let columns = table_columns(conn, table)?;
    for &column in required {
        if !columns.contains(column) {
            return Err(PrepError::Schema {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Load the flowpath attribute rows. The gage column is optional; when the
/// hydrofabric omits it every row comes back ungaged.
pub fn load_flowpath_table(conn: &Connection, config: &ColumnConfig) -> PrepResult<Vec<FlowpathRow>> {
    validate_columns(conn, ATTRIBUTES_TABLE, &[&config.key, &config.area])?;
    let has_gages = table_columns(conn, ATTRIBUTES_TABLE)?.contains(&config.gages);

    let query = if has_gages {
        format!(
            "SELECT {}, {}, {} FROM '{}'",
            config.key, config.area, config.gages, ATTRIBUTES_TABLE
        )
    } else {
        format!(
            "SELECT {}, {}, NULL FROM '{}'",
            config.key, config.area, ATTRIBUTES_TABLE
        )
    };

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FlowpathRow {
                id: row.get(0)?,
                areasqkm: row.get(1)?,
                gage: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Load the waterbody-connection map (segment id -> lake id). Flowpaths
/// with no waterbody are skipped.
pub fn load_waterbody_connections(
    conn: &Connection,
    config: &ColumnConfig,
) -> PrepResult<HashMap<u32, u32>> {
    validate_columns(conn, ATTRIBUTES_TABLE, &[&config.key, &config.waterbody])?;
    let query = format!(
        "SELECT {}, {} FROM '{}' WHERE {} IS NOT NULL",
        config.key, config.waterbody, ATTRIBUTES_TABLE, config.waterbody
    );

    let mut stmt = conn.prepare(&query)?;
    let mut connections = HashMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (id, lake_id) = row?;
        if let Some(segment_id) = numeric_id_lenient(&id) {
            connections.insert(segment_id, lake_id as u32);
        }
    }
    Ok(connections)
}

/// Per-segment unit factors, the sole source consulted when rescaling
/// lateral flows.
#[derive(Debug, Default)]
pub struct FlowpathAttributeIndex {
    factors: HashMap<u32, f64>,
}

impl FlowpathAttributeIndex {
    /// Build the id -> factor map. qlat files carry an area-normalized
    /// depth rate; multiplying by `areasqkm * 1e6 / 3600` turns it into
    /// m^3/s over an hourly step.
    /// https://github.com/CIROH-UA/ngen/blob/ed2a903730467fa631716c033b757c3dff5fa2bb/include/core/Layer.hpp#L142
    ///
    /// Later rows silently overwrite earlier ones on a duplicate id. Rows
    /// with an unparseable id or a NULL area get no entry; they surface as
    /// `UnmappedUnitFactor` diagnostics at scale time.
    pub fn build(rows: &[FlowpathRow]) -> Self {
        let mut factors = HashMap::with_capacity(rows.len());
        for row in rows {
            let Some(id) = numeric_id_lenient(&row.id) else {
                continue;
            };
            let Some(area) = row.areasqkm else {
                continue;
            };
            factors.insert(id, area * 1_000_000.0 / 3600.0);
        }
        FlowpathAttributeIndex { factors }
    }

    pub fn unit_factor(&self, id: u32) -> Option<f64> {
        self.factors.get(&id).copied()
    }

    /// The segment set known to the routing network, used to filter merged
    /// flow rows.
    pub fn known_segments(&self) -> HashSet<u32> {
        self.factors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, area: Option<f64>) -> FlowpathRow {
        FlowpathRow {
            id: id.to_string(),
            areasqkm: area,
            gage: None,
        }
    }

    #[test]
    fn lenient_extraction_handles_both_forms() {
        assert_eq!(numeric_id_lenient("wb-1091162"), Some(1091162));
        assert_eq!(numeric_id_lenient("42"), Some(42));
        assert_eq!(numeric_id_lenient("wb-"), None);
        assert_eq!(numeric_id_lenient("headwater"), None);
    }

    #[test]
    fn strict_extraction_requires_separator() {
        assert_eq!(numeric_id_strict("wb-7").unwrap(), 7);
        assert_eq!(numeric_id_strict("wb-7.0").unwrap(), 7);
        assert!(matches!(
            numeric_id_strict("42"),
            Err(PrepError::IdFormat { .. })
        ));
    }

    #[test]
    fn unit_factor_formula() {
        let index = FlowpathAttributeIndex::build(&[row("wb-1", Some(2.5))]);
        let factor = index.unit_factor(1).unwrap();
        assert!((factor - 2.5 * 1_000_000.0 / 3600.0).abs() < 1e-6);
        assert!((factor - 694.444_444).abs() < 1e-3);
    }

    #[test]
    fn later_duplicate_wins() {
        let index = FlowpathAttributeIndex::build(&[row("wb-1", Some(1.0)), row("wb-1", Some(2.0))]);
        assert_eq!(index.len(), 1);
        let factor = index.unit_factor(1).unwrap();
        assert!((factor - 2.0 * 1_000_000.0 / 3600.0).abs() < 1e-6);
    }

    #[test]
    fn null_area_rows_are_skipped() {
        let index = FlowpathAttributeIndex::build(&[row("wb-1", None), row("wb-2", Some(1.0))]);
        assert_eq!(index.unit_factor(1), None);
        assert!(index.unit_factor(2).is_some());
        assert_eq!(index.known_segments(), [2].into_iter().collect());
    }

    #[test]
    fn schema_validation_names_the_missing_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE 'flowpath-attributes' (id TEXT, gage TEXT)", [])
            .unwrap();

        let err = validate_columns(&conn, ATTRIBUTES_TABLE, &["id", "areasqkm"]).unwrap_err();
        match err {
            PrepError::Schema { table, column } => {
                assert_eq!(table, "flowpath-attributes");
                assert_eq!(column, "areasqkm");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_without_gage_column_yields_ungaged_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE 'flowpath-attributes' (id TEXT, areasqkm REAL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO 'flowpath-attributes' VALUES ('wb-1', 3.6)",
            [],
        )
        .unwrap();

        let config = ColumnConfig::new();
        let rows = load_flowpath_table(&conn, &config).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "wb-1");
        assert_eq!(rows[0].areasqkm, Some(3.6));
        assert_eq!(rows[0].gage, None);
    }

    #[test]
    fn waterbody_connections_skip_nulls() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE 'flowpath-attributes' (id TEXT, areasqkm REAL, WaterbodyID INTEGER)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO 'flowpath-attributes' VALUES ('wb-1', 1.0, 167122815), ('wb-2', 2.0, NULL)",
            [],
        )
        .unwrap();

        let config = ColumnConfig::new();
        let connections = load_waterbody_connections(&conn, &config).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections.get(&1), Some(&167122815));
    }
}
