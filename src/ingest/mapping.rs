// Projection of arbitrary tables onto the standard six-field schema.

use serde::Deserialize;

use crate::ingest::TidyTable;

/// The fixed target schema, in output order.
pub const STANDARD_COLUMNS: [&str; 6] = ["region", "year", "indicator", "value", "unit", "source"];

/// Source-column names for each standard field. A field left at `None`, or
/// mapped to a column the source table does not have, comes out as empty
/// strings for every row. That is a mapping decision, not an error.
#[derive(Eq, PartialEq, Debug, Clone, Default, Deserialize)]
pub struct ColumnMapping {
    pub region: Option<String>,
    pub year: Option<String>,
    pub indicator: Option<String>,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub source: Option<String>,
}

impl ColumnMapping {
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, source)| source.is_none())
    }

    fn entries(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("region", self.region.as_deref()),
            ("year", self.year.as_deref()),
            ("indicator", self.indicator.as_deref()),
            ("value", self.value.as_deref()),
            ("unit", self.unit.as_deref()),
            ("source", self.source.as_deref()),
        ]
    }
}

/// Copies the mapped source columns into a fresh standard-shaped table.
/// Values stay text; whether `value` is numeric is the ranking engine's call.
pub fn map_to_standard(table: &TidyTable, mapping: &ColumnMapping) -> TidyTable {
    let sources: Vec<Option<usize>> = mapping
        .entries()
        .iter()
        .map(|(_, source)| source.and_then(|name| table.column_index(name)))
        .collect();
    let mut out = TidyTable::new(STANDARD_COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in table.rows() {
        out.push_row(
            sources
                .iter()
                .map(|source| source.map(|idx| row[idx].clone()).unwrap_or_default())
                .collect(),
        );
    }
    out
}
