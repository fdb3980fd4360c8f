// Flattener for dimensional JSON-stat v2 documents, as served by statistics
// agencies in response to a POST query.

use serde_json::Value;
use snafu::{ensure, OptionExt};

use crate::ingest::io_json::scalar_to_text;
use crate::ingest::*;

/// Converts a JSON-stat document into a tidy table: one column per dimension,
/// one row per category combination, plus a trailing `value` column.
///
/// The flat value array is read in row-major order over the dimensions as
/// declared in `dimension.id`, the first dimension varying slowest. A null or
/// non-numeric entry becomes a missing value. The number of combinations must
/// match the value array exactly; the document is malformed otherwise and is
/// never truncated or padded.
pub fn flatten(document: &Value) -> IngestResult<TidyTable> {
    // Some publishers wrap the payload under a top-level "dataset" key.
    let ds = document.get("dataset").unwrap_or(document);
    let dimension = ds.get("dimension").context(StatMissingFieldSnafu {
        field: "dimension",
    })?;
    let ids: Vec<String> = dimension
        .get("id")
        .and_then(Value::as_array)
        .context(StatMissingFieldSnafu {
            field: "dimension.id",
        })?
        .iter()
        .map(scalar_to_text)
        .collect();

    let mut axes: Vec<Vec<String>> = Vec::with_capacity(ids.len());
    for id in &ids {
        axes.push(category_values(dimension, id)?);
    }
    let expected: usize = axes.iter().map(Vec::len).product();

    let values = ds
        .get("value")
        .and_then(Value::as_array)
        .context(StatMissingFieldSnafu { field: "value" })?;
    ensure!(
        values.len() == expected,
        StatSizeMismatchSnafu {
            expected,
            found: values.len(),
        }
    );
    debug!("flatten: {} dimensions, {} rows", ids.len(), expected);

    let mut columns = ids.clone();
    columns.push("value".to_string());
    let mut table = TidyTable::new(columns);
    for (pos, value) in values.iter().enumerate() {
        let mut row: Vec<String> = Vec::with_capacity(ids.len() + 1);
        let mut stride = expected;
        for axis in &axes {
            stride /= axis.len();
            row.push(axis[(pos / stride) % axis.len()].clone());
        }
        row.push(value.as_f64().map(|v| v.to_string()).unwrap_or_default());
        table.push_row(row);
    }
    Ok(table)
}

// The ordered category list of one dimension: display labels when the
// document carries them, raw index keys otherwise, both in declared order.
fn category_values(dimension: &Value, id: &str) -> IngestResult<Vec<String>> {
    let category = dimension
        .get(id)
        .and_then(|d| d.get("category"))
        .context(StatMissingFieldSnafu {
            field: format!("dimension.{}.category", id),
        })?;
    if let Some(labels) = category.get("label").and_then(Value::as_object) {
        return Ok(labels.values().map(scalar_to_text).collect());
    }
    match category.get("index") {
        Some(Value::Object(index)) => Ok(index.keys().cloned().collect()),
        Some(Value::Array(keys)) => Ok(keys.iter().map(scalar_to_text).collect()),
        _ => StatMissingFieldSnafu {
            field: format!("dimension.{}.category.index", id),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_by_three() -> Value {
        json!({
            "dimension": {
                "id": ["region", "year"],
                "region": {"category": {"label": {"0301": "Oslo", "1103": "Stavanger"}}},
                "year": {"category": {"index": {"2021": 0, "2022": 1, "2023": 2}}}
            },
            "value": [1, 2, 3, 4, 5, 6]
        })
    }

    #[test]
    fn row_major_expansion_first_dimension_slowest() {
        let table = flatten(&two_by_three()).unwrap();
        assert_eq!(table.columns(), ["region", "year", "value"]);
        assert_eq!(table.num_rows(), 6);
        let rows = table.rows();
        assert_eq!(rows[0], vec!["Oslo", "2021", "1"]);
        assert_eq!(rows[1], vec!["Oslo", "2022", "2"]);
        assert_eq!(rows[2], vec!["Oslo", "2023", "3"]);
        assert_eq!(rows[3], vec!["Stavanger", "2021", "4"]);
        assert_eq!(rows[5], vec!["Stavanger", "2023", "6"]);
    }

    #[test]
    fn every_combination_is_unique() {
        let table = flatten(&two_by_three()).unwrap();
        let mut keys: Vec<String> = table
            .rows()
            .iter()
            .map(|r| format!("{}|{}", r[0], r[1]))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn size_mismatch_is_an_error_not_a_truncation() {
        let mut doc = two_by_three();
        doc["value"] = json!([1, 2, 3, 4]);
        let err = flatten(&doc).unwrap_err();
        assert!(matches!(
            err,
            IngestError::StatSizeMismatch {
                expected: 6,
                found: 4,
            }
        ));
    }

    #[test]
    fn null_and_non_numeric_values_become_missing() {
        let mut doc = two_by_three();
        doc["value"] = json!([1, null, "..", 4, 5, 6]);
        let table = flatten(&doc).unwrap();
        assert_eq!(table.rows()[1][2], "");
        assert_eq!(table.rows()[2][2], "");
        assert_eq!(table.rows()[3][2], "4");
    }

    #[test]
    fn dataset_wrapper_is_unwrapped() {
        let doc = json!({"dataset": two_by_three()});
        assert_eq!(flatten(&doc).unwrap().num_rows(), 6);
    }

    #[test]
    fn missing_dimension_is_reported() {
        let err = flatten(&json!({"value": []})).unwrap_err();
        assert!(matches!(err, IngestError::StatMissingField { .. }));
    }

    #[test]
    fn index_array_is_accepted() {
        let doc = json!({
            "dimension": {
                "id": ["sex"],
                "sex": {"category": {"index": ["male", "female"]}}
            },
            "value": [10, 20]
        });
        let table = flatten(&doc).unwrap();
        assert_eq!(table.rows()[0], vec!["male", "10"]);
        assert_eq!(table.rows()[1], vec!["female", "20"]);
    }
}
