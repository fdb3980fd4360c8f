// The hinted-JSON step of the resolver.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::ingest::*;

/// Parses payloads whose content type or name hints at JSON.
///
/// Three accepted shapes: an array of flat objects, an object with a `data`
/// key holding such an array, and any other object (flattened to one row
/// with dotted column paths). A payload that hints at JSON but does not parse
/// falls through to the delimiter sniffer.
pub fn sniff_json(payload: &RawPayload) -> IngestResult<Sniff> {
    if !payload.hints_json() {
        return Ok(Sniff::Skip);
    }
    let text = String::from_utf8_lossy(strip_bom(&payload.bytes));
    let parsed: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            debug!("sniff_json: hint did not hold, passing: {}", e);
            return Ok(Sniff::Skip);
        }
    };
    Ok(match table_from_json(&parsed) {
        Some(table) => Sniff::Table(table),
        None => Sniff::Skip,
    })
}

/// Builds a table out of a decoded JSON document, or `None` when the document
/// is a bare scalar.
pub fn table_from_json(value: &Value) -> Option<TidyTable> {
    match value {
        Value::Array(items) => Some(rows_from_objects(items)),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                Some(rows_from_objects(items))
            } else {
                Some(flatten_object(map))
            }
        }
        _ => None,
    }
}

// Columns are the union of the object keys in first-seen order. A key absent
// from a row becomes an empty cell.
fn rows_from_objects(items: &[Value]) -> TidyTable {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }
    }
    let mut table = TidyTable::new(columns.clone());
    for item in items {
        let map = match item {
            Value::Object(map) => map,
            other => {
                debug!("rows_from_objects: skipping non-object element {:?}", other);
                continue;
            }
        };
        table.push_row(
            columns
                .iter()
                .map(|c| map.get(c).map(scalar_to_text).unwrap_or_default())
                .collect(),
        );
    }
    table
}

fn flatten_object(map: &Map<String, Value>) -> TidyTable {
    let mut columns: Vec<String> = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    flatten_into("", map, &mut columns, &mut cells);
    let mut table = TidyTable::new(columns);
    table.push_row(cells);
    table
}

fn flatten_into(
    prefix: &str,
    map: &Map<String, Value>,
    columns: &mut Vec<String>,
    cells: &mut Vec<String>,
) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => flatten_into(&path, inner, columns, cells),
            other => {
                columns.push(path);
                cells.push(scalar_to_text(other));
            }
        }
    }
}

// Null reads as missing; nested arrays keep their JSON form so nothing is
// silently dropped.
pub(crate) fn scalar_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hint_is_skipped() {
        let raw = RawPayload::from_bytes(b"[{\"a\": 1}]".to_vec());
        assert!(matches!(sniff_json(&raw).unwrap(), Sniff::Skip));
    }

    #[test]
    fn extension_hint_is_enough() {
        let raw = RawPayload {
            bytes: b"[{\"a\": 1}]".to_vec(),
            content_type: None,
            name: Some("https://example.org/export.JSON".to_string()),
        };
        let table = match sniff_json(&raw).unwrap() {
            Sniff::Table(t) => t,
            Sniff::Skip => panic!("expected a table"),
        };
        assert_eq!(table.columns(), ["a"]);
    }

    #[test]
    fn scalar_document_is_skipped() {
        assert!(table_from_json(&Value::Bool(true)).is_none());
        assert!(table_from_json(&serde_json::json!(42)).is_none());
    }

    #[test]
    fn nested_arrays_keep_their_json_form() {
        let value = serde_json::json!([{"a": [1, 2]}]);
        let table = table_from_json(&value).unwrap();
        assert_eq!(table.rows()[0], vec!["[1,2]"]);
    }
}
