// File-based dataset storage: one csv file plus one metadata document per
// dataset, keyed by a slug. The directory is always an explicit parameter.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use indicator_ranking::IndicatorRecord;

use crate::ingest::{DatasetCsvSnafu, DatasetIoSnafu, IngestResult, ParsingJsonSnafu, TidyTable};

const META_SUFFIX: &str = ".meta.json";

/// The metadata document saved next to every dataset.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    #[serde(default)]
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub licence: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub retrieved_at: String,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub saved_at: String,
}

/// One stored dataset: where its table lives and what its metadata says.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DatasetEntry {
    pub csv_path: PathBuf,
    pub meta: DatasetMeta,
}

impl DatasetEntry {
    /// Case-insensitive search over title, source and tags.
    pub fn matches_search(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let blob = format!(
            "{} {} {}",
            self.meta.title,
            self.meta.source,
            self.meta.tags.join(" ")
        )
        .to_lowercase();
        blob.contains(&query.to_lowercase())
    }

    /// True when the dataset carries every wanted tag.
    pub fn has_tags(&self, wanted: &[String]) -> bool {
        let owned: HashSet<String> = self.meta.tags.iter().map(|t| t.to_lowercase()).collect();
        wanted.iter().all(|t| owned.contains(&t.to_lowercase()))
    }
}

pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> DatasetStore {
        DatasetStore { dir: dir.into() }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, META_SUFFIX))
    }

    /// Writes the table and its metadata, overwriting any previous dataset
    /// saved under the same name. `name`, `rows` and `saved_at` are filled in
    /// here.
    pub fn save(
        &self,
        name: &str,
        table: &TidyTable,
        meta: &DatasetMeta,
    ) -> IngestResult<DatasetEntry> {
        fs::create_dir_all(&self.dir).context(DatasetIoSnafu {
            path: self.dir.clone(),
        })?;
        let csv_path = self.csv_path(name);
        write_csv(&csv_path, table)?;

        let meta = DatasetMeta {
            name: name.to_string(),
            rows: table.num_rows() as u64,
            saved_at: now_timestamp(),
            ..meta.clone()
        };
        let meta_path = self.meta_path(name);
        let encoded = serde_json::to_string_pretty(&meta).context(ParsingJsonSnafu {})?;
        fs::write(&meta_path, encoded).context(DatasetIoSnafu { path: meta_path })?;
        debug!("save: wrote {} ({} rows)", csv_path.display(), meta.rows);
        Ok(DatasetEntry { csv_path, meta })
    }

    /// Every dataset that has both its files, newest first. A metadata
    /// document that does not parse is skipped with a warning rather than
    /// taking the whole listing down.
    pub fn list(&self) -> IngestResult<Vec<DatasetEntry>> {
        let mut entries: Vec<DatasetEntry> = Vec::new();
        let dir_iter = match fs::read_dir(&self.dir) {
            Ok(iter) => iter,
            // A store that was never written to is just empty.
            Err(_) => return Ok(entries),
        };
        for dir_entry in dir_iter {
            let dir_entry = dir_entry.context(DatasetIoSnafu {
                path: self.dir.clone(),
            })?;
            let file_name = dir_entry.file_name().to_string_lossy().into_owned();
            let name = match file_name.strip_suffix(META_SUFFIX) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let meta_path = dir_entry.path();
            let raw = fs::read_to_string(&meta_path).context(DatasetIoSnafu {
                path: meta_path.clone(),
            })?;
            let meta: DatasetMeta = match serde_json::from_str(&raw) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("list: skipping {}: {}", meta_path.display(), e);
                    continue;
                }
            };
            let csv_path = self.csv_path(&name);
            if csv_path.exists() {
                entries.push(DatasetEntry { csv_path, meta });
            }
        }
        // RFC-3339 timestamps sort lexicographically.
        entries.sort_by(|a, b| b.meta.saved_at.cmp(&a.meta.saved_at));
        Ok(entries)
    }

    /// Reads a stored dataset back into a table.
    pub fn read_table(&self, name: &str) -> IngestResult<TidyTable> {
        read_csv(&self.csv_path(name))
    }
}

fn write_csv(path: &Path, table: &TidyTable) -> IngestResult<()> {
    let mut writer = csv::Writer::from_path(path).context(DatasetCsvSnafu {
        path: path.to_path_buf(),
    })?;
    writer.write_record(table.columns()).context(DatasetCsvSnafu {
        path: path.to_path_buf(),
    })?;
    for row in table.rows() {
        writer.write_record(row).context(DatasetCsvSnafu {
            path: path.to_path_buf(),
        })?;
    }
    writer.flush().context(DatasetIoSnafu {
        path: path.to_path_buf(),
    })?;
    Ok(())
}

fn read_csv(path: &Path) -> IngestResult<TidyTable> {
    let mut rdr = csv::Reader::from_path(path).context(DatasetCsvSnafu {
        path: path.to_path_buf(),
    })?;
    let columns: Vec<String> = rdr
        .headers()
        .context(DatasetCsvSnafu {
            path: path.to_path_buf(),
        })?
        .iter()
        .map(str::to_string)
        .collect();
    let mut table = TidyTable::new(columns);
    for record in rdr.records() {
        let record = record.context(DatasetCsvSnafu {
            path: path.to_path_buf(),
        })?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Ok(table)
}

/// UTC, RFC-3339 with a `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Storage name derived from a title: runs of non-alphanumerics collapse to a
/// single underscore, lowercased.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "dataset".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extracts ranking records from a standard-shaped table. `None` when any of
/// the four required columns is missing; `unit` and `source` are optional.
pub fn standard_records(table: &TidyTable) -> Option<Vec<IndicatorRecord>> {
    let region = table.column_index("region")?;
    let year = table.column_index("year")?;
    let indicator = table.column_index("indicator")?;
    let value = table.column_index("value")?;
    let unit = table.column_index("unit");
    let source = table.column_index("source");
    Some(
        table
            .rows()
            .iter()
            .map(|row| IndicatorRecord {
                region: row[region].clone(),
                year: row[year].clone(),
                indicator: row[indicator].clone(),
                value: row[value].clone(),
                unit: unit.map(|i| row[i].clone()).unwrap_or_default(),
                source: source.map(|i| row[i].clone()).unwrap_or_default(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TidyTable {
        let mut table = TidyTable::new(vec!["region".to_string(), "value".to_string()]);
        table.push_row(vec!["Oslo".to_string(), "1".to_string()]);
        table.push_row(vec!["Bergen".to_string(), "2".to_string()]);
        table
    }

    fn sample_meta(title: &str) -> DatasetMeta {
        DatasetMeta {
            name: String::new(),
            title: title.to_string(),
            source: "test".to_string(),
            source_url: String::new(),
            method: "upload".to_string(),
            licence: "Unknown".to_string(),
            tags: vec!["Test".to_string(), "demo".to_string()],
            description: String::new(),
            retrieved_at: now_timestamp(),
            rows: 0,
            saved_at: String::new(),
        }
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Befolkning i fylkene (2023)"), "befolkning_i_fylkene_2023");
        assert_eq!(slugify("  --  "), "dataset");
        assert_eq!(slugify("Åpen data"), "åpen_data");
    }

    #[test]
    fn save_list_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let entry = store
            .save("pop", &sample_table(), &sample_meta("Population"))
            .unwrap();
        assert_eq!(entry.meta.name, "pop");
        assert_eq!(entry.meta.rows, 2);
        assert!(!entry.meta.saved_at.is_empty());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].meta.title, "Population");

        let table = store.read_table("pop").unwrap();
        assert_eq!(table.columns(), ["region", "value"]);
        assert_eq!(table.rows()[1], vec!["Bergen", "2"]);
    }

    #[test]
    fn saving_twice_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store
            .save("pop", &sample_table(), &sample_meta("Population"))
            .unwrap();
        let mut smaller = TidyTable::new(vec!["region".to_string()]);
        smaller.push_row(vec!["Oslo".to_string()]);
        store
            .save("pop", &smaller, &sample_meta("Population v2"))
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].meta.title, "Population v2");
        assert_eq!(listed[0].meta.rows, 1);
        assert_eq!(store.read_table("pop").unwrap().num_columns(), 1);
    }

    #[test]
    fn missing_store_directory_lists_empty() {
        let store = DatasetStore::new("/nonexistent/for/sure");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn search_and_tag_filters() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        let entry = store
            .save("pop", &sample_table(), &sample_meta("Population"))
            .unwrap();
        assert!(entry.matches_search("popul"));
        assert!(entry.matches_search(""));
        assert!(!entry.matches_search("crime"));
        assert!(entry.has_tags(&["test".to_string()]));
        assert!(entry.has_tags(&["TEST".to_string(), "demo".to_string()]));
        assert!(!entry.has_tags(&["test".to_string(), "other".to_string()]));
    }

    #[test]
    fn standard_records_require_the_core_columns() {
        assert!(standard_records(&sample_table()).is_none());

        let mut table = TidyTable::new(
            ["region", "year", "indicator", "value", "unit", "source"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        table.push_row(
            ["Oslo", "2023", "income", "12,5", "nok", "ssb"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        let records = standard_records(&table).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].region, "Oslo");
        assert_eq!(records[0].value, "12,5");
        assert_eq!(records[0].source, "ssb");
    }
}
