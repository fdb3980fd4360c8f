use log::debug;

use snafu::{ensure, Snafu};

use std::path::PathBuf;

pub mod io_csv;
pub mod io_excel;
pub mod io_json;
pub mod io_jsonstat;
pub mod mapping;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IngestError {
    #[snafu(display("empty payload"))]
    EmptyPayload {},
    #[snafu(display("could not read the spreadsheet container: {source}"))]
    OpeningSpreadsheet { source: calamine::XlsxError },
    #[snafu(display("the spreadsheet has no sheet or no header row"))]
    EmptySpreadsheet {},
    #[snafu(display("none of the candidate delimiters produced a table"))]
    Unparseable {},
    #[snafu(display("not a JSON-stat document: missing {field}"))]
    StatMissingField { field: String },
    #[snafu(display("dimension size mismatch: {expected} combinations but {found} values"))]
    StatSizeMismatch { expected: usize, found: usize },
    #[snafu(display("could not build the http client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("fetching {url}"))]
    Fetch { source: reqwest::Error, url: String },
    #[snafu(display("reading or writing {}", path.display()))]
    DatasetIo {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("reading or writing csv data at {}", path.display()))]
    DatasetCsv { source: csv::Error, path: PathBuf },
    #[snafu(display("parsing json"))]
    ParsingJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;

/// An unparsed payload: raw bytes plus whatever the caller knows about them.
/// The hints steer the resolver but are never trusted over the content.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
    /// The declared content type, e.g. from an http response header.
    pub content_type: Option<String>,
    /// A filename or URL, used for extension sniffing.
    pub name: Option<String>,
}

impl RawPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> RawPayload {
        RawPayload {
            bytes,
            content_type: None,
            name: None,
        }
    }

    fn hints_json(&self) -> bool {
        if let Some(ct) = &self.content_type {
            if ct.to_lowercase().contains("json") {
                return true;
            }
        }
        match &self.name {
            Some(name) => name.to_lowercase().ends_with(".json"),
            None => false,
        }
    }
}

/// Rectangular data: one row per observation, one column per variable, every
/// cell text. Columns keep their first-seen order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TidyTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TidyTable {
    pub fn new(columns: Vec<String>) -> TidyTable {
        TidyTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row. Short rows are padded with empty cells so that every
    /// row keeps the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        debug_assert!(row.len() <= self.columns.len());
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// The outcome of one sniffing step: a parsed table, or a signal that the
/// step does not apply to this payload and the next one should run. Expected
/// format mismatches travel through `Skip`, never through errors.
#[derive(Debug)]
pub enum Sniff {
    Table(TidyTable),
    Skip,
}

/// Classifies a payload and parses it into a table.
///
/// The steps run in a fixed order: spreadsheet container by binary signature,
/// then declared/hinted JSON, then brute-force delimiter sniffing. Only a
/// payload recognized as a spreadsheet can fail fatally before the end of the
/// chain; everything else falls through.
pub fn resolve(payload: &RawPayload) -> IngestResult<TidyTable> {
    ensure!(!payload.bytes.is_empty(), EmptyPayloadSnafu);
    let steps: [fn(&RawPayload) -> IngestResult<Sniff>; 3] = [
        io_excel::sniff_spreadsheet,
        io_json::sniff_json,
        io_csv::sniff_delimited,
    ];
    for step in steps {
        match step(payload)? {
            Sniff::Table(table) => {
                debug!(
                    "resolve: parsed {} rows x {} columns",
                    table.num_rows(),
                    table.num_columns()
                );
                return Ok(table);
            }
            Sniff::Skip => continue,
        }
    }
    UnparseableSnafu {}.fail()
}

/// Drops a UTF-8 byte-order mark if present. Exported payloads from office
/// tooling routinely carry one.
pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf".as_slice()).unwrap_or(bytes)
}
