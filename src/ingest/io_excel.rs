// The spreadsheet step of the resolver.

use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use snafu::{OptionExt, ResultExt};

use crate::ingest::*;

// Two-byte ZIP local-file-header signature. Xlsx workbooks are ZIP containers.
const ZIP_SIGNATURE: &[u8] = b"PK";

/// Parses payloads carrying the ZIP container signature as a spreadsheet:
/// first sheet, first row as column names, every cell rendered to text.
///
/// The signature decides, not the declared content type: a payload claiming
/// to be Excel without the signature is skipped, while a payload with the
/// signature that fails to parse is a fatal error. The delimiter sniffer must
/// never see container bytes.
pub fn sniff_spreadsheet(payload: &RawPayload) -> IngestResult<Sniff> {
    if !payload.bytes.starts_with(ZIP_SIGNATURE) {
        return Ok(Sniff::Skip);
    }
    read_workbook(&payload.bytes).map(Sniff::Table)
}

fn read_workbook(bytes: &[u8]) -> IngestResult<TidyTable> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).context(OpeningSpreadsheetSnafu {})?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptySpreadsheetSnafu {})?
        .context(OpeningSpreadsheetSnafu {})?;

    let mut iter = wrange.rows();
    let header = iter.next().context(EmptySpreadsheetSnafu {})?;
    debug!("read_workbook: header: {:?}", header);

    let columns: Vec<String> = header.iter().map(cell_to_text).collect();
    let mut table = TidyTable::new(columns);
    for row in iter {
        table.push_row(row.iter().map(cell_to_text).collect());
    }
    Ok(table)
}

fn cell_to_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::DateTime(f) => f.to_string(),
        // Cell-level errors read as missing data.
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_container_bytes_are_skipped() {
        let raw = RawPayload::from_bytes(b"a,b\n1,2\n".to_vec());
        assert!(matches!(sniff_spreadsheet(&raw).unwrap(), Sniff::Skip));
    }

    #[test]
    fn corrupt_container_is_fatal() {
        let raw = RawPayload::from_bytes(b"PK\x03\x04not really a workbook".to_vec());
        let err = sniff_spreadsheet(&raw).unwrap_err();
        assert!(matches!(err, IngestError::OpeningSpreadsheet { .. }));
    }

    #[test]
    fn cells_render_to_text() {
        assert_eq!(cell_to_text(&DataType::String("x".to_string())), "x");
        assert_eq!(cell_to_text(&DataType::Float(2023.0)), "2023");
        assert_eq!(cell_to_text(&DataType::Float(12.5)), "12.5");
        assert_eq!(cell_to_text(&DataType::Int(7)), "7");
        assert_eq!(cell_to_text(&DataType::Bool(true)), "true");
        assert_eq!(cell_to_text(&DataType::Empty), "");
    }
}
