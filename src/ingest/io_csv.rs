// The delimiter-sniffing step of the resolver.

use csv::ReaderBuilder;

use crate::ingest::*;

// Fixed trial order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Tries the candidate delimiters in order and keeps the first that yields a
/// plausible table.
///
/// Plausible means at least two columns: a one-column parse is almost always
/// the wrong delimiter read as literal text, so it is only used as a fallback
/// once every delimiter has had its turn. Record-length consistency is
/// whatever the csv reader enforces per line, nothing more.
pub fn sniff_delimited(payload: &RawPayload) -> IngestResult<Sniff> {
    let bytes = strip_bom(&payload.bytes);
    let mut single_column: Option<TidyTable> = None;
    for delimiter in DELIMITERS {
        match read_delimited(bytes, delimiter) {
            Some(table) if table.num_columns() >= 2 => {
                debug!("sniff_delimited: accepted delimiter {:?}", delimiter as char);
                return Ok(Sniff::Table(table));
            }
            Some(table) => {
                if single_column.is_none() {
                    single_column = Some(table);
                }
            }
            None => {}
        }
    }
    Ok(match single_column {
        Some(table) => Sniff::Table(table),
        None => Sniff::Skip,
    })
}

fn read_delimited(bytes: &[u8], delimiter: u8) -> Option<TidyTable> {
    let mut rdr = ReaderBuilder::new().delimiter(delimiter).from_reader(bytes);
    let columns: Vec<String> = rdr.headers().ok()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return None;
    }
    let mut table = TidyTable::new(columns);
    for record in rdr.records() {
        // An uneven record length or invalid utf-8 rejects this delimiter.
        let record = record.ok()?;
        table.push_row(record.iter().map(str::to_string).collect());
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(bytes: &[u8]) -> Sniff {
        sniff_delimited(&RawPayload::from_bytes(bytes.to_vec())).unwrap()
    }

    #[test]
    fn comma_wins_when_it_applies() {
        let table = match sniff(b"a,b\n1,2\n") {
            Sniff::Table(t) => t,
            Sniff::Skip => panic!("expected a table"),
        };
        assert_eq!(table.columns(), ["a", "b"]);
    }

    #[test]
    fn quoted_delimiter_stays_inside_its_field() {
        let table = match sniff(b"a,b\n\"1,5\",2\n") {
            Sniff::Table(t) => t,
            Sniff::Skip => panic!("expected a table"),
        };
        assert_eq!(table.rows()[0], vec!["1,5", "2"]);
    }

    #[test]
    fn one_column_parse_loses_to_a_wider_one() {
        // The comma attempt sees a single column; the semicolon attempt sees
        // three and must win despite running later.
        let table = match sniff(b"a;b;c\n1;2;3\n") {
            Sniff::Table(t) => t,
            Sniff::Skip => panic!("expected a table"),
        };
        assert_eq!(table.columns(), ["a", "b", "c"]);
    }

    #[test]
    fn non_utf8_bytes_are_not_a_table() {
        assert!(matches!(sniff(&[0xff, 0xfe, 0x01]), Sniff::Skip));
    }
}
