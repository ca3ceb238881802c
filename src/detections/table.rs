//! Loose CSV tables.
//!
//! Detection products come from many detectors and are only loosely
//! consistent: quoted fields, doubled quotes, blank lines, ragged rows and
//! byte-order marks all occur. Every cell is kept as trimmed text; column
//! roles are decided later by [`super::columns`].

use std::io::Read;
use std::path::Path;

use csv::ByteRecord;

use crate::error::{Error, Result};

/// Header plus data rows, all as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Column names.
    pub header: Vec<String>,
    /// Data rows; may be shorter or longer than the header.
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Read a table from a file.
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::CsvRead {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Self::from_reader(file).map_err(|source| Error::CsvRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a table from any reader.
    pub fn from_reader<R: Read>(reader: R) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header = lossy_cells(reader.byte_headers()?);

        let mut rows = Vec::new();
        for record in reader.byte_records() {
            let record = record?;
            if record.iter().all(<[u8]>::is_empty) {
                continue;
            }
            rows.push(lossy_cells(&record));
        }

        Ok(Self { header, rows })
    }

    /// Number of columns, the wider of header and any row.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Cell text, empty when the row is short.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    /// Lower-cased header name, empty for unnamed columns.
    pub fn header_lower(&self, column: usize) -> String {
        self.header
            .get(column)
            .map(|h| h.to_lowercase())
            .unwrap_or_default()
    }

    /// Iterate one column's cells.
    pub fn column(&self, column: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.get(column).map_or("", String::as_str))
    }
}

/// Cells as text; bytes that are not UTF-8 become U+FFFD.
fn lossy_cells(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_quotes_and_blank_lines() {
        let text = "\"time\",\"note\"\n\n2021-01-01T00:00:00Z,\"say \"\"hi\"\", ok\"\n\n";
        let table = CsvTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.header, ["time", "note"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell(0, 1), "say \"hi\", ok");
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let text = "a,b,c\n1,2\n1,2,3,4\n";
        let table = CsvTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.column_count(), 4);
    }

    #[test]
    fn test_bom_and_whitespace_trimmed() {
        let text = "\u{feff} Time , Presence \n 2021-01-01 , 1 \n";
        let table = CsvTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.header, ["Time", "Presence"]);
        assert_eq!(table.cell(0, 1), "1");
        assert_eq!(table.header_lower(1), "presence");
    }

    #[test]
    fn test_non_utf8_cell_keeps_row() {
        let mut bytes = b"time,presence,note\n2021-01-01T03:00:00Z,1,ok\n".to_vec();
        bytes.extend_from_slice(b"2021-01-01T04:00:00Z,1,depth 20\xB0m\n");
        bytes.extend_from_slice(b"2021-01-01T05:00:00Z,0,\n");
        let table = CsvTable::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.cell(1, 0), "2021-01-01T04:00:00Z");
        assert_eq!(table.cell(1, 2), "depth 20\u{fffd}m");
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = CsvTable::read(Path::new("/nonexistent/det.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/det.csv"));
    }

    #[test]
    fn test_read_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "x,y").unwrap();
        writeln!(file, "1,2").unwrap();
        file.flush().unwrap();
        let table = CsvTable::read(file.path()).unwrap();
        assert_eq!(table.column(1).collect::<Vec<_>>(), ["2"]);
    }
}
