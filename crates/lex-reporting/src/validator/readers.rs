//! Format-specific readers producing raw string frames.

use crate::error::ValidationError;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read delimited text with a header row. Every column is read as a string.
pub(crate) fn read_delimited(bytes: &[u8], separator: u8) -> Result<DataFrame, ValidationError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(body)
        .map_err(|e| ValidationError::UnsupportedFormat(format!("text is not valid UTF-8 ({})", e)))?;

    if text.trim().is_empty() {
        return Err(ValidationError::TooFewColumns { found: 0 });
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"')),
        )
        .into_reader_with_file_handle(Cursor::new(body.to_vec()))
        .finish()
        .map_err(|e| ValidationError::CorruptFile(e.to_string()))
}

/// Read the first worksheet of a spreadsheet. The first row is the header.
pub(crate) fn read_spreadsheet(bytes: &[u8]) -> Result<DataFrame, ValidationError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ValidationError::CorruptFile(e.to_string()))?;

    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(ValidationError::TooFewColumns { found: 0 });
    };
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| ValidationError::CorruptFile(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(ValidationError::TooFewColumns { found: 0 });
    };
    let headers = unique_headers(header_row.iter().map(cell_to_string).collect());

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (index, column) in columns.iter_mut().enumerate() {
            column.push(row.get(index).and_then(cell_to_string));
        }
    }

    let series: Vec<Column> = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    DataFrame::new(series).map_err(|e| ValidationError::CorruptFile(e.to_string()))
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(dt.as_f64().to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Fill blank header cells and suffix repeated names so columns stay unique.
fn unique_headers(raw: Vec<Option<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("column_{}", index + 1));
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_delimited_reads_strings() {
        let df = read_delimited(b"id,amount\n1,10.5\n2,20\n", b',').unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("amount").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_read_delimited_strips_bom_and_handles_tabs() {
        let df = read_delimited(b"\xEF\xBB\xBFa\tb\nx\ty\n", b'\t').unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_read_delimited_rejects_non_utf8() {
        let err = read_delimited(b"name,city\nJos\xe9,M\xe1laga\n", b',').unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_delimited_empty() {
        let err = read_delimited(b"  \n", b',').unwrap_err();
        assert_eq!(err, ValidationError::TooFewColumns { found: 0 });
    }

    #[test]
    fn test_read_spreadsheet_garbage_is_corrupt() {
        let err = read_spreadsheet(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, ValidationError::CorruptFile(_)));
    }

    #[test]
    fn test_unique_headers() {
        let headers = unique_headers(vec![
            Some("Sales".to_string()),
            None,
            Some("Sales".to_string()),
            Some(" ".to_string()),
        ]);
        assert_eq!(headers, vec!["Sales", "column_2", "Sales_2", "column_4"]);
    }
}
