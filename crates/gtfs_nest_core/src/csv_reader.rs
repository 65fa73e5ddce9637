use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum CsvParseError {
    #[error("{file}: missing required column {column}")]
    MissingColumn { file: String, column: String },
    #[error("{file}: unreadable header: {message}")]
    Header { file: String, message: String },
    #[error("{file}:{line}: {message}")]
    Malformed {
        file: String,
        line: u64,
        column: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct CsvTable<T> {
    pub headers: Vec<String>,
    pub rows: Vec<T>,
}

impl<T> Default for CsvTable<T> {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> CsvTable<T> {
    pub fn from_rows(headers: &[&str], rows: Vec<T>) -> Self {
        Self {
            headers: headers.iter().map(|value| value.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses one GTFS table.
///
/// Every name in `required_columns` must appear in the header, otherwise no row
/// is read at all. Values are trimmed and empty fields count as missing for
/// optional columns.
pub fn read_csv_from_reader<T, R>(
    reader: R,
    file_name: &str,
    required_columns: &[&str],
) -> Result<CsvTable<T>, CsvParseError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut headers = reader
        .headers()
        .map_err(|err| CsvParseError::Header {
            file: file_name.to_string(),
            message: err.to_string(),
        })?
        .clone();
    if let Some(first) = headers.get(0) {
        if let Some(stripped) = first.strip_prefix('\u{FEFF}') {
            let mut cleaned: Vec<String> = headers.iter().map(str::to_string).collect();
            cleaned[0] = stripped.trim().to_string();
            headers = StringRecord::from(cleaned);
            reader.set_headers(headers.clone());
        }
    }

    for column in required_columns {
        if !headers.iter().any(|header| header == *column) {
            return Err(CsvParseError::MissingColumn {
                file: file_name.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut table = CsvTable {
        headers: headers.iter().map(str::to_string).collect(),
        rows: Vec::new(),
    };
    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = result.map_err(|err| CsvParseError::Malformed {
            file: file_name.to_string(),
            line: err
                .position()
                .map(|pos| pos.line())
                .unwrap_or(fallback_line),
            column: None,
            message: err.to_string(),
        })?;
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(fallback_line);

        if record.iter().all(|value| value.is_empty()) {
            continue;
        }

        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|err| malformed_row(file_name, line, &headers, &err))?;
        table.rows.push(row);
    }

    Ok(table)
}

fn malformed_row(
    file_name: &str,
    line: u64,
    headers: &StringRecord,
    err: &csv::Error,
) -> CsvParseError {
    let (column, message) = match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => (
            err.field()
                .and_then(|index| headers.get(index as usize))
                .map(str::to_string),
            err.kind().to_string(),
        ),
        _ => (None, err.to_string()),
    };
    CsvParseError::Malformed {
        file: file_name.to_string(),
        line,
        column,
        message,
    }
}
