use std::fs;
use std::path::Path;

use serde_json::{Number, Value};

use super::Row;

/// Why an upload could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("CSV input has no header row")]
    MissingHeader,
    #[error("CSV row {line} has an unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse CSV text into rows keyed by the header.
///
/// Empty lines are skipped. Cells are type-inferred: numbers, `true`/`false`,
/// empty -> null, anything else stays a string. Short rows omit the missing
/// keys; extra cells are ignored.
pub fn parse_csv(raw: &str) -> Result<Vec<Row>, CsvError> {
    let records = split_records(raw)?;
    let mut records = records.into_iter();

    let header = records.next().ok_or(CsvError::MissingHeader)?;
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(CsvError::MissingHeader);
    }

    let rows = records
        .map(|cells| {
            header
                .iter()
                .zip(cells)
                .filter(|(name, _)| !name.is_empty())
                .map(|(name, cell)| (name.clone(), infer_cell(&cell)))
                .collect::<Row>()
        })
        .collect();

    Ok(rows)
}

/// Parse CSV text, degrading to an empty row-set on malformed input
pub fn parse_rows_lossy(raw: &str) -> Vec<Row> {
    match parse_csv(raw) {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Ignoring malformed upload: {}", e);
            Vec::new()
        }
    }
}

/// Read an uploaded file; unreadable or malformed files yield no rows
pub fn read_rows(path: &Path) -> Vec<Row> {
    match fs::read_to_string(path) {
        Ok(raw) => parse_rows_lossy(&raw),
        Err(e) => {
            log::warn!("Failed to read upload {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Render a table as CSV, quoting cells that need it
pub fn write_csv<H, R>(header: &[H], rows: R) -> String
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut out = String::new();
    push_record(&mut out, header.iter().map(AsRef::as_ref));
    for row in rows {
        push_record(&mut out, row.iter().map(String::as_str));
    }
    out
}

fn push_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

fn infer_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(n) = Number::from_f64(float) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Split raw text into records of cells, honouring double-quoted fields.
/// Records made only of whitespace are dropped.
fn split_records(raw: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 0;
    let mut chars = raw.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push(c);
                }
                _ => cell.push(c),
            }
            continue;
        }

        match c {
            '"' if cell.trim().is_empty() => {
                cell.clear();
                in_quotes = true;
                quote_line = line;
            }
            ',' => record.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                line += 1;
                record.push(std::mem::take(&mut cell));
                flush_record(&mut records, std::mem::take(&mut record));
            }
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote { line: quote_line });
    }

    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        flush_record(&mut records, record);
    }

    Ok(records)
}

fn flush_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    if record.iter().all(|c| c.trim().is_empty()) {
        return;
    }
    records.push(record);
}
