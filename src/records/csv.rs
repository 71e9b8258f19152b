use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::{normalize, Dataset, FieldValue, Record, RowWidthMismatch};
use crate::error::{DashboardError, Result};

/// Parser knobs. Only the delimiter is configurable; quoting always uses `"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CsvOptions {
    /// Single ASCII byte.
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Parse comma-delimited text into records, discarding warnings.
pub fn parse(text: &str) -> Result<Vec<Record>> {
    parse_with(text, &CsvOptions::default()).map(Dataset::into_records)
}

/// Parse delimited text into a [`Dataset`].
///
/// Blank lines are skipped everywhere. The first remaining line is the
/// header; every later line becomes one record with exactly the header's
/// field names. Short rows are padded with [`FieldValue::Missing`], long
/// rows lose their extra cells and produce a [`RowWidthMismatch`].
pub fn parse_with(text: &str, opts: &CsvOptions) -> Result<Dataset> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| DashboardError::MalformedHeader("input has no header row".into()))?;
    let headers = parse_header(header_line, opts.delimiter)?;
    debug!(columns = headers.len(), "parsed header");

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for (idx, line) in lines {
        let cells = split_row(line, opts.delimiter)?;
        if cells.len() > headers.len() {
            let mismatch = RowWidthMismatch {
                line: idx + 1,
                expected: headers.len(),
                found: cells.len(),
            };
            warn!(%mismatch, "row wider than header");
            warnings.push(mismatch);
        }

        let mut cells = cells.into_iter();
        let record: Record = headers
            .iter()
            .map(|name| {
                let value = cells
                    .next()
                    .map(|cell| normalize(&cell))
                    .unwrap_or(FieldValue::Missing);
                (name.clone(), value)
            })
            .collect();
        records.push(record);
    }

    Ok(Dataset {
        headers,
        records,
        warnings,
    })
}

fn parse_header(line: &str, delimiter: u8) -> Result<Vec<String>> {
    let headers: Vec<String> = split_row(line, delimiter)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut seen = HashSet::with_capacity(headers.len());
    for (i, name) in headers.iter().enumerate() {
        if name.is_empty() {
            return Err(DashboardError::MalformedHeader(format!(
                "column {} has an empty name",
                i + 1
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(DashboardError::MalformedHeader(format!(
                "duplicate column `{}`",
                name
            )));
        }
    }
    Ok(headers)
}

/// Split one line into raw cells with the `csv` tokenizer.
///
/// A cell opening with `"` is quoted: the delimiter is literal inside it and
/// `""` stands for one quote. A quote anywhere else, including after leading
/// whitespace, is an ordinary character. Cells are not trimmed.
pub fn split_row(line: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(vec![String::new()]);
    }
    Ok(record.iter().map(str::to_string).collect())
}
