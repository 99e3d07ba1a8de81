use tracing::debug;

use super::layout::ColumnLayout;
use crate::workflows::requisition::TerminationRecord;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("termination file is empty or holds only a header line")]
    EmptyFile,
    #[error("termination file contained no valid rows")]
    NoValidRecords,
    #[error("malformed termination file: {0}")]
    Malformed(#[from] csv::Error),
}

/// Picks the field delimiter by comparing `;` and `,` counts on the header
/// line. Ties favor the comma.
fn detect_delimiter(header: &str) -> u8 {
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parses a termination export into typed records.
///
/// Pure function of the input text: sniffs the delimiter from the header,
/// splits rows with quote-aware field handling, maps fixed column positions
/// through [`ColumnLayout::V1`], and drops rows missing an external id or a
/// full name. Restartable; holds no state between calls.
pub fn parse_termination_file(input: &str) -> Result<Vec<TerminationRecord>, ParseError> {
    let mut lines = input.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(ParseError::EmptyFile)?;
    if lines.next().is_none() {
        return Err(ParseError::EmptyFile);
    }

    let delimiter = detect_delimiter(header);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let layout = ColumnLayout::V1;
    let mut records = Vec::new();
    for (row_index, row) in reader.records().enumerate() {
        let row = row?;
        let fields: Vec<&str> = row.iter().collect();
        if fields.iter().all(|field| field.is_empty()) {
            continue;
        }

        let record = layout.record_from_fields(&fields);
        if record.is_identifiable() {
            records.push(record);
        } else {
            // Row numbers are 1-based and count the header.
            debug!(row = row_index + 2, "dropping row without external id or full name");
        }
    }

    if records.is_empty() {
        return Err(ParseError::NoValidRecords);
    }

    Ok(records)
}
