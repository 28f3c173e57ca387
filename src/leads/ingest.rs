//! CSV ingestion: uploaded bytes into a [`RecordSet`].

use std::collections::HashMap;

use tracing::{debug, warn};

use super::record::{ColumnKind, FieldValue, INDUSTRY, Lead, RecordSet};
use crate::error::IngestError;

/// Extensions accepted for upload, compared case-insensitively.
const TABULAR_EXTENSIONS: &[&str] = &["csv"];

/// Reject uploads whose file name doesn't carry a tabular extension.
///
/// Runs before any byte of the body is parsed.
pub fn ensure_tabular_file(file_name: Option<&str>) -> Result<(), IngestError> {
    let accepted = file_name
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && TABULAR_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
        });

    if accepted {
        Ok(())
    } else {
        warn!(file = ?file_name, "Rejected upload: not a CSV file");
        Err(IngestError::InvalidInputFormat {
            file_name: file_name.map(str::to_string),
        })
    }
}

/// Parse CSV bytes into a record set.
///
/// Rules:
///
/// - The first row is the header; an input without one is rejected.
/// - Duplicate header names are suffixed `.1`, `.2`, ... in order of appearance.
/// - Short rows are padded with empty cells; long rows are rejected.
/// - Each column gets one type from all of its cells (see [`ColumnKind::infer`]);
///   null cells normalize to empty text.
/// - A missing `industry` column is synthesized as empty text on every lead.
pub fn parse_csv(bytes: &[u8]) -> Result<RecordSet, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::Empty);
    }
    let columns = dedupe_headers(headers.iter().map(str::trim));

    let mut rows = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, counting the header as row 1.
        let user_row = row_idx0 + 2;
        let record = result?;
        if record.len() > columns.len() {
            return Err(IngestError::RaggedRow {
                row: user_row,
                expected: columns.len(),
                found: record.len(),
            });
        }
        rows.push(record);
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|idx| ColumnKind::infer(rows.iter().map(|r| r.get(idx).unwrap_or(""))))
        .collect();

    let mut set = RecordSet::new(columns.clone());
    for record in &rows {
        let mut lead = Lead::new();
        for (idx, (column, kind)) in columns.iter().zip(&kinds).enumerate() {
            let raw = record.get(idx).unwrap_or("");
            lead.set(column, FieldValue::from_cell(raw, *kind));
        }
        set.push(lead);
    }

    if !set.has_column(INDUSTRY) {
        warn!("Column 'industry' not found; filling with empty values");
        set.ensure_column(INDUSTRY, FieldValue::default());
    }

    debug!(records = set.len(), columns = set.columns().len(), "Parsed CSV");
    Ok(set)
}

fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        while out.contains(&candidate) {
            let n = seen.entry(name.to_string()).or_insert(0);
            *n += 1;
            candidate = format!("{name}.{n}");
        }
        out.push(candidate);
    }
    out
}
