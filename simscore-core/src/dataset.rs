//! Dataset loading from JSON Lines, JSON array or CSV files.

use serde_json::{Value, json};
use std::path::Path;
use tracing::info;

use crate::error::{DatasetError, SimscoreError};
use crate::types::Record;

const BOM: char = '\u{feff}';

/// Load and validate records from a `.jsonl`, `.json` or `.csv` file.
pub fn load_records(path: &Path) -> Result<Vec<Record>, SimscoreError> {
    if !path.exists() {
        return Err(DatasetError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match extension.as_deref() {
        Some("jsonl") => parse_jsonl(path, &content)?,
        Some("json") => parse_json(path, &content)?,
        Some("csv") => parse_csv(path, &content)?,
        _ => {
            return Err(DatasetError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
            .into());
        }
    };

    for record in &records {
        record.validate()?;
    }

    info!(path = %path.display(), records = records.len(), "Loaded dataset");
    Ok(records)
}

/// Parse one record per non-blank line.
pub fn parse_jsonl(path: &Path, content: &str) -> Result<Vec<Record>, DatasetError> {
    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim_start_matches(BOM).trim();
        if line.is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(line).map_err(|e| DatasetError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Parse a top-level JSON array of records.
pub fn parse_json(path: &Path, content: &str) -> Result<Vec<Record>, DatasetError> {
    serde_json::from_str(content.trim_start_matches(BOM)).map_err(|e| DatasetError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        message: e.to_string(),
    })
}

/// Parse a CSV file with a header row.
///
/// `id` and `candidate` columns are required; `reference` (or `references`)
/// and `tags` are optional. Reference and tag cells may hold a JSON list,
/// otherwise tags are comma-separated. A candidate cell holding a JSON
/// object is read as named variants.
pub fn parse_csv(path: &Path, content: &str) -> Result<Vec<Record>, DatasetError> {
    let parse_error = |line: usize, message: String| DatasetError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.trim_start_matches(BOM).as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| parse_error(csv_line(&e), e.to_string()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let id_col = column("id").ok_or_else(|| parse_error(1, "missing 'id' column".into()))?;
    let candidate_col =
        column("candidate").ok_or_else(|| parse_error(1, "missing 'candidate' column".into()))?;
    let reference_col = column("reference").or_else(|| column("references"));
    let tags_col = column("tags");

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| parse_error(csv_line(&e), e.to_string()))?;
        let line = row.position().map_or(0, |p| p.line() as usize);
        let cell = |col: Option<usize>| col.and_then(|c| row.get(c)).unwrap_or("");

        let value = json!({
            "id": cell(Some(id_col)),
            "reference": list_cell(cell(reference_col)),
            "candidate": candidate_cell(cell(Some(candidate_col))),
            "tags": tags_cell(cell(tags_col)),
        });
        let record: Record =
            serde_json::from_value(value).map_err(|e| parse_error(line, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

fn csv_line(err: &csv::Error) -> usize {
    err.position().map_or(0, |p| p.line() as usize)
}

fn json_list(cell: &str) -> Option<Value> {
    if !cell.starts_with('[') {
        return None;
    }
    serde_json::from_str::<Value>(cell)
        .ok()
        .filter(Value::is_array)
}

fn list_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    json_list(cell).unwrap_or_else(|| Value::String(cell.to_string()))
}

fn tags_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if let Some(list) = json_list(cell) {
        return list;
    }
    Value::Array(
        cell.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Value::String(t.to_string()))
            .collect(),
    )
}

fn candidate_cell(cell: &str) -> Value {
    if cell.trim_start().starts_with('{')
        && let Ok(map @ Value::Object(_)) = serde_json::from_str::<Value>(cell)
    {
        return map;
    }
    Value::String(cell.to_string())
}
