use std::collections::BTreeMap;
use std::path::Path;

use ablate_core::FileType;
use ablate_pipeline::{PipelineError, PipelineResult};
use serde_json::Value;

/// One source record: column name → value.
pub type Record = BTreeMap<String, Value>;

/// Load records from a file in the configured format.
pub fn load_records(path: &Path, file_type: FileType) -> PipelineResult<Vec<Record>> {
    if !path.exists() {
        return Err(PipelineError::Dataset(format!("records file does not exist: {}", path.display())));
    }
    match file_type {
        FileType::Jsonl => load_jsonl(path),
        FileType::Json => load_json(path),
        FileType::Csv => load_csv(path),
    }
}

fn load_jsonl(path: &Path) -> PipelineResult<Vec<Record>> {
    let contents = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(line).map_err(|e| {
            PipelineError::Dataset(format!(
                "failed to parse record line {} in {}: {}",
                idx + 1,
                path.display(),
                e
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn load_json(path: &Path) -> PipelineResult<Vec<Record>> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        PipelineError::Dataset(format!(
            "{} must be a JSON array of records: {}",
            path.display(),
            e
        ))
    })
}

fn load_csv(path: &Path) -> PipelineResult<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| PipelineError::Dataset(format!("failed to open {}: {}", path.display(), e)))?;
    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Dataset(format!("failed to read csv headers: {e}")))?
        .clone();

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            PipelineError::Dataset(format!("failed to read csv record {}: {}", idx + 1, e))
        })?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// Render a record value the way it appears inside a prompt.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
