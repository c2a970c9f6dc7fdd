//! Parse extraction service responses into raw records

use crate::{ExtractedRecord, ExtractionError};
use serde_json::Value;
use tracing::debug;

/// Object keys under which the service may wrap its record array
pub const RECORD_LIST_KEYS: &[&str] = &["policies", "polizas", "records", "data", "results"];

/// Parse a response body into extracted records
///
/// Accepts a bare JSON array, or an object holding the array under one of
/// [`RECORD_LIST_KEYS`]. Empty bodies, non-JSON bodies, other JSON values and
/// empty arrays are all upstream failures.
pub fn parse_response(body: &str) -> Result<Vec<ExtractedRecord>, ExtractionError> {
    let json_str = strip_code_fence(body);
    if json_str.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let json: Value = serde_json::from_str(json_str)
        .map_err(|e| ExtractionError::MalformedResponse(format!("JSON parse error: {}", e)))?;

    let records = match json {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let key = RECORD_LIST_KEYS
                .iter()
                .find(|key| obj.get(**key).is_some_and(Value::is_array))
                .ok_or_else(|| {
                    ExtractionError::MalformedResponse(format!(
                        "Expected an array or an object with one of {:?}",
                        RECORD_LIST_KEYS
                    ))
                })?;
            debug!("Records wrapped under '{}'", key);
            match obj.remove(*key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => {
            return Err(ExtractionError::MalformedResponse(format!(
                "Expected JSON array or object, got {}",
                json_type_name(&other)
            )))
        }
    };

    if records.is_empty() {
        return Err(ExtractionError::NoRecordsReturned);
    }

    Ok(records.into_iter().map(ExtractedRecord::new).collect())
}

/// Strip a markdown code fence some upstream versions wrap the JSON in
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return "",
    };
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
