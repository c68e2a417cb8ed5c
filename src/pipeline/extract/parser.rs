use serde_json::Value;

use super::LlmError;
use crate::models::ExtractionRecord;

/// Parse a model response into a flat extraction record.
///
/// Models wrap JSON in Markdown fences often enough that the fence is
/// stripped before parsing. The top level must be a JSON object; its
/// entries are coerced leniently — numbers and booleans become strings,
/// while nulls and nested structures are skipped rather than failing
/// the whole record. Insertion order is the model's output order.
pub fn parse_flat_record(response: &str) -> Result<ExtractionRecord, LlmError> {
    let json_str = strip_code_fence(response);

    let parsed: Value = serde_json::from_str(json_str)
        .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

    let object = parsed
        .as_object()
        .ok_or_else(|| LlmError::ResponseParsing("top level is not a JSON object".into()))?;

    let mut record = ExtractionRecord::new();
    for (key, value) in object {
        let coerced = match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    continue;
                }
                trimmed.to_string()
            }
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            // Null and nested values carry no usable flat field.
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        record.insert(key, coerced);
    }

    Ok(record)
}

/// Strip a surrounding Markdown code fence (```json ... ``` or
/// ``` ... ```) if present; otherwise return the trimmed input.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}
