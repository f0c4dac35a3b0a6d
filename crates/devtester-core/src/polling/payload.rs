// ── Payload formatting ──

use serde_json::Value;

use crate::error::CoreError;

/// Shown in place of a blank dynamic payload.
pub const EMPTY_DYNAMIC_PAYLOAD: &str = "Dynamic data is empty.";

/// Pretty-print a JSON payload.
pub fn pretty_json(raw: &str) -> Result<String, CoreError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| CoreError::MalformedPayload {
        message: e.to_string(),
    })?;
    serde_json::to_string_pretty(&value).map_err(|e| CoreError::MalformedPayload {
        message: e.to_string(),
    })
}

/// Text displayed for a dynamic payload. Malformed input becomes an error
/// string rather than a failure.
pub fn format_dynamic(raw: &str) -> String {
    if raw.trim().is_empty() {
        return EMPTY_DYNAMIC_PAYLOAD.to_owned();
    }
    match pretty_json(raw) {
        Ok(pretty) => pretty,
        Err(CoreError::MalformedPayload { message }) => {
            format!("Error parsing dynamic JSON: {message}")
        }
        Err(other) => format!("Error parsing dynamic JSON: {other}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reformats_compact_json() {
        assert_eq!(
            format_dynamic(r#"{"fans":[1,2]}"#),
            "{\n  \"fans\": [\n    1,\n    2\n  ]\n}"
        );
    }

    #[test]
    fn blank_payload_has_placeholder() {
        assert_eq!(format_dynamic("  \n"), EMPTY_DYNAMIC_PAYLOAD);
    }

    #[test]
    fn malformed_payload_becomes_message() {
        let shown = format_dynamic("{not json");
        assert!(shown.starts_with("Error parsing dynamic JSON: "), "{shown}");
    }
}
