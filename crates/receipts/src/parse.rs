use std::collections::BTreeMap;

use serde_json::{Map, Value, value::RawValue};

use crate::{Draft, ExtractionError};

/// Removes markdown code fences (and their `json` tag) from a model answer.
///
/// Applying it twice yields the same text as applying it once.
pub fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("```") {
        out.push_str(&rest[..start]);
        rest = &rest[start + 3..];
        if rest.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            rest = &rest[4..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Returns the first balanced `{...}` of `text`.
///
/// Braces inside JSON strings (escapes included) are not counted.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Turns a raw model answer into a draft.
///
/// The object must be well-formed JSON, but each field is decoded on its
/// own: a value that cannot be represented (e.g. `1e400`) becomes null.
pub fn parse_draft(text: &str) -> Result<Draft, ExtractionError> {
    let cleaned = strip_code_fences(text);
    let candidate = extract_json_object(&cleaned)
        .ok_or_else(|| ExtractionError::Parse("no JSON object in model answer".to_string()))?;
    let fields: BTreeMap<String, Box<RawValue>> = serde_json::from_str(candidate)
        .map_err(|err| ExtractionError::Parse(err.to_string()))?;
    let object: Map<String, Value> = fields
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw.get()).unwrap_or(Value::Null);
            (key, value)
        })
        .collect();
    Ok(Draft::from_object(&object))
}
