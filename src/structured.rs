//! Structured-output guard.
//!
//! The backend treats the requested output schema as a hint and may ignore
//! it. Extracted text is therefore parsed defensively: anything that is not a
//! JSON object with the expected discriminating fields falls back to the raw
//! text instead of failing the call.

use serde_json::{Map, Value};
use tracing::debug;

/// JSON kind a required field must have.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Array,
    Object,
    Number,
    Bool,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Number => value.is_number(),
            FieldKind::Bool => value.is_boolean(),
        }
    }
}

/// A field that must be present, with the given kind, for output to count
/// as structured.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequiredField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl RequiredField {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Outcome of guarding extracted text.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded {
    Structured(Map<String, Value>),
    /// Raw text, unchanged.
    Unstructured(String),
}

impl Guarded {
    pub fn is_structured(&self) -> bool {
        matches!(self, Guarded::Structured(_))
    }
}

/// Parse `text` as a JSON object. Never fails; non-objects yield `None`.
///
/// A single surrounding markdown code fence is tolerated.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Check `text` against the required fields.
pub fn guard<'a, I>(text: String, required: I) -> Guarded
where
    I: IntoIterator<Item = &'a RequiredField>,
{
    let Some(map) = parse_json_object(&text) else {
        debug!("Output is not a JSON object, passing raw text through");
        return Guarded::Unstructured(text);
    };

    let missing = required
        .into_iter()
        .find(|field| !map.get(field.name).is_some_and(|v| field.kind.matches(v)));

    match missing {
        Some(field) => {
            debug!("Structured output lacks {:?} field {}", field.kind, field.name);
            Guarded::Unstructured(text)
        }
        None => Guarded::Structured(map),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match body.find('\n') {
        Some(pos) => body[pos + 1..].trim(),
        None => trimmed,
    }
}
