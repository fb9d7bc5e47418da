//! Response envelope returned by the Responses endpoint, and text extraction.
//!
//! Only the nested `output[].content[]` shape is modelled. Every collection
//! defaults to empty so an unexpected shape fails extraction with
//! [`CodexError::NoContent`] rather than at deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::client::CodexError;

const OUTPUT_TEXT: &str = "output_text";

/// Lifecycle status of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Incomplete,
    Other(String),
}

impl From<String> for ResponseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => ResponseStatus::Queued,
            "in_progress" => ResponseStatus::InProgress,
            "completed" => ResponseStatus::Completed,
            "failed" => ResponseStatus::Failed,
            "cancelled" => ResponseStatus::Cancelled,
            "incomplete" => ResponseStatus::Incomplete,
            _ => ResponseStatus::Other(s),
        }
    }
}

impl From<ResponseStatus> for String {
    fn from(status: ResponseStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseStatus::Queued => "queued",
            ResponseStatus::InProgress => "in_progress",
            ResponseStatus::Completed => "completed",
            ResponseStatus::Failed => "failed",
            ResponseStatus::Cancelled => "cancelled",
            ResponseStatus::Incomplete => "incomplete",
            ResponseStatus::Other(s) => s,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

impl ResponseEnvelope {
    /// Fail unless the response reached `completed`.
    pub fn ensure_completed(&self) -> Result<(), CodexError> {
        match self.status {
            ResponseStatus::Completed => Ok(()),
            ref other => Err(CodexError::UnexpectedStatus(other.to_string())),
        }
    }

    /// Text of the first `output_text` block across all output items.
    ///
    /// Later text blocks are ignored even when present.
    pub fn output_text(&self) -> Result<&str, CodexError> {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .find(|block| block.block_type == OUTPUT_TEXT)
            .and_then(|block| block.text.as_deref())
            .filter(|text| !text.is_empty())
            .ok_or(CodexError::NoContent)
    }

    /// Status check followed by extraction.
    pub fn into_text(self) -> Result<String, CodexError> {
        self.ensure_completed()?;
        self.output_text().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ResponseEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extracts_first_output_text() {
        let resp = envelope(json!({
            "id": "resp_1",
            "status": "completed",
            "output": [
                { "type": "reasoning", "content": [] },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        { "type": "refusal" },
                        { "type": "output_text", "text": "first" },
                        { "type": "output_text", "text": "second" }
                    ]
                },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{ "type": "output_text", "text": "third" }]
                }
            ],
            "usage": { "input_tokens": 10, "output_tokens": 3 }
        }));

        let usage = resp.usage.unwrap();
        assert_eq!((usage.input_tokens, usage.output_tokens), (10, 3));
        assert_eq!(resp.into_text().unwrap(), "first");
    }

    #[test]
    fn test_empty_output_is_no_content() {
        let resp = envelope(json!({ "id": "resp_1", "status": "completed", "output": [] }));
        assert!(matches!(resp.into_text(), Err(CodexError::NoContent)));
    }

    #[test]
    fn test_missing_output_is_no_content() {
        // Legacy flat shape: top-level `content` is not read.
        let resp = envelope(json!({
            "id": "resp_1",
            "status": "completed",
            "content": [{ "type": "output_text", "text": "legacy" }]
        }));
        assert!(matches!(resp.into_text(), Err(CodexError::NoContent)));
    }

    #[test]
    fn test_empty_text_is_no_content() {
        let resp = envelope(json!({
            "id": "resp_1",
            "status": "completed",
            "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "" }] }]
        }));
        assert!(matches!(resp.into_text(), Err(CodexError::NoContent)));
    }

    #[test]
    fn test_non_completed_status_reported_literally() {
        for status in ["in_progress", "failed", "requires_action"] {
            let resp = envelope(json!({
                "id": "resp_1",
                "status": status,
                "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "x" }] }]
            }));
            let err = resp.into_text().unwrap_err();
            assert!(matches!(err, CodexError::UnexpectedStatus(_)));
            assert!(err.to_string().contains(status));
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ResponseStatus::from("in_progress".to_string()), ResponseStatus::InProgress);
        assert_eq!(
            ResponseStatus::from("paused".to_string()),
            ResponseStatus::Other("paused".to_string())
        );
        assert_eq!(ResponseStatus::Incomplete.to_string(), "incomplete");
    }
}
