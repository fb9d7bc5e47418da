//! Outbound request model for the Responses endpoint.

use serde::Serialize;
use serde_json::Value;

use crate::config::{ClientConfig, ReasoningEffort};

/// JSON-schema descriptor asking the model to emit conforming output.
///
/// Enforcement by the backend is best-effort.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

/// Per-call request options. Overrides win over [`ClientConfig`] defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// System instructions passed to the model.
    pub instructions: String,

    /// User input text.
    pub input: String,

    pub output_schema: Option<OutputSchema>,

    pub reasoning_effort: Option<ReasoningEffort>,

    pub max_tokens: Option<u32>,

    pub stream: bool,
}

impl RequestOptions {
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub instructions: String,
    pub input: Vec<InputMessage>,
    pub max_output_tokens: u32,
    pub store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextConfig {
    pub format: TextFormat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextFormat {
    JsonSchema {
        name: String,
        strict: bool,
        schema: Value,
    },
}

impl ResponsesRequest {
    /// Assemble the request body from process configuration and call options.
    pub fn build(config: &ClientConfig, options: &RequestOptions) -> Self {
        let effort = options.reasoning_effort.or(config.reasoning_effort);

        ResponsesRequest {
            model: config.model.clone(),
            instructions: options.instructions.clone(),
            input: vec![InputMessage {
                role: "user",
                content: options.input.clone(),
            }],
            max_output_tokens: options.max_tokens.unwrap_or(config.max_tokens),
            store: false,
            reasoning: effort.map(|effort| Reasoning { effort }),
            text: options.output_schema.as_ref().map(|s| TextConfig {
                format: TextFormat::JsonSchema {
                    name: s.name.clone(),
                    strict: s.strict,
                    schema: s.schema.clone(),
                },
            }),
            stream: options.stream.then_some(true),
        }
    }
}
