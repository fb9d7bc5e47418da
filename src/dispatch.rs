//! Per-tool orchestration.
//!
//! A call resolves its tool, renders the prompt sections, invokes the
//! completion backend with merged settings, guards structured output and
//! formats it. Every failure is turned into a failed [`ToolReply`]; the
//! dispatcher never returns an error to the protocol layer.

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::{CodexError, Completion};
use crate::config::ReasoningEffort;
use crate::request::RequestOptions;
use crate::structured::{guard, Guarded};
use crate::tools::{self, Section, ToolSpec, ARG_MAX_TOKENS, ARG_REASONING_EFFORT, ARG_STREAM};

/// How a reply's text was produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// Structured output was parsed and formatted.
    Structured,
    /// Structured output was requested but not honoured; raw text returned.
    Fallback,
    /// The call failed; text carries the error message.
    Failed,
}

/// Result of a tool invocation as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub is_error: bool,
    pub kind: OutputKind,
}

impl ToolReply {
    fn ok(text: String, kind: OutputKind) -> Self {
        Self {
            text,
            is_error: false,
            kind,
        }
    }

    fn failed(error: &CodexError) -> Self {
        Self {
            text: format!("Error: {}", error),
            is_error: true,
            kind: OutputKind::Failed,
        }
    }
}

/// Per-call overrides parsed from the argument mapping.
#[derive(Debug, Default, PartialEq, Eq)]
struct CallOverrides {
    reasoning_effort: Option<ReasoningEffort>,
    max_tokens: Option<u32>,
    stream: bool,
}

impl CallOverrides {
    fn from_args(args: &Map<String, Value>) -> Result<Self, CodexError> {
        let mut overrides = CallOverrides::default();

        match args.get(ARG_REASONING_EFFORT) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                overrides.reasoning_effort = Some(
                    s.parse()
                        .map_err(|e| CodexError::InvalidArguments(format!("{}", e)))?,
                );
            }
            Some(_) => return Err(invalid_type(ARG_REASONING_EFFORT, "a string")),
        }

        match args.get(ARG_MAX_TOKENS) {
            None | Some(Value::Null) => {}
            Some(value) => {
                let tokens = value
                    .as_u64()
                    .filter(|n| *n > 0)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| invalid_type(ARG_MAX_TOKENS, "a positive integer"))?;
                overrides.max_tokens = Some(tokens);
            }
        }

        match args.get(ARG_STREAM) {
            None | Some(Value::Null) => {}
            Some(Value::Bool(stream)) => overrides.stream = *stream,
            Some(_) => return Err(invalid_type(ARG_STREAM, "a boolean")),
        }

        Ok(overrides)
    }
}

fn invalid_type(arg: &str, expected: &str) -> CodexError {
    CodexError::InvalidArguments(format!("{} must be {}", arg, expected))
}

/// Render the non-blank sections as `## heading\nbody`, in declaration
/// order, separated by blank lines.
pub fn render_sections(sections: &[Section], args: &Map<String, Value>) -> Result<String, CodexError> {
    let mut rendered = Vec::with_capacity(sections.len());

    for section in sections {
        let body = match args.get(section.arg) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
            Some(_) => return Err(invalid_type(section.arg, "a string")),
        };

        match body {
            Some(body) => rendered.push(format!("## {}\n{}", section.heading, body)),
            None if section.required => {
                return Err(CodexError::InvalidArguments(format!(
                    "missing required argument: {}",
                    section.arg
                )))
            }
            None => {}
        }
    }

    Ok(rendered.into_iter().join("\n\n"))
}

/// Routes tool calls to the completion backend.
pub struct Dispatcher<C> {
    client: C,
}

impl<C: Completion> Dispatcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run a tool call. Never fails; errors are reported in the reply.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> ToolReply {
        match self.try_dispatch(name, args).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                ToolReply::failed(&e)
            }
        }
    }

    async fn try_dispatch(&self, name: &str, args: &Map<String, Value>) -> Result<ToolReply, CodexError> {
        let tool = tools::find(name).ok_or_else(|| CodexError::UnknownTool(name.to_string()))?;
        let options = Self::request_options(tool, args)?;

        info!(
            "Calling {} (stream={}, effort={:?})",
            tool.name, options.stream, options.reasoning_effort
        );
        let text = self.client.complete(options).await?;

        let output = tool.output;
        match guard(text, output.required) {
            Guarded::Structured(map) => {
                debug!("{} returned structured output", tool.name);
                Ok(ToolReply::ok((output.formatter)(&map), OutputKind::Structured))
            }
            Guarded::Unstructured(raw) => {
                warn!("{} output did not match {}, returning raw text", tool.name, output.name);
                Ok(ToolReply::ok(raw, OutputKind::Fallback))
            }
        }
    }

    /// Merge call overrides with the tool's defaults. Process defaults are
    /// applied later, when the request body is built.
    fn request_options(tool: &ToolSpec, args: &Map<String, Value>) -> Result<RequestOptions, CodexError> {
        let input = render_sections(tool.sections, args)?;
        let overrides = CallOverrides::from_args(args)?;

        Ok(RequestOptions {
            instructions: tool.instructions.to_string(),
            input,
            output_schema: Some(tool.output.output_schema()),
            reasoning_effort: overrides.reasoning_effort.or(tool.reasoning_effort),
            max_tokens: overrides.max_tokens,
            stream: overrides.stream,
        })
    }
}
