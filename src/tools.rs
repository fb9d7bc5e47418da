//! Static tool registry.
//!
//! Each tool maps to fixed instructions, an ordered list of input sections,
//! an optional structured-output descriptor and an optional default
//! reasoning effort.

use serde_json::{json, Map, Value};

use crate::config::ReasoningEffort;
use crate::format;
use crate::request::OutputSchema;
use crate::structured::{FieldKind, RequiredField};

/// A named input argument rendered as a `## heading` section of the prompt.
#[derive(Debug, Copy, Clone)]
pub struct Section {
    pub arg: &'static str,
    pub heading: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl Section {
    const fn required(arg: &'static str, heading: &'static str, description: &'static str) -> Self {
        Self {
            arg,
            heading,
            description,
            required: true,
        }
    }

    const fn optional(arg: &'static str, heading: &'static str, description: &'static str) -> Self {
        Self {
            arg,
            heading,
            description,
            required: false,
        }
    }
}

/// Structured-output descriptor for a tool.
#[derive(Copy, Clone)]
pub struct StructuredOutput {
    pub name: &'static str,
    /// Fields the guard checks before treating output as structured.
    pub required: &'static [RequiredField],
    schema: fn() -> Value,
    /// Renders a structured result as display text.
    pub formatter: fn(&Map<String, Value>) -> String,
}

impl StructuredOutput {
    pub fn output_schema(&self) -> OutputSchema {
        OutputSchema::new(self.name, (self.schema)())
    }
}

#[derive(Copy, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub instructions: &'static str,
    pub sections: &'static [Section],
    pub output: StructuredOutput,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Per-call override arguments accepted by every tool.
pub const ARG_REASONING_EFFORT: &str = "reasoning_effort";
pub const ARG_MAX_TOKENS: &str = "max_tokens";
pub const ARG_STREAM: &str = "stream";

pub static TOOLS: [ToolSpec; 5] = [GENERATE, REVIEW, TEST, CONVERT, ARCHITECT];

/// Look up a tool by name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

impl ToolSpec {
    /// JSON schema describing the tool's arguments.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        for section in self.sections {
            properties.insert(
                section.arg.to_string(),
                json!({ "type": "string", "description": section.description }),
            );
        }
        properties.insert(
            ARG_REASONING_EFFORT.to_string(),
            json!({
                "type": "string",
                "enum": ReasoningEffort::ALL.iter().map(|e| e.as_str()).collect::<Vec<_>>(),
                "description": "Override how much reasoning the model applies"
            }),
        );
        properties.insert(
            ARG_MAX_TOKENS.to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "Override the maximum number of output tokens"
            }),
        );
        properties.insert(
            ARG_STREAM.to_string(),
            json!({
                "type": "boolean",
                "description": "Stream the completion from the backend"
            }),
        );

        let required: Vec<&str> = self
            .sections
            .iter()
            .filter(|s| s.required)
            .map(|s| s.arg)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema.insert("required".to_string(), json!(required));
        schema
    }
}

const LANGUAGE: Section =
    Section::optional("language", "Language", "Programming language (e.g. typescript, python, rust)");

pub const GENERATE: ToolSpec = ToolSpec {
    name: "codex_generate",
    description: "Generate code from a natural language description. Use this for new functions, modules or features.",
    instructions: "You are an expert software engineer. Write complete, idiomatic, production-quality code \
that fulfils the task. Follow the conventions of the requested language and any project context given. \
Return the code together with a short explanation of the approach.",
    sections: &[
        Section::required("prompt", "Task", "Natural language description of the code to generate"),
        LANGUAGE,
        Section::optional("context", "Project Context", "Existing code, dependencies or requirements to respect"),
    ],
    output: StructuredOutput {
        name: "generated_code",
        required: &[RequiredField::new("code", FieldKind::String)],
        schema: generate_schema,
        formatter: format::generate,
    },
    reasoning_effort: None,
};

pub const REVIEW: ToolSpec = ToolSpec {
    name: "codex_review",
    description: "Review code for bugs, security problems, performance and maintainability issues.",
    instructions: "You are a meticulous senior code reviewer. Identify correctness bugs, security \
vulnerabilities, performance problems and maintainability issues. Rate each issue by severity, point \
to where it occurs and suggest a concrete fix. Mention notable strengths briefly.",
    sections: &[
        Section::required("code", "Code", "The code to review"),
        LANGUAGE,
        Section::optional("focus", "Focus", "Aspect to concentrate on (e.g. security, performance)"),
    ],
    output: StructuredOutput {
        name: "code_review",
        required: &[
            RequiredField::new("summary", FieldKind::String),
            RequiredField::new("issues", FieldKind::Array),
        ],
        schema: review_schema,
        formatter: format::review,
    },
    reasoning_effort: Some(ReasoningEffort::High),
};

pub const TEST: ToolSpec = ToolSpec {
    name: "codex_test",
    description: "Write unit tests for existing code, covering normal behaviour and edge cases.",
    instructions: "You are an expert in software testing. Write thorough, runnable unit tests for the \
given code using the requested framework, or the idiomatic default for the language. Cover normal \
behaviour, edge cases and error paths. List the cases you covered.",
    sections: &[
        Section::required("code", "Code", "The code to test"),
        LANGUAGE,
        Section::optional("framework", "Test Framework", "Testing framework to use (e.g. jest, pytest)"),
        Section::optional("focus", "Coverage Focus", "Behaviour or edge cases to prioritise"),
    ],
    output: StructuredOutput {
        name: "generated_tests",
        required: &[RequiredField::new("tests", FieldKind::String)],
        schema: test_schema,
        formatter: format::test,
    },
    reasoning_effort: None,
};

pub const CONVERT: ToolSpec = ToolSpec {
    name: "codex_convert",
    description: "Convert code from one programming language or framework to another.",
    instructions: "You are an expert polyglot programmer. Translate the code into the target language, \
preserving behaviour while using the target language's idioms and standard library. Note any \
behavioural differences or dependencies the reader must know about.",
    sections: &[
        Section::required("code", "Code", "The code to convert"),
        Section::optional("from", "Source Language", "Language the code is written in"),
        Section::required("to", "Target Language", "Language or framework to convert to"),
        Section::optional("notes", "Notes", "Additional conversion requirements"),
    ],
    output: StructuredOutput {
        name: "converted_code",
        required: &[RequiredField::new("converted_code", FieldKind::String)],
        schema: convert_schema,
        formatter: format::convert,
    },
    reasoning_effort: Some(ReasoningEffort::Low),
};

pub const ARCHITECT: ToolSpec = ToolSpec {
    name: "codex_architect",
    description: "Design a software architecture for a set of requirements.",
    instructions: "You are a pragmatic software architect. Propose an architecture that satisfies the \
requirements and constraints: give an overview, the main components and their responsibilities, how \
data flows between them, and the key risks with mitigations.",
    sections: &[
        Section::required("requirements", "Requirements", "What the system must do"),
        Section::optional("constraints", "Constraints", "Technical, budget or operational constraints"),
        Section::optional("context", "Existing System", "Description of the current system, if any"),
    ],
    output: StructuredOutput {
        name: "architecture",
        required: &[
            RequiredField::new("overview", FieldKind::String),
            RequiredField::new("components", FieldKind::Array),
        ],
        schema: architect_schema,
        formatter: format::architect,
    },
    reasoning_effort: Some(ReasoningEffort::High),
};

/// Strict-mode object schema: every property required, nothing extra.
fn object(properties: Value) -> Value {
    let required: Vec<String> = properties
        .as_object()
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn generate_schema() -> Value {
    object(json!({
        "language": { "type": "string" },
        "code": { "type": "string" },
        "explanation": { "type": "string" }
    }))
}

fn review_schema() -> Value {
    object(json!({
        "summary": { "type": "string" },
        "issues": {
            "type": "array",
            "items": object(json!({
                "severity": { "type": "string", "enum": ["critical", "major", "minor", "info"] },
                "location": { "type": "string" },
                "description": { "type": "string" },
                "suggestion": { "type": "string" }
            }))
        },
        "strengths": string_array()
    }))
}

fn test_schema() -> Value {
    object(json!({
        "framework": { "type": "string" },
        "tests": { "type": "string" },
        "cases": string_array()
    }))
}

fn convert_schema() -> Value {
    object(json!({
        "target_language": { "type": "string" },
        "converted_code": { "type": "string" },
        "notes": string_array()
    }))
}

fn architect_schema() -> Value {
    object(json!({
        "overview": { "type": "string" },
        "components": {
            "type": "array",
            "items": object(json!({
                "name": { "type": "string" },
                "responsibility": { "type": "string" }
            }))
        },
        "data_flow": { "type": "string" },
        "risks": string_array()
    }))
}
