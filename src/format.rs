//! Markdown rendering of structured tool results.
//!
//! Formatters are pure and tolerant: absent or mistyped optional fields are
//! skipped rather than reported.

use itertools::Itertools;
use serde_json::{Map, Value};

fn text<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn code<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn items<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn bullet_list(values: &[Value]) -> Option<String> {
    let list = values
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("- {}", s.trim()))
        .join("\n");
    (!list.is_empty()).then_some(list)
}

fn code_block(language: Option<&str>, body: &str) -> String {
    let body = body.trim_end().trim_start_matches('\n');
    format!("```{}\n{}\n```", language.unwrap_or_default(), body)
}

fn section(heading: &str, body: String) -> String {
    format!("## {}\n\n{}", heading, body)
}

pub fn generate(map: &Map<String, Value>) -> String {
    let mut parts = vec![code_block(
        text(map, "language"),
        code(map, "code"),
    )];
    if let Some(explanation) = text(map, "explanation") {
        parts.push(explanation.to_string());
    }
    parts.join("\n\n")
}

pub fn review(map: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    if let Some(summary) = text(map, "summary") {
        parts.push(section("Summary", summary.to_string()));
    }

    let issues = items(map, "issues")
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .map(|(i, issue)| {
            let severity = text(issue, "severity").unwrap_or("info").to_uppercase();
            let mut line = format!("{}. **[{}]**", i + 1, severity);
            if let Some(location) = text(issue, "location") {
                line.push_str(&format!(" `{}`", location));
            }
            if let Some(description) = text(issue, "description") {
                line.push_str(&format!(": {}", description));
            }
            if let Some(suggestion) = text(issue, "suggestion") {
                line.push_str(&format!("\n   - Suggestion: {}", suggestion));
            }
            line
        })
        .join("\n");
    let issues = if issues.is_empty() {
        "No issues found.".to_string()
    } else {
        issues
    };
    parts.push(section("Issues", issues));

    if let Some(strengths) = bullet_list(items(map, "strengths")) {
        parts.push(section("Strengths", strengths));
    }
    parts.join("\n\n")
}

pub fn test(map: &Map<String, Value>) -> String {
    let framework = text(map, "framework");
    let mut parts = Vec::new();
    if let Some(framework) = framework {
        parts.push(format!("**Framework:** {}", framework));
    }
    parts.push(code_block(None, code(map, "tests")));
    if let Some(cases) = bullet_list(items(map, "cases")) {
        parts.push(section("Covered Cases", cases));
    }
    parts.join("\n\n")
}

pub fn convert(map: &Map<String, Value>) -> String {
    let mut parts = vec![code_block(
        text(map, "target_language"),
        code(map, "converted_code"),
    )];
    if let Some(notes) = bullet_list(items(map, "notes")) {
        parts.push(section("Conversion Notes", notes));
    }
    parts.join("\n\n")
}

pub fn architect(map: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    if let Some(overview) = text(map, "overview") {
        parts.push(section("Overview", overview.to_string()));
    }

    let components = items(map, "components")
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|c| {
            let name = text(c, "name")?;
            Some(match text(c, "responsibility") {
                Some(responsibility) => format!("- **{}**: {}", name, responsibility),
                None => format!("- **{}**", name),
            })
        })
        .join("\n");
    if !components.is_empty() {
        parts.push(section("Components", components));
    }

    if let Some(flow) = text(map, "data_flow") {
        parts.push(section("Data Flow", flow.to_string()));
    }
    if let Some(risks) = bullet_list(items(map, "risks")) {
        parts.push(section("Risks", risks));
    }
    parts.join("\n\n")
}
