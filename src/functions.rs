//! Textual serialization of tool definitions for token counting
//!
//! GPT-style prompt templates inline function definitions as a compact
//! TypeScript-namespace declaration rather than raw JSON. Counting tokens for
//! a tools block therefore means rendering that exact text and encoding it.
//! The grammar:
//!
//! ```text
//! namespace functions {
//!
//! // Search the knowledge base
//! type search = (_: {
//! // Free-text query
//! query: string,
//! top?: number,
//! }) => any;
//!
//! } // namespace functions
//! ```
//!
//! Descriptions become `//` comments (omitted below nesting depth 2),
//! non-required properties get a `?`, and JSON-schema types map onto the
//! TypeScript-ish `string | number | boolean | null | any | T[] | { .. }`
//! forms, with enums rendered as literal unions.

use crate::types::ToolDefinition;
use serde_json::Value;

/// Render the function-definition block for a tool list.
///
/// Deterministic for a given input; the output is consumed by the
/// system/tools accountant and never sent anywhere.
pub fn format_function_definitions(tools: &[ToolDefinition]) -> String {
    let mut lines = vec!["namespace functions {".to_string(), String::new()];

    for tool in tools {
        let function = &tool.function;
        if let Some(description) = non_empty(function.description.as_deref()) {
            lines.push(format!("// {description}"));
        }
        match function.parameters.as_ref() {
            Some(parameters) if has_properties(parameters) => {
                lines.push(format!("type {} = (_: {{", function.name));
                lines.push(format_object_properties(parameters, 0));
                lines.push("}) => any;".to_string());
            }
            _ => {
                lines.push(format!("type {} = () => any;", function.name));
            }
        }
        lines.push(String::new());
    }

    lines.push("} // namespace functions".to_string());
    lines.join("\n")
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

fn has_properties(parameters: &Value) -> bool {
    parameters
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|properties| !properties.is_empty())
}

fn format_object_properties(parameters: &Value, indent: usize) -> String {
    let Some(properties) = parameters.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    let required: Vec<&str> = parameters
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut lines = Vec::new();
    for (name, param) in properties {
        if indent < 2 {
            if let Some(description) = non_empty(param.get("description").and_then(Value::as_str))
            {
                lines.push(format!("// {description}"));
            }
        }
        let marker = if required.contains(&name.as_str()) { "" } else { "?" };
        lines.push(format!("{name}{marker}: {},", format_type(param, indent)));
    }

    lines
        .iter()
        .map(|line| format!("{}{line}", " ".repeat(indent)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_type(param: &Value, indent: usize) -> String {
    match param.get("type").and_then(Value::as_str) {
        Some("string") => match param.get("enum").and_then(Value::as_array) {
            Some(values) => values
                .iter()
                .filter_map(Value::as_str)
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(" | "),
            None => "string".to_string(),
        },
        Some("integer") | Some("number") => match param.get("enum").and_then(Value::as_array) {
            Some(values) => values
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
            None => "number".to_string(),
        },
        Some("array") => match param.get("items") {
            Some(items) => format!("{}[]", format_type(items, indent)),
            None => "any[]".to_string(),
        },
        Some("object") => format!("{{\n{}\n}}", format_object_properties(param, indent + 2)),
        Some("boolean") => "boolean".to_string(),
        Some("null") => "null".to_string(),
        _ => "any".to_string(),
    }
}
