// ABOUTME: Recovers a JSON object from free-form model output
// ABOUTME: Fence stripping, whole-text parse, then greedy brace-span fallback
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Response extraction
//!
//! Agents are asked for structured JSON output where the provider supports
//! it, in which case the whole-text parse succeeds immediately. Everything
//! below that is the fallback for models that wrap JSON in prose or code
//! fences. No schema validation happens here.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::ExtractionError;

/// Greedy span from the first `{` to the last `}`, across newlines
static OBJECT_SPAN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// Extract the JSON object embedded in a model response
///
/// # Errors
///
/// - [`ExtractionError::Empty`] for blank input
/// - [`ExtractionError::NoJsonObject`] when no `{...}` span exists
/// - [`ExtractionError::InvalidJson`] when the span does not parse
/// - [`ExtractionError::NotAnObject`] when the text is valid JSON of another type
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::Empty);
    }

    let text = strip_code_fence(trimmed);
    if text.is_empty() {
        return Err(ExtractionError::Empty);
    }

    let whole_kind = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => Some(json_kind(&other)),
        Err(_) => None,
    };

    let Some(span) = OBJECT_SPAN.as_ref().and_then(|re| re.find(text)) else {
        return Err(whole_kind.map_or(ExtractionError::NoJsonObject, ExtractionError::NotAnObject));
    };

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::NotAnObject(json_kind(&other))),
        Err(e) => Err(ExtractionError::InvalidJson(e.to_string())),
    }
}

/// Convenience wrapper returning the object as a `Value`
///
/// # Errors
///
/// Same as [`extract_json_object`].
pub fn extract_json_value(raw: &str) -> Result<Value, ExtractionError> {
    extract_json_object(raw).map(Value::Object)
}

/// Strip a leading ```` ```lang ```` line and a trailing ```` ``` ````
fn strip_code_fence(text: &str) -> &str {
    let mut body = text;
    if body.starts_with("```") {
        body = body.split_once('\n').map_or("", |(_, rest)| rest);
    }
    if let Some(stripped) = body.trim_end().strip_suffix("```") {
        body = stripped;
    }
    body.trim()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
