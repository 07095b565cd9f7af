//! Parameter extraction & validation
//!
//! Extraction is a best-effort regex heuristic over the original prompt;
//! validation is the authoritative gate that refuses to proceed when a
//! required parameter is missing.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::catalog::FunctionDescriptor;
use crate::error::EngineError;

/// Pull candidate values out of the prompt for each declared parameter.
/// Patterns are tried in order per parameter; the first hit wins. Values
/// stay raw strings, no type coercion.
pub fn extract_parameters(prompt: &str, descriptor: &FunctionDescriptor) -> HashMap<String, Value> {
    let mut extracted = HashMap::new();

    for param in &descriptor.parameters {
        let name = regex::escape(&param.name);
        let patterns = [
            // name="value" or name: value
            format!(r#"(?i){}\s*[=:]\s*["']?([^"',\s]+)["']?"#, name),
            // name is value
            format!(r#"(?i){}\s+(?:is|should be|as)\s+["']?([^"',\s]+)["']?"#, name),
            // with a name of value
            format!(
                r#"(?i)with\s+(?:a|the)?\s*{}\s+(?:of|as)\s+["']?([^"',\s]+)["']?"#,
                name
            ),
            // "value" for the name
            format!(
                r#"(?i)["']([^"',\s]+)["']\s+(?:for|as)\s+(?:the)?\s*{}"#,
                name
            ),
        ];

        for pattern in &patterns {
            let Ok(regex) = Regex::new(pattern) else {
                continue;
            };
            if let Some(captures) = regex.captures(prompt) {
                if let Some(value) = captures.get(1) {
                    debug!(param = %param.name, value = value.as_str(), "extracted parameter");
                    extracted.insert(
                        param.name.clone(),
                        Value::String(value.as_str().to_string()),
                    );
                    break;
                }
            }
        }
    }

    extracted
}

/// Keep every extracted value that matches a declared parameter; fail with
/// ALL missing required names at once. No partial set ever escapes a
/// failure.
pub fn validate_parameters(
    descriptor: &FunctionDescriptor,
    provided: &HashMap<String, Value>,
) -> Result<HashMap<String, Value>, EngineError> {
    let mut valid = HashMap::new();
    let mut missing = Vec::new();

    for param in &descriptor.parameters {
        if let Some(value) = provided.get(&param.name) {
            valid.insert(param.name.clone(), value.clone());
        } else if param.required {
            missing.push(param.name.clone());
        }
    }

    if !missing.is_empty() {
        return Err(EngineError::missing(missing));
    }
    Ok(valid)
}
