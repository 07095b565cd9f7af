//! Code Synthesizer & Invoker
//!
//! Two independent consumers of one matched function + validated argument
//! set. The synthesizer renders presentational source text that is never
//! executed; the invoker resolves the real callable through the catalogue's
//! dispatch table and executes it, capturing any fault. They are separate
//! passes by contract, not an implementation accident.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::catalog::FunctionCatalog;
use crate::matcher::MatchResult;

/// Renders a human-readable program for a matched call.
pub struct CodeSynthesizer;

impl CodeSynthesizer {
    /// Render an import of the target callable, the call expression with
    /// values in declared-parameter order, and a fixed wrapper that prints
    /// the result or reports the error.
    pub fn render(matched: &MatchResult, params: &HashMap<String, Value>) -> String {
        let mut arguments = Vec::new();
        for spec in &matched.parameters {
            if let Some(value) = params.get(&spec.name) {
                arguments.push(format!(
                    "/* {} = */ {}",
                    spec.name,
                    Self::format_value(value)
                ));
            }
        }

        let lines = [
            format!("use {}::{};", matched.module, matched.name),
            String::new(),
            "fn main() {".to_string(),
            format!("    let result = {}({});", matched.name, arguments.join(", ")),
            "    match result {".to_string(),
            r#"        Ok(value) => println!("Function executed successfully: {value:?}"),"#.to_string(),
            r#"        Err(err) => eprintln!("Error executing function: {err}"),"#.to_string(),
            "    }".to_string(),
            "}".to_string(),
        ];
        let mut code = lines.join("\n");
        code.push('\n');
        code
    }

    /// Strings render as quoted literals, everything else as its plain text
    /// form. No escaping beyond the quotes.
    fn format_value(value: &Value) -> String {
        match value {
            Value::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

/// Outcome of dispatching the matched callable. A raised fault is captured
/// here, never re-raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub function_id: String,
}

pub struct Invoker;

impl Invoker {
    /// Resolve the callable behind `function_id` in the dispatch table and
    /// execute it with the validated arguments.
    pub async fn invoke(
        catalog: &FunctionCatalog,
        function_id: &str,
        params: &HashMap<String, Value>,
    ) -> ExecutionReport {
        let Some(function) = catalog.callable(function_id).await else {
            return ExecutionReport {
                success: false,
                result: None,
                error: Some(format!("Unknown function: {}", function_id)),
                function_id: function_id.to_string(),
            };
        };

        debug!(function_id, ?params, "invoking function");
        match function.invoke(params).await {
            Ok(result) => ExecutionReport {
                success: true,
                result: Some(result),
                error: None,
                function_id: function_id.to_string(),
            },
            Err(err) => ExecutionReport {
                success: false,
                result: None,
                error: Some(err.to_string()),
                function_id: function_id.to_string(),
            },
        }
    }
}
