//! Function Catalogue
//!
//! Describes invocable automation functions as `FunctionDescriptor` value
//! objects and keeps the id -> callable dispatch table used for invocation.
//! Descriptors are built once at registration time; nothing re-introspects
//! a callable per request.

pub mod automation;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Words too generic to carry matching signal.
const STOPWORDS: [&str; 11] = [
    "the", "a", "an", "and", "or", "with", "for", "to", "in", "on", "of",
];

/// One declared parameter of an automation function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    /// Literal default, absent for required parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
            required: false,
        }
    }
}

/// Immutable description of one invocable capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Module-qualified name, unique across the catalogue.
    pub id: String,
    pub name: String,
    /// Logical namespace the function was registered under.
    pub module: String,
    pub docstring: String,
    pub keywords: Vec<String>,
    pub parameters: Vec<ParameterSpec>,
}

impl FunctionDescriptor {
    /// Build a descriptor from a callable's declared surface.
    pub fn from_callable(module: &str, function: &dyn AutomationFn) -> Self {
        let name = function.name().to_string();
        let docstring = function.docstring().to_string();
        Self {
            id: format!("{}.{}", module, name),
            keywords: derive_keywords(&name, &docstring),
            parameters: function.parameters(),
            name,
            module: module.to_string(),
            docstring,
        }
    }
}

/// Extract matching keywords from a function name and the first sentence of
/// its docstring. Deduplicated preserving first-seen order so downstream
/// iteration stays deterministic.
pub fn derive_keywords(name: &str, docstring: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut push = |word: &str| {
        let word = word.to_lowercase();
        if word.len() > 2 && !STOPWORDS.contains(&word.as_str()) && seen.insert(word.clone()) {
            keywords.push(word);
        }
    };

    for part in name.split(|c: char| c == '_' || c.is_whitespace()) {
        push(part);
    }

    let first_sentence = docstring.split('.').next().unwrap_or("");
    for word in first_sentence.split(|c: char| !c.is_alphanumeric()) {
        push(word);
    }

    keywords
}

/// An invocable automation function.
///
/// Arguments arrive as raw string values extracted from the prompt; each
/// implementation parses what it needs and reports parse failures as plain
/// errors, which the invoker captures.
#[async_trait]
pub trait AutomationFn: Send + Sync {
    fn name(&self) -> &str;

    fn docstring(&self) -> &str;

    fn parameters(&self) -> Vec<ParameterSpec>;

    async fn invoke(&self, args: &HashMap<String, Value>) -> Result<Value>;
}

/// Yields the callables of one logical namespace.
pub trait FunctionProvider: Send + Sync {
    fn namespace(&self) -> &str;

    fn functions(&self) -> Vec<Arc<dyn AutomationFn>>;
}

#[derive(Default)]
struct CatalogState {
    /// Insertion-ordered descriptors. Keyword fallback iterates this list,
    /// so registration order is the tie-break.
    descriptors: Vec<FunctionDescriptor>,
    index_of: HashMap<String, usize>,
    /// id -> callable dispatch table, built here and nowhere else.
    dispatch: HashMap<String, Arc<dyn AutomationFn>>,
}

/// Registry of descriptors plus the typed dispatch table.
#[derive(Default)]
pub struct FunctionCatalog {
    state: RwLock<CatalogState>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a callable under a namespace. Re-registering
    /// the same id replaces the prior descriptor and callable in place.
    pub async fn register(
        &self,
        module: &str,
        function: Arc<dyn AutomationFn>,
    ) -> FunctionDescriptor {
        let descriptor = FunctionDescriptor::from_callable(module, function.as_ref());
        let mut state = self.state.write().await;
        match state.index_of.get(&descriptor.id).copied() {
            Some(idx) => {
                state.descriptors[idx] = descriptor.clone();
            }
            None => {
                let idx = state.descriptors.len();
                state.index_of.insert(descriptor.id.clone(), idx);
                state.descriptors.push(descriptor.clone());
            }
        }
        state.dispatch.insert(descriptor.id.clone(), function);
        descriptor
    }

    pub async fn descriptors(&self) -> Vec<FunctionDescriptor> {
        self.state.read().await.descriptors.clone()
    }

    pub async fn get(&self, id: &str) -> Option<FunctionDescriptor> {
        let state = self.state.read().await;
        state
            .index_of
            .get(id)
            .map(|&idx| state.descriptors[idx].clone())
    }

    /// Look up a descriptor by its short (unqualified) name.
    pub async fn find_by_name(&self, name: &str) -> Option<FunctionDescriptor> {
        let state = self.state.read().await;
        state
            .descriptors
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    /// Resolve the callable behind an id.
    pub async fn callable(&self, id: &str) -> Option<Arc<dyn AutomationFn>> {
        self.state.read().await.dispatch.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.descriptors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
