//! Resolution Orchestrator
//!
//! Sequences the pipeline: augment -> match (intent -> keyword -> vector)
//! -> extract + validate -> synthesize + invoke -> record. Every terminal
//! branch records exactly one interaction, and no fault ever propagates
//! past `resolve`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::catalog::{FunctionCatalog, FunctionProvider};
use crate::codegen::{CodeSynthesizer, ExecutionReport, Invoker};
use crate::error::EngineError;
use crate::matcher::intent::IntentMatcher;
use crate::matcher::keyword::KeywordMatcher;
use crate::matcher::{MatchResult, INTENT_MATCH_SCORE};
use crate::params::{extract_parameters, validate_parameters};
use crate::retrieval::VectorIndex;
use crate::session::SessionStore;

/// The structured outcome of one resolution request. `session_id` is always
/// populated, even when the request carried none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_result: Option<ExecutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt: String,
    pub session_id: String,
}

impl Resolution {
    fn failure(error: String, prompt: &str, session_id: &str) -> Self {
        Self {
            success: false,
            function: None,
            function_name: None,
            relevance_score: None,
            parameters: None,
            code: None,
            execution_result: None,
            error: Some(error),
            prompt: prompt.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Per-namespace registration outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ResolutionEngine {
    catalog: Arc<FunctionCatalog>,
    intent: IntentMatcher,
    keyword: KeywordMatcher,
    index: Arc<VectorIndex>,
    sessions: Arc<SessionStore>,
    providers: RwLock<HashMap<String, Arc<dyn FunctionProvider>>>,
}

impl ResolutionEngine {
    pub fn new(index: VectorIndex, sessions: SessionStore) -> Self {
        Self {
            catalog: Arc::new(FunctionCatalog::new()),
            intent: IntentMatcher::new(),
            keyword: KeywordMatcher::new(),
            index: Arc::new(index),
            sessions: Arc::new(sessions),
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Make a namespace's callables available for registration.
    pub async fn add_provider(&self, provider: Arc<dyn FunctionProvider>) {
        self.providers
            .write()
            .await
            .insert(provider.namespace().to_string(), provider);
    }

    /// Register every callable of a namespace into the catalogue and the
    /// vector index. One callable's failure does not abort the rest.
    pub async fn register(&self, namespace: &str) -> NamespaceReport {
        let provider = self.providers.read().await.get(namespace).cloned();
        let Some(provider) = provider else {
            let err = EngineError::Registration {
                namespace: namespace.to_string(),
                reason: "unknown namespace".to_string(),
            };
            error!("{err}");
            return NamespaceReport {
                success: false,
                count: None,
                functions: None,
                error: Some(err.to_string()),
            };
        };

        let mut functions = Vec::new();
        for function in provider.functions() {
            let descriptor = self.catalog.register(namespace, function).await;
            let id = descriptor.id.clone();
            match self.index.upsert(descriptor).await {
                Ok(_) => {
                    info!("Registered function: {id}");
                    functions.push(id);
                }
                Err(e) => warn!("Failed to index function {id}: {e}"),
            }
        }

        NamespaceReport {
            success: true,
            count: Some(functions.len()),
            functions: Some(functions),
            error: None,
        }
    }

    /// Resolve a prompt to a function, execute it, and record the turn.
    pub async fn resolve(&self, prompt: &str, session_id: Option<String>) -> Resolution {
        let session_id = match session_id {
            Some(id) => id,
            None => self.sessions.create().await,
        };

        match self.try_resolve(prompt, &session_id).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Error processing request: {e:#}");
                let failure = Resolution::failure(
                    format!("Error processing request: {e}"),
                    prompt,
                    &session_id,
                );
                self.sessions
                    .add_interaction(&session_id, prompt, None, serde_json::to_value(&failure).ok())
                    .await;
                failure
            }
        }
    }

    async fn try_resolve(&self, prompt: &str, session_id: &str) -> Result<Resolution> {
        let augmented = self.sessions.augment(session_id, prompt).await;

        let Some(matched) = self.match_tiers(&augmented).await? else {
            let failure = Resolution::failure(
                EngineError::NoMatch.to_string(),
                prompt,
                session_id,
            );
            self.sessions
                .add_interaction(session_id, prompt, None, serde_json::to_value(&failure).ok())
                .await;
            return Ok(failure);
        };

        info!(
            function = %matched.name,
            score = matched.relevance_score,
            "best function match"
        );

        // Arguments come from the ORIGINAL prompt; the augmentation prefix
        // must never leak values into extraction.
        let extracted = extract_parameters(prompt, &descriptor_view(&matched));
        let valid = match validate_parameters(&descriptor_view(&matched), &extracted) {
            Ok(valid) => valid,
            Err(e) => {
                let mut failure = Resolution::failure(e.to_string(), prompt, session_id);
                failure.function = Some(matched.id.clone());
                self.sessions
                    .add_interaction(
                        session_id,
                        prompt,
                        Some(matched.id.clone()),
                        serde_json::to_value(&failure).ok(),
                    )
                    .await;
                return Ok(failure);
            }
        };

        let code = CodeSynthesizer::render(&matched, &valid);
        let report = Invoker::invoke(&self.catalog, &matched.id, &valid).await;

        let resolution = Resolution {
            success: report.success,
            function: Some(matched.id.clone()),
            function_name: Some(matched.name.clone()),
            relevance_score: Some(matched.relevance_score),
            parameters: Some(valid),
            code: Some(code),
            execution_result: Some(report.clone()),
            error: None,
            prompt: prompt.to_string(),
            session_id: session_id.to_string(),
        };

        self.sessions
            .add_interaction(
                session_id,
                prompt,
                Some(matched.id),
                serde_json::to_value(&report).ok(),
            )
            .await;

        Ok(resolution)
    }

    /// Cascade the matcher tiers: intent rules, then keyword overlap, then
    /// vector search. Rule hits are authoritative and carry a fixed score.
    async fn match_tiers(&self, prompt: &str) -> Result<Option<MatchResult>> {
        if let Some(name) = self.intent.matches(prompt) {
            if let Some(descriptor) = self.catalog.find_by_name(name).await {
                info!(function = name, "direct intent match");
                return Ok(Some(MatchResult::from_descriptor(
                    &descriptor,
                    INTENT_MATCH_SCORE,
                )));
            }
        }

        let descriptors = self.catalog.descriptors().await;
        if let Some(matched) = self.keyword.best_match(prompt, &descriptors) {
            return Ok(Some(matched));
        }

        let hits = self.index.search(prompt, 3).await?;
        if let Some(best) = hits.into_iter().next() {
            info!(
                function = %best.name,
                score = best.relevance_score,
                "vector search match"
            );
            return Ok(Some(best));
        }
        Ok(None)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn index_size(&self) -> usize {
        self.index.count().await
    }
}

/// The validator and extractor work on descriptor shapes; a `MatchResult`
/// carries the same declared-parameter view.
fn descriptor_view(matched: &MatchResult) -> crate::catalog::FunctionDescriptor {
    crate::catalog::FunctionDescriptor {
        id: matched.id.clone(),
        name: matched.name.clone(),
        module: matched.module.clone(),
        docstring: matched.docstring.clone(),
        keywords: Vec::new(),
        parameters: matched.parameters.clone(),
    }
}
