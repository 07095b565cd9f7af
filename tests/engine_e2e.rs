//! End-to-end pipeline scenarios
//!
//! Drives the full resolution pipeline against the real automation
//! catalogue. Embeddings come from a deterministic axis provider so the
//! vector tier is predictable and no model download happens here.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use automation_agency::catalog::automation::AutomationProvider;
use automation_agency::retrieval::EmbeddingProvider;
use automation_agency::{ResolutionEngine, SessionStore, VectorIndex};

/// Maps a handful of topic words onto fixed axes; texts about the same
/// topic land on the same unit vector.
struct AxisProvider;

impl EmbeddingProvider for AxisProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let axes = [
            &["cpu", "silicon"][..],
            &["memory", "ram"][..],
            &["disk", "storage"][..],
            &["chrome", "browser"][..],
        ];
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                let mut v = vec![0.0f32; 4];
                for (axis, words) in axes.iter().enumerate() {
                    if words.iter().any(|w| text.contains(w)) {
                        v[axis] = 1.0;
                    }
                }
                let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for x in &mut v {
                        *x /= norm;
                    }
                }
                v
            })
            .collect())
    }
}

async fn registered_engine() -> (TempDir, ResolutionEngine) {
    let dir = TempDir::new().unwrap();
    let index = VectorIndex::new(dir.path().join("functions.idx"), Arc::new(AxisProvider));
    let engine = ResolutionEngine::new(index, SessionStore::new(10));
    engine.add_provider(Arc::new(AutomationProvider)).await;
    let report = engine.register("automation").await;
    assert!(report.success);
    (dir, engine)
}

#[tokio::test]
async fn cpu_prompt_resolves_and_executes_via_intent_rule() {
    let (_dir, engine) = registered_engine().await;

    let resolution = engine
        .resolve("What's the current CPU usage?", None)
        .await;

    assert!(resolution.success);
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.get_cpu_usage")
    );
    // Rule hits are authoritative: fixed high confidence, no scoring.
    assert_eq!(resolution.relevance_score, Some(0.95));
    assert!(!resolution.code.as_deref().unwrap_or_default().is_empty());

    let report = resolution.execution_result.unwrap();
    assert!(report.success);
    assert!(report
        .result
        .unwrap()
        .as_str()
        .unwrap()
        .contains("Current CPU usage"));

    // The turn is recorded under the returned session id.
    let history = engine.sessions().get_history(&resolution.session_id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].function_id.as_deref(),
        Some("automation.get_cpu_usage")
    );
}

#[tokio::test]
async fn memory_prompt_is_not_confused_with_the_calc_rule() {
    let (_dir, engine) = registered_engine().await;

    let resolution = engine.resolve("memory usage", None).await;
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.get_memory_usage")
    );

    // Same ordering guarantee when "calc" could substring-match.
    let resolution = engine.resolve("calculate memory usage", None).await;
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.get_memory_usage")
    );
}

#[tokio::test]
async fn keyword_fallback_selects_highest_overlap() {
    let (_dir, engine) = registered_engine().await;

    // No intent rule matches, but "cpu" and "percentage" overlap the
    // derived keywords of get_cpu_usage.
    let resolution = engine.resolve("cpu percentage please", None).await;
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.get_cpu_usage")
    );
    let score = resolution.relevance_score.unwrap();
    assert!(score > 0.1 && score < 0.95, "keyword-tier score, got {score}");
}

#[tokio::test]
async fn vector_tier_handles_prompts_no_keyword_reaches() {
    let (_dir, engine) = registered_engine().await;

    // "silicon busyness" shares no token with any keyword set; the axis
    // provider puts it next to the cpu function.
    let resolution = engine.resolve("silicon busyness", None).await;
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.get_cpu_usage")
    );
    // Distance 0 under the axis provider: score = 1 / (1 + 0).
    let score = resolution.relevance_score.unwrap();
    assert!((score - 1.0).abs() < 1e-6, "expected 1/(1+d) with d=0, got {score}");
}

#[tokio::test]
async fn empty_engine_yields_structured_no_match() {
    let dir = TempDir::new().unwrap();
    let index = VectorIndex::new(dir.path().join("functions.idx"), Arc::new(AxisProvider));
    let engine = ResolutionEngine::new(index, SessionStore::new(10));

    let resolution = engine.resolve("silicon busyness", None).await;
    assert!(!resolution.success);
    assert!(resolution
        .error
        .unwrap()
        .contains("No matching function found"));
    assert!(!resolution.session_id.is_empty());
}

#[tokio::test]
async fn reregistration_leaves_index_size_unchanged() {
    let (_dir, engine) = registered_engine().await;
    assert_eq!(engine.index_size().await, 10);

    let report = engine.register("automation").await;
    assert!(report.success);
    assert_eq!(report.count, Some(10));
    assert_eq!(engine.index_size().await, 10);
}

#[tokio::test]
async fn missing_required_parameter_names_it_and_skips_invocation() {
    let (_dir, engine) = registered_engine().await;

    let resolution = engine.resolve("run command", None).await;
    assert!(!resolution.success);
    assert_eq!(
        resolution.error.as_deref(),
        Some("Missing required parameters: command")
    );
    assert!(resolution.execution_result.is_none());
    assert!(resolution.parameters.is_none());
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.run_command")
    );
}

#[tokio::test]
async fn extracted_parameters_reach_the_function() {
    let (_dir, engine) = registered_engine().await;

    let resolution = engine
        .resolve("run command, command=\"echo hello\"", None)
        .await;
    // Quoted values stop at the first quote boundary; "echo" alone still
    // proves the extraction-to-invocation path.
    assert!(resolution.success);
    let report = resolution.execution_result.unwrap();
    assert_eq!(report.function_id, "automation.run_command");
    assert!(report.result.unwrap().get("success").is_some());
}

#[tokio::test]
async fn invocation_fault_is_captured_not_raised() {
    let (_dir, engine) = registered_engine().await;

    // "abc" is not a number; the callable's parse failure must surface
    // inside execution_result while the match itself stands.
    let resolution = engine
        .resolve("show the process list with a limit of abc", None)
        .await;
    assert!(!resolution.success);
    assert_eq!(
        resolution.function.as_deref(),
        Some("automation.list_running_processes")
    );
    let report = resolution.execution_result.unwrap();
    assert!(!report.success);
    assert!(report.error.unwrap().contains("not a number"));
}

#[tokio::test]
async fn history_disambiguates_followup_prompts() {
    let (_dir, engine) = registered_engine().await;
    let session_id = engine.sessions().create().await;

    let first = engine
        .resolve("What's the current CPU usage?", Some(session_id.clone()))
        .await;
    assert!(first.success);

    // Alone, "and now the memory?" has no get/show verb; the augmented
    // prompt's digest supplies one and routes it to the memory function.
    let second = engine
        .resolve("and now the memory?", Some(session_id.clone()))
        .await;
    assert_eq!(
        second.function.as_deref(),
        Some("automation.get_memory_usage")
    );

    let history = engine.sessions().get_history(&session_id).await;
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn zero_age_sweep_clears_sessions_without_faulting() {
    let (_dir, engine) = registered_engine().await;

    let resolution = engine.resolve("memory usage", None).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    let removed = engine.sessions().sweep(Duration::ZERO).await;
    assert!(removed >= 1);
    assert!(engine
        .sessions()
        .get_history(&resolution.session_id)
        .await
        .is_empty());
}
