//! Matcher tiers
//!
//! Three cascading matchers share one result shape: high-precision intent
//! rules, a zero-dependency keyword fallback, and (in `crate::retrieval`)
//! embedding-based nearest-neighbor search.

pub mod intent;
pub mod keyword;

use serde::{Deserialize, Serialize};

use crate::catalog::{FunctionDescriptor, ParameterSpec};

/// Fixed confidence assigned to any intent-rule hit; rule hits are
/// authoritative and never scored.
pub const INTENT_MATCH_SCORE: f32 = 0.95;

/// Minimum keyword overlap ratio for the fallback matcher to claim a match.
pub const KEYWORD_SCORE_FLOOR: f32 = 0.1;

/// The common shape produced by every matcher tier. `relevance_score` is on
/// a matcher-specific scale: 0.95 fixed for intent rules, overlap ratio in
/// [0, 1] for keywords, `1 / (1 + distance)` for vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: String,
    pub name: String,
    pub module: String,
    pub docstring: String,
    pub parameters: Vec<ParameterSpec>,
    pub relevance_score: f32,
}

impl MatchResult {
    pub fn from_descriptor(descriptor: &FunctionDescriptor, relevance_score: f32) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            module: descriptor.module.clone(),
            docstring: descriptor.docstring.clone(),
            parameters: descriptor.parameters.clone(),
            relevance_score,
        }
    }
}
