//! Keyword Fallback Matcher
//!
//! Token-overlap scoring against each function's derived keyword set. A
//! recall-oriented heuristic, not semantic; it exists as a zero-cost tier
//! before paying for vector search.

use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::{MatchResult, KEYWORD_SCORE_FLOOR};
use crate::catalog::FunctionDescriptor;

pub struct KeywordMatcher {
    word: Regex,
}

impl KeywordMatcher {
    pub fn new() -> Self {
        Self {
            word: Regex::new(r"\b\w+\b").expect("word pattern"),
        }
    }

    fn tokenize(&self, prompt: &str) -> HashSet<String> {
        let prompt = prompt.to_lowercase();
        self.word
            .find_iter(&prompt)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Score every descriptor by `|prompt ∩ keywords| / max(1, |keywords|)`
    /// and return the strict maximum, or nothing when the best score falls
    /// below the floor. Descriptors are scanned in registration order, so
    /// the first-seen function keeps ties.
    pub fn best_match(&self, prompt: &str, descriptors: &[FunctionDescriptor]) -> Option<MatchResult> {
        let prompt_tokens = self.tokenize(prompt);
        let mut best: Option<(f32, &FunctionDescriptor)> = None;

        for descriptor in descriptors {
            let common = descriptor
                .keywords
                .iter()
                .filter(|k| prompt_tokens.contains(*k))
                .count();
            let score = common as f32 / descriptor.keywords.len().max(1) as f32;
            debug!(function = %descriptor.name, score, common, "keyword overlap");

            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, descriptor));
            }
        }

        match best {
            Some((score, descriptor)) if score >= KEYWORD_SCORE_FLOOR => {
                debug!(function = %descriptor.name, score, "best keyword match");
                Some(MatchResult::from_descriptor(descriptor, score))
            }
            _ => None,
        }
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::derive_keywords;

    fn descriptor(name: &str, docstring: &str) -> FunctionDescriptor {
        FunctionDescriptor {
            id: format!("automation.{}", name),
            name: name.to_string(),
            module: "automation".to_string(),
            docstring: docstring.to_string(),
            keywords: derive_keywords(name, docstring),
            parameters: Vec::new(),
        }
    }

    #[test]
    fn overlap_ratio_selects_the_closest_function() {
        let matcher = KeywordMatcher::new();
        let descriptors = vec![
            descriptor("get_cpu_usage", "Get the current CPU usage percentage."),
            descriptor("create_directory", "Create a directory at the specified path."),
        ];

        let hit = matcher
            .best_match("what is the cpu usage right now", &descriptors)
            .unwrap();
        assert_eq!(hit.name, "get_cpu_usage");
        assert!(hit.relevance_score > 0.0 && hit.relevance_score <= 1.0);
    }

    #[test]
    fn scores_below_the_floor_are_discarded() {
        let matcher = KeywordMatcher::new();
        let descriptors = vec![descriptor(
            "get_cpu_usage",
            "Get the current CPU usage percentage.",
        )];
        assert!(matcher
            .best_match("recite a limerick about ferrets", &descriptors)
            .is_none());
    }

    #[test]
    fn ties_keep_the_first_registered_function() {
        let matcher = KeywordMatcher::new();
        // Identical keyword sets: both score the same on any prompt.
        let first = descriptor("probe_widget", "Probe widget telemetry.");
        let mut second = first.clone();
        second.id = "automation.scan_widget".to_string();
        second.name = "scan_widget".to_string();

        let hit = matcher.best_match("probe the widget telemetry", &[first, second]);
        assert_eq!(hit.unwrap().name, "probe_widget");
    }
}
