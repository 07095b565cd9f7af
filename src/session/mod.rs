//! Session & Context Store
//!
//! Bounded per-session interaction history plus an open key/value context,
//! owned exclusively by the store behind one RwLock. No I/O; sessions live
//! and die in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// History entries kept per session before the oldest are dropped.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Interactions folded into an augmented prompt.
const AUGMENT_WINDOW: usize = 3;

/// Characters of a stringified result kept in a digest line.
const RESULT_SUMMARY_CHARS: usize = 100;

/// One recorded (prompt, matched function, outcome) tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub history: Vec<Interaction>,
    pub context: HashMap<String, Value>,
}

impl Session {
    fn new(session_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            created_at: now,
            last_activity: now,
            history: Vec::new(),
            context: HashMap::new(),
        }
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Create a new session and return its id.
    pub async fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.clone(), Session::new(session_id.clone()));
        session_id
    }

    /// Append an interaction, truncating history from the front at the cap.
    /// An unknown session id silently gets a fresh session instead of an
    /// error; the id actually used is returned.
    pub async fn add_interaction(
        &self,
        session_id: &str,
        prompt: &str,
        function_id: Option<String>,
        result: Option<Value>,
    ) -> String {
        let mut sessions = self.sessions.write().await;
        let session_id = if sessions.contains_key(session_id) {
            session_id.to_string()
        } else {
            let fresh = Uuid::new_v4().to_string();
            sessions.insert(fresh.clone(), Session::new(fresh.clone()));
            fresh
        };

        if let Some(session) = sessions.get_mut(&session_id) {
            session.last_activity = Utc::now();
            session.history.push(Interaction {
                timestamp: Utc::now(),
                prompt: prompt.to_string(),
                function_id,
                result,
            });
            if session.history.len() > self.max_history {
                let excess = session.history.len() - self.max_history;
                session.history.drain(..excess);
            }
        }
        session_id
    }

    /// Interaction history, empty for unknown sessions.
    pub async fn get_history(&self, session_id: &str) -> Vec<Interaction> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.history.clone())
            .unwrap_or_default()
    }

    pub async fn update_context(&self, session_id: &str, key: &str, value: Value) {
        let mut sessions = self.sessions.write().await;
        let session_id = if sessions.contains_key(session_id) {
            session_id.to_string()
        } else {
            let fresh = Uuid::new_v4().to_string();
            sessions.insert(fresh.clone(), Session::new(fresh.clone()));
            fresh
        };
        if let Some(session) = sessions.get_mut(&session_id) {
            session.context.insert(key.to_string(), value);
        }
    }

    pub async fn get_context(&self, session_id: &str, key: &str) -> Option<Value> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.context.get(key).cloned())
    }

    /// The whole context mapping, empty for unknown sessions.
    pub async fn get_full_context(&self, session_id: &str) -> HashMap<String, Value> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.context.clone())
            .unwrap_or_default()
    }

    /// Prefix the prompt with a digest of the most recent successful
    /// interactions. Prompts pass through unchanged when the session has no
    /// qualifying history.
    pub async fn augment(&self, session_id: &str, prompt: &str) -> String {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(session_id) else {
            return prompt.to_string();
        };

        let successful: Vec<&Interaction> = session
            .history
            .iter()
            .filter(|item| item.function_id.is_some() && is_successful(item.result.as_ref()))
            .collect();
        if successful.is_empty() {
            return prompt.to_string();
        }

        let mut digest = Vec::new();
        for item in successful.iter().rev().take(AUGMENT_WINDOW).rev() {
            let function_name = item
                .function_id
                .as_deref()
                .and_then(|id| id.rsplit('.').next())
                .unwrap_or("unknown");
            let summary = summarize_result(item.result.as_ref());
            digest.push(format!(
                "- You previously asked: '{}', which executed '{}' with result: '{}'",
                item.prompt, function_name, summary
            ));
        }

        debug!(session_id, lines = digest.len(), "augmenting prompt with history");
        format!(
            "With this context from your previous interactions:\n{}\n\nCurrent request: {}",
            digest.join("\n"),
            prompt
        )
    }

    /// Remove sessions idle for longer than `max_age`; returns how many.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            let idle = (now - session.last_activity)
                .to_std()
                .unwrap_or(Duration::ZERO);
            idle <= max_age
        });
        before - sessions.len()
    }
}

/// A qualifying result is an object with `"success": true`.
fn is_successful(result: Option<&Value>) -> bool {
    result
        .and_then(|r| r.get("success"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// First 100 characters of the stringified inner result.
fn summarize_result(result: Option<&Value>) -> String {
    let inner = match result.and_then(|r| r.get("result")) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    inner.chars().take(RESULT_SUMMARY_CHARS).collect()
}
