//! Automation Agency entry point
//!
//! Wires the resolution engine together: embedding provider, vector index,
//! session store, the `automation` namespace, a background session sweeper,
//! and the HTTP transport.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use automation_agency::catalog::automation::AutomationProvider;
use automation_agency::server::{run_server, AppState};
use automation_agency::session::DEFAULT_MAX_HISTORY;
use automation_agency::{FastembedProvider, ResolutionEngine, SessionStore, VectorIndex};

// ──────────────────────────────────────────────────────────────────────────────
// CONFIGURATION
// ──────────────────────────────────────────────────────────────────────────────

struct AgencyConfig {
    /// HTTP port to serve on
    port: u16,
    /// Directory holding the persisted vector index
    data_dir: PathBuf,
    /// History entries kept per session
    max_history: usize,
    /// Idle age after which a session is swept
    session_ttl: Duration,
    /// How often the background sweeper runs
    sweep_interval: Duration,
}

impl AgencyConfig {
    fn from_env() -> Self {
        Self {
            port: env_parsed("AGENCY_PORT", 8000),
            data_dir: PathBuf::from(
                std::env::var("AGENCY_DATA_DIR").unwrap_or_else(|_| "./vector_db".to_string()),
            ),
            max_history: env_parsed("AGENCY_MAX_HISTORY", DEFAULT_MAX_HISTORY),
            session_ttl: Duration::from_secs(env_parsed("AGENCY_SESSION_TTL_SECS", 3600)),
            sweep_interval: Duration::from_secs(env_parsed("AGENCY_SWEEP_INTERVAL_SECS", 300)),
        }
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();

    let config = AgencyConfig::from_env();
    info!("Starting Automation Agency v{}", env!("CARGO_PKG_VERSION"));

    let provider =
        Arc::new(FastembedProvider::new().context("Failed to initialize embedding provider")?);
    let index = VectorIndex::new(config.data_dir.join("functions.idx"), provider);
    let sessions = SessionStore::new(config.max_history);

    let engine = Arc::new(ResolutionEngine::new(index, sessions));
    engine.add_provider(Arc::new(AutomationProvider)).await;

    let report = engine.register("automation").await;
    match report.count {
        Some(count) => info!("Registered {count} automation functions"),
        None => warn!(
            "Automation namespace registration failed: {}",
            report.error.unwrap_or_default()
        ),
    }

    // Background session sweeper
    {
        let engine = engine.clone();
        let ttl = config.session_ttl;
        let interval = config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = engine.sessions().sweep(ttl).await;
                if removed > 0 {
                    info!("Session sweep removed {removed} idle sessions");
                }
            }
        });
    }

    let state = AppState {
        engine,
        session_ttl_secs: config.session_ttl.as_secs(),
        data_dir: config.data_dir.to_string_lossy().to_string(),
    };
    run_server(state, config.port).await
}
