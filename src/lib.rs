//! Automation Agency
//!
//! Resolves free-text user requests to concrete automation functions:
//! - Cascading matcher (intent rules, keyword overlap, vector retrieval)
//! - Heuristic parameter extraction with authoritative validation
//! - Code synthesis plus reflection-free dynamic dispatch
//! - Bounded per-session context with history-aware prompt augmentation

pub mod catalog;
pub mod codegen;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod params;
pub mod retrieval;
pub mod server;
pub mod session;

// Re-exports for convenience
pub use catalog::{AutomationFn, FunctionCatalog, FunctionDescriptor};
pub use engine::{Resolution, ResolutionEngine};
pub use retrieval::{EmbeddingProvider, FastembedProvider, VectorIndex};
pub use session::SessionStore;
