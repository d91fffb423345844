//! KCA Portal Common Library
//!
//! Shared code for the staff portal gateway including:
//! - Reference sources and citation scoring
//! - Chat assistant and completion client abstraction
//! - Contact directory and notice board with file persistence
//! - Eligibility self-assessment
//! - Error types, configuration, authentication
//! - Metrics, interaction logging and observability

pub mod auth;
pub mod chat;
pub mod citations;
pub mod config;
pub mod contacts;
pub mod eligibility;
pub mod errors;
pub mod interactions;
pub mod llm;
pub mod metrics;
pub mod notices;
pub mod store;

// Re-export commonly used types
pub use citations::{Citation, SourceCorpus};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::ChatCompleter;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
