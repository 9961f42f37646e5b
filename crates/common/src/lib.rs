//! CaseDesk Common Library
//!
//! Shared code for the CaseDesk client including:
//! - Case, graph and chat data model
//! - Backend transport client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics for backend calls

pub mod client;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use client::{CaseBackend, HttpCaseClient, MockCaseBackend};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Case, CaseId, CaseStatus, Graph};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default backend origin
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
