//! Collaborator side of logdeck
//!
//! This crate provides the backend traits for source management, history and
//! insights, a local-file backend with live tailing, and the `Dashboard`
//! session controller that drives the engine from backend responses.

mod api;
mod config;
mod dashboard;
mod error;
mod insights;
mod local;
mod tail;

pub use api::{Direction, Download, HistoryApi, InsightsApi, SourceApi};
pub use config::ClientConfig;
pub use dashboard::Dashboard;
pub use error::{ClientError, Result};
pub use insights::{InsightsPoller, summarize};
pub use local::{LOCAL_HOST, LocalBackend, LocalInsights};
pub use tail::{TailManager, WatchedFile};

// Re-export types used in our public API
pub use logdeck_types::{LogEvent, NewSource, Source};
