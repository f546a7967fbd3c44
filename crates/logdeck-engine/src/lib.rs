//! Log aggregation engine for logdeck
//!
//! This crate provides per-source stats, log storage, the activity series,
//! querying, and the ingestion coordinator that ties them together.

mod config;
mod engine;
mod parser;
mod query;
mod registry;
mod series;
mod stats;
mod store;
mod time;

pub use config::{DEFAULT_PAGE_SIZE, DEFAULT_SERIES_CAPACITY, EngineConfig};
pub use engine::{BatchSummary, DropReason, Engine, IngestOutcome};
pub use parser::{Deduplicator, LineGrouper, LogParser};
pub use query::{LevelFilter, Page, Selection, count_matches, filtered, query, total_pages};
pub use registry::SourceRegistry;
pub use series::{SeriesSnapshot, TimeSeries, bucket_key};
pub use stats::StatsCounter;
pub use store::{ArcLogEvent, LogStore};
pub use time::{parse_second, parse_timestamp};

// Re-export types used in our public API
pub use logdeck_types::{Level, LevelCounts, LogEvent, Source, SourceId};
