use serde::{Deserialize, Serialize};

/// Default number of one-second buckets kept in the activity series
pub const DEFAULT_SERIES_CAPACITY: usize = 100;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Engine tuning, loadable from the `[engine]` table of the config file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of buckets in the time series
    pub series_capacity: usize,

    /// Initial page size of the selection
    pub page_size: usize,

    /// Optional cap on retained entries per source (None = unbounded)
    pub max_logs_per_source: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            series_capacity: DEFAULT_SERIES_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
            max_logs_per_source: None,
        }
    }
}
