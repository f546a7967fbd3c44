use serde::{Deserialize, Serialize};

/// Client tuning, loadable from the `[client]` table of the config file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How often tailers look for new lines
    pub poll_interval_ms: u64,

    /// Lines of history loaded when a source is added
    pub initial_lines: usize,

    /// Lines returned by a previous/next download
    pub adjacent_lines: usize,

    /// Insights polling period
    pub insights_interval_secs: u64,

    /// Recent entries remembered per source for duplicate suppression
    pub dedup_window: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            initial_lines: 100,
            adjacent_lines: 1000,
            insights_interval_secs: 30,
            dedup_window: 1000,
        }
    }
}
