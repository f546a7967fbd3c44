use std::collections::HashMap;

use tracing::debug;

use logdeck_types::{Level, LevelCounts, SourceId};

/// Per-source event counts by level
///
/// Counts are monotonic for the lifetime of a source; only `reset` and
/// `remove` bring them back down.
#[derive(Debug, Default)]
pub struct StatsCounter {
    counts: HashMap<SourceId, LevelCounts>,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counters for a source, creating them if needed
    pub fn reset(&mut self, source_id: &str) {
        self.counts.insert(source_id.to_string(), LevelCounts::default());
    }

    /// Count one event. Unknown sources are ignored and reported as `false`.
    pub fn increment(&mut self, source_id: &str, level: &Level) -> bool {
        match self.counts.get_mut(source_id) {
            Some(counts) => {
                counts.increment(level);
                true
            }
            None => {
                debug!(source_id, "stats increment for unknown source ignored");
                false
            }
        }
    }

    /// Snapshot for one source, or the element-wise sum over all sources
    pub fn read(&self, source_id: Option<&str>) -> LevelCounts {
        match source_id {
            Some(id) => self.counts.get(id).copied().unwrap_or_default(),
            None => self.counts.values().copied().sum(),
        }
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.counts.contains_key(source_id)
    }

    pub fn remove(&mut self, source_id: &str) {
        self.counts.remove(source_id);
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
