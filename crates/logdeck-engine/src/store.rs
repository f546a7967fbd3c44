use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use logdeck_types::{LogEvent, SourceId};

/// Shared handle to a stored event (cheap to clone for rendering)
pub type ArcLogEvent = Arc<LogEvent>;

/// Per-source sequences of received events, most recent first
///
/// Unbounded unless a per-source capacity is configured, in which case the
/// oldest entry of that source is dropped on overflow.
#[derive(Debug, Default)]
pub struct LogStore {
    /// Internal storage
    streams: HashMap<SourceId, VecDeque<ArcLogEvent>>,

    /// Source ids in the order their sequences were created
    order: Vec<SourceId>,

    /// Maximum entries kept per source
    capacity: Option<usize>,
}

impl LogStore {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            streams: HashMap::new(),
            order: Vec::new(),
            capacity,
        }
    }

    /// Empty the sequence of a source, creating it if needed
    pub fn reset(&mut self, source_id: &str) {
        if self
            .streams
            .insert(source_id.to_string(), VecDeque::new())
            .is_none()
        {
            self.order.push(source_id.to_string());
        }
    }

    /// Insert at the front of the source's sequence. Unknown sources are ignored.
    pub fn append(&mut self, source_id: &str, event: LogEvent) -> bool {
        let Some(stream) = self.streams.get_mut(source_id) else {
            debug!(source_id, "append for unknown source ignored");
            return false;
        };

        stream.push_front(Arc::new(event));
        if let Some(capacity) = self.capacity {
            while stream.len() > capacity {
                stream.pop_back();
            }
        }
        true
    }

    /// One source's sequence, or every source's sequence concatenated in
    /// creation order. No cross-source merging happens here.
    pub fn logs_for(&self, source_id: Option<&str>) -> Vec<ArcLogEvent> {
        match source_id {
            Some(id) => self
                .streams
                .get(id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default(),
            None => self
                .order
                .iter()
                .filter_map(|id| self.streams.get(id))
                .flat_map(|s| s.iter().cloned())
                .collect(),
        }
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.streams.contains_key(source_id)
    }

    /// Drop one source's sequence
    pub fn clear(&mut self, source_id: &str) {
        if self.streams.remove(source_id).is_some() {
            self.order.retain(|id| id != source_id);
        }
    }

    /// Drop every sequence
    pub fn clear_all(&mut self) {
        self.streams.clear();
        self.order.clear();
    }
}
