use std::collections::HashMap;

use logdeck_types::{Source, SourceId};

/// The set of known sources, in registration order
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, Source>,
    order: Vec<SourceId>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a source. Returns true if it was already known.
    pub fn register(&mut self, source: Source) -> bool {
        let id = source.id.clone();
        let existed = self.sources.insert(id.clone(), source).is_some();
        if !existed {
            self.order.push(id);
        }
        existed
    }

    pub fn remove(&mut self, source_id: &str) -> Option<Source> {
        let removed = self.sources.remove(source_id)?;
        self.order.retain(|id| id != source_id);
        Some(removed)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.sources.contains_key(source_id)
    }

    pub fn get(&self, source_id: &str) -> Option<&Source> {
        self.sources.get(source_id)
    }

    pub fn has_any(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.order.iter().filter_map(|id| self.sources.get(id))
    }

    /// Source watching the same file on the same host, if any
    pub fn find_by_origin(&self, host: &str, log_path: &str) -> Option<&Source> {
        self.iter().find(|s| s.host == host && s.log_path == log_path)
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.order.clear();
    }
}
