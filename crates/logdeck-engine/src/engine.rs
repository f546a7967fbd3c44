use tokio::sync::watch;
use tracing::{debug, info};

use logdeck_types::{LevelCounts, LogEvent, Source, SourceId};

use crate::config::EngineConfig;
use crate::query::{self, LevelFilter, Page, Selection};
use crate::registry::SourceRegistry;
use crate::series::{SeriesSnapshot, TimeSeries};
use crate::stats::StatsCounter;
use crate::store::{ArcLogEvent, LogStore};

/// Why an event was not ingested
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// No `source_id` and no selected source to default it to
    MissingSource,
    /// Empty timestamp
    MissingTimestamp,
}

/// Result of a single `ingest`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted {
        source_id: SourceId,
        /// The source was unknown and got registered on the fly
        registered: bool,
    },
    Dropped(DropReason),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Counts for an `ingest_batch`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub dropped: usize,
}

/// Aggregation engine for one dashboard session
///
/// Owns the source registry, per-source stats and logs, the activity series
/// and the selection. Every method runs to completion and leaves all
/// components consistent. Each change bumps a revision published on a
/// `watch` channel so a renderer can redraw.
pub struct Engine {
    registry: SourceRegistry,
    stats: StatsCounter,
    store: LogStore,
    series: TimeSeries,
    selection: Selection,
    config: EngineConfig,

    revision: u64,
    changed: watch::Sender<u64>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            registry: SourceRegistry::new(),
            stats: StatsCounter::new(),
            store: LogStore::new(config.max_logs_per_source),
            series: TimeSeries::new(config.series_capacity),
            selection: Selection::with_page_size(config.page_size),
            config,
            revision: 0,
            changed,
        }
    }

    // ------------------------------------------------------------------------
    // State-changed signal
    // ------------------------------------------------------------------------

    /// Receiver that observes a new revision after every state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn notify(&mut self) {
        self.revision += 1;
        self.changed.send_replace(self.revision);
    }

    // ------------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------------

    /// Register a source with empty stats and logs. Re-registering an
    /// existing id resets its stats and logs.
    pub fn register_source(&mut self, source: Source) {
        let id = source.id.clone();
        if self.registry.register(source) {
            debug!(source_id = %id, "source re-registered, state reset");
        } else {
            info!(source_id = %id, "source registered");
        }
        self.stats.reset(&id);
        self.store.reset(&id);
        self.notify();
    }

    /// Forget a source together with its stats and logs.
    ///
    /// The activity series is left as is unless this was the last source, in
    /// which case everything returns to the empty baseline.
    pub fn remove_source(&mut self, source_id: &str) -> bool {
        if self.registry.remove(source_id).is_none() {
            debug!(source_id, "remove for unknown source ignored");
            return false;
        }
        self.stats.remove(source_id);
        self.store.clear(source_id);
        info!(source_id, "source removed");

        if self.selection.source.as_deref() == Some(source_id) {
            self.selection.source = None;
        }

        if self.registry.has_any() {
            self.clamp_page();
            self.notify();
        } else {
            self.reset();
        }
        true
    }

    pub fn has_any(&self) -> bool {
        self.registry.has_any()
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.registry.contains(source_id)
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Return every component to the empty baseline. Filter, search and page
    /// size are kept; source selection and page are reset.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.stats.clear();
        self.store.clear_all();
        self.series.reset();
        self.selection.source = None;
        self.selection.page = 1;
        self.notify();
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Ingest one event from the push channel
    pub fn ingest(&mut self, event: LogEvent) -> IngestOutcome {
        let outcome = self.ingest_one(event);
        if outcome.is_accepted() {
            self.notify();
        }
        outcome
    }

    /// Ingest events in the given order, signalling once at the end
    pub fn ingest_batch<I>(&mut self, events: I) -> BatchSummary
    where
        I: IntoIterator<Item = LogEvent>,
    {
        let mut summary = BatchSummary::default();
        for event in events {
            if self.ingest_one(event).is_accepted() {
                summary.accepted += 1;
            } else {
                summary.dropped += 1;
            }
        }
        if summary.accepted > 0 {
            self.notify();
        }
        summary
    }

    fn ingest_one(&mut self, mut event: LogEvent) -> IngestOutcome {
        let Some(source_id) = event
            .source_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.selection.source.clone())
        else {
            debug!(timestamp = %event.timestamp, "event without source dropped");
            return IngestOutcome::Dropped(DropReason::MissingSource);
        };

        if event.timestamp.trim().is_empty() {
            debug!(source_id = %source_id, "event without timestamp dropped");
            return IngestOutcome::Dropped(DropReason::MissingTimestamp);
        }

        let registered = !self.registry.contains(&source_id);
        if registered {
            debug!(source_id = %source_id, "event for unknown source, registering");
            self.registry.register(Source::new(source_id.clone(), source_id.clone()));
            self.stats.reset(&source_id);
            self.store.reset(&source_id);
        }

        event.source_id = Some(source_id.clone());
        let (timestamp, level) = (event.timestamp.clone(), event.level.clone());
        self.stats.increment(&source_id, &level);
        self.store.append(&source_id, event);
        self.series.record(&timestamp, &level);

        IngestOutcome::Accepted {
            source_id,
            registered,
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Stats for one source, or summed over all sources when `None`
    pub fn stats(&self, source_id: Option<&str>) -> LevelCounts {
        self.stats.read(source_id)
    }

    /// Stats for the current selection
    pub fn current_stats(&self) -> LevelCounts {
        self.stats.read(self.selection.source.as_deref())
    }

    pub fn logs_for(&self, source_id: Option<&str>) -> Vec<ArcLogEvent> {
        self.store.logs_for(source_id)
    }

    pub fn series(&self) -> SeriesSnapshot {
        self.series.snapshot()
    }

    /// Run a query for an arbitrary selection
    pub fn query(&self, selection: &Selection) -> Page {
        query::query(&self.store, selection)
    }

    /// The page the current selection points at
    pub fn view(&self) -> Page {
        self.query(&self.selection)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Selection commands
    // ------------------------------------------------------------------------

    /// Switch to one source (or the aggregate view). Unknown ids are ignored.
    pub fn select_source(&mut self, source_id: Option<&str>) -> bool {
        if let Some(id) = source_id {
            if !self.registry.contains(id) {
                debug!(source_id = id, "select for unknown source ignored");
                return false;
            }
        }
        self.selection.source = source_id.map(str::to_string);
        self.clamp_page();
        self.notify();
        true
    }

    /// Select a source, or go back to the aggregate view if it is already selected
    pub fn toggle_source(&mut self, source_id: &str) -> bool {
        if self.selection.source.as_deref() == Some(source_id) {
            self.select_source(None)
        } else {
            self.select_source(Some(source_id))
        }
    }

    pub fn set_filter(&mut self, filter: LevelFilter) {
        self.selection.filter = filter;
        self.selection.page = 1;
        self.notify();
    }

    pub fn set_search(&mut self, term: &str) {
        self.selection.search = term.trim().to_string();
        self.selection.page = 1;
        self.notify();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.selection.page_size = page_size.max(1);
        self.selection.page = 1;
        self.notify();
    }

    /// Jump to a page, clamped to the available range
    pub fn set_page(&mut self, page: usize) {
        self.selection.page = page;
        self.clamp_page();
        self.notify();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.selection.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.selection.page.saturating_sub(1));
    }

    /// Current number of pages for the selection
    pub fn total_pages(&self) -> usize {
        query::total_pages(
            query::count_matches(&self.store, &self.selection),
            self.selection.page_size,
        )
    }

    fn clamp_page(&mut self) {
        let max_page = self.total_pages().max(1);
        self.selection.page = self.selection.page.clamp(1, max_page);
    }
}
