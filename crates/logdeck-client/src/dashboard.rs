use tracing::{debug, info, warn};

use logdeck_engine::{BatchSummary, Engine};
use logdeck_types::{LogEvent, NewSource, Source};

use crate::api::{Direction, Download, HistoryApi, SourceApi};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// One dashboard session: the engine plus the backend it talks to.
///
/// Backend calls happen first; the engine is only touched once a call has
/// succeeded, so a failed request leaves the engine as it was.
pub struct Dashboard<B> {
    engine: Engine,
    backend: B,
    config: ClientConfig,
}

impl<B> Dashboard<B>
where
    B: SourceApi + HistoryApi,
{
    pub fn new(engine: Engine, backend: B, config: ClientConfig) -> Self {
        Self {
            engine,
            backend,
            config,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register every source the backend already knows about.
    /// With none, the engine is reset to its empty baseline.
    pub async fn load_sources(&mut self) -> Result<usize> {
        let sources = self.backend.list().await?;
        let count = sources.len();
        for source in sources {
            self.engine.register_source(source);
        }
        if !self.engine.has_any() {
            self.engine.reset();
        }
        Ok(count)
    }

    /// Create a source, select it, and load its recent history.
    ///
    /// A source already watching the same host and path is dropped from the
    /// engine first. A failed history load keeps the source registered.
    pub async fn add_source(&mut self, request: NewSource) -> Result<Source> {
        let source = self.backend.create(request).await?;

        while let Some(old) = self
            .engine
            .registry()
            .find_by_origin(&source.host, &source.log_path)
            .filter(|s| s.id != source.id)
            .map(|s| s.id.clone())
        {
            self.engine.remove_source(&old);
        }

        self.engine.register_source(source.clone());
        self.engine.select_source(Some(&source.id));

        match self.backend.fetch_initial(&source.id).await {
            Ok(events) => {
                let summary = self.apply_initial_history(&source.id, events);
                info!(
                    source_id = %source.id,
                    loaded = summary.accepted,
                    "initial history loaded"
                );
            }
            Err(e) => warn!(source_id = %source.id, error = %e, "failed to load initial history"),
        }

        Ok(source)
    }

    /// Ingest a history response (newest first) in chronological order.
    ///
    /// Discarded if the source was removed while the request was in flight.
    pub fn apply_initial_history(
        &mut self,
        source_id: &str,
        events: Vec<LogEvent>,
    ) -> BatchSummary {
        if !self.engine.contains(source_id) {
            debug!(source_id, "source removed before history arrived, discarding");
            return BatchSummary::default();
        }
        self.engine.ingest_batch(events.into_iter().rev())
    }

    /// Delete a source on the backend, then forget it locally
    pub async fn remove_source(&mut self, source_id: &str) -> Result<()> {
        self.backend.delete(source_id).await?;
        self.engine.remove_source(source_id);
        Ok(())
    }

    /// Raw lines around an entry.
    ///
    /// An entry without a source falls back to the selected source, as it
    /// would when opened from a single-source view.
    pub async fn download_adjacent(
        &self,
        entry: Option<&LogEvent>,
        direction: Direction,
    ) -> Result<Download> {
        let entry = entry.ok_or(ClientError::NoLogSelected)?;
        let source_id = entry
            .source_id
            .as_deref()
            .or(self.engine.selection().source.as_deref())
            .ok_or(ClientError::NoLogSelected)?;

        let download = self
            .backend
            .fetch_adjacent(
                source_id,
                &entry.timestamp,
                direction,
                self.config.adjacent_lines,
            )
            .await?;
        if download.content.is_empty() {
            return Err(ClientError::Empty("No log content received"));
        }
        Ok(download)
    }

    /// The complete log file of a source
    pub async fn download_full(&self, source_id: &str) -> Result<Download> {
        let download = self.backend.fetch_full(source_id).await?;
        if download.content.is_empty() {
            return Err(ClientError::Empty("No log content received"));
        }
        Ok(download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_types::Level;
    use parking_lot::Mutex;

    /// In-memory backend with switchable failures
    #[derive(Default)]
    struct FakeBackend {
        sources: Mutex<Vec<Source>>,
        history: Mutex<Vec<LogEvent>>,
        fail_create: bool,
        fail_delete: bool,
        adjacent_content: String,
        requested: Mutex<Vec<(String, String, usize)>>,
    }

    impl SourceApi for FakeBackend {
        async fn list(&self) -> Result<Vec<Source>> {
            Ok(self.sources.lock().clone())
        }

        async fn create(&self, request: NewSource) -> Result<Source> {
            if self.fail_create {
                return Err(ClientError::Transport(std::io::Error::other("down")));
            }
            let mut sources = self.sources.lock();
            let source = Source {
                id: format!("id-{}", sources.len() + 1),
                name: request.name,
                host: request.host,
                log_path: request.log_path,
            };
            sources.push(source.clone());
            Ok(source)
        }

        async fn delete(&self, source_id: &str) -> Result<()> {
            if self.fail_delete {
                return Err(ClientError::Transport(std::io::Error::other("down")));
            }
            self.sources.lock().retain(|s| s.id != source_id);
            Ok(())
        }
    }

    impl HistoryApi for FakeBackend {
        async fn fetch_initial(&self, source_id: &str) -> Result<Vec<LogEvent>> {
            Ok(self
                .history
                .lock()
                .iter()
                .cloned()
                .map(|e| e.with_source(source_id))
                .collect())
        }

        async fn fetch_adjacent(
            &self,
            source_id: &str,
            timestamp: &str,
            direction: Direction,
            lines: usize,
        ) -> Result<Download> {
            self.requested
                .lock()
                .push((source_id.to_string(), timestamp.to_string(), lines));
            Ok(Download {
                file_name: format!("{}_logs.txt", direction),
                content: self.adjacent_content.clone(),
            })
        }

        async fn fetch_full(&self, _source_id: &str) -> Result<Download> {
            Ok(Download {
                file_name: "logs.txt".to_string(),
                content: String::new(),
            })
        }
    }

    fn request(name: &str, path: &str) -> NewSource {
        NewSource {
            name: name.to_string(),
            host: "web-1".to_string(),
            log_path: path.to_string(),
            ..Default::default()
        }
    }

    fn dashboard(backend: FakeBackend) -> Dashboard<FakeBackend> {
        Dashboard::new(Engine::default(), backend, ClientConfig::default())
    }

    fn history() -> Vec<LogEvent> {
        // Newest first, as the history API returns it
        vec![
            LogEvent::new("2024-01-01T10:00:02,000", Level::Error, "c"),
            LogEvent::new("2024-01-01T10:00:01,000", Level::Warn, "b"),
            LogEvent::new("2024-01-01T10:00:00,000", Level::Info, "a"),
        ]
    }

    #[tokio::test]
    async fn test_add_source_selects_and_loads_history() {
        let backend = FakeBackend {
            history: Mutex::new(history()),
            ..Default::default()
        };
        let mut dash = dashboard(backend);

        let source = dash.add_source(request("app", "/var/log/app.log")).await.unwrap();
        let engine = dash.engine();
        assert_eq!(engine.selection().source.as_deref(), Some(source.id.as_str()));
        assert_eq!(engine.stats(Some(&source.id)).total(), 3);

        // Chronological ingestion gives one bucket per second
        assert_eq!(
            engine.series().labels,
            vec!["10:00:00", "10:00:01", "10:00:02"]
        );
        let page = engine.view();
        assert_eq!(page.entries[0].message, "c");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_engine_untouched() {
        let mut dash = dashboard(FakeBackend {
            fail_create: true,
            ..Default::default()
        });
        let before = dash.engine().revision();
        let err = dash.add_source(request("app", "/a.log")).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!dash.engine().has_any());
        assert_eq!(dash.engine().revision(), before);
    }

    #[tokio::test]
    async fn test_same_origin_replaces_engine_source() {
        let mut dash = dashboard(FakeBackend::default());
        let first = dash.add_source(request("one", "/a.log")).await.unwrap();
        let early =
            LogEvent::new("2024-01-01T10:00:00,000", Level::Error, "x").with_source(&first.id);
        dash.engine_mut().ingest(early);

        let second = dash.add_source(request("two", "/a.log")).await.unwrap();
        assert!(!dash.engine().contains(&first.id));
        assert!(dash.engine().contains(&second.id));
        assert_eq!(dash.engine().stats(None).error, 0);
    }

    #[tokio::test]
    async fn test_history_for_removed_source_is_discarded() {
        let mut dash = dashboard(FakeBackend::default());
        let summary = dash.apply_initial_history(
            "gone",
            history().into_iter().map(|e| e.with_source("gone")).collect(),
        );
        assert_eq!(summary, BatchSummary::default());
        assert!(!dash.engine().contains("gone"));
    }

    #[tokio::test]
    async fn test_remove_source() {
        let mut dash = dashboard(FakeBackend::default());
        let a = dash.add_source(request("a", "/a.log")).await.unwrap();
        let b = dash.add_source(request("b", "/b.log")).await.unwrap();

        dash.remove_source(&b.id).await.unwrap();
        assert_eq!(dash.engine().selection().source, None);
        assert!(dash.engine().contains(&a.id));

        dash.remove_source(&a.id).await.unwrap();
        assert!(!dash.engine().has_any());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_source() {
        let mut dash = dashboard(FakeBackend {
            fail_delete: true,
            ..Default::default()
        });
        let a = dash.add_source(request("a", "/a.log")).await.unwrap();
        assert!(dash.remove_source(&a.id).await.is_err());
        assert!(dash.engine().contains(&a.id));
    }

    #[tokio::test]
    async fn test_load_sources() {
        let backend = FakeBackend::default();
        backend.sources.lock().push(Source::new("s1", "one"));
        backend.sources.lock().push(Source::new("s2", "two"));
        let mut dash = dashboard(backend);

        assert_eq!(dash.load_sources().await.unwrap(), 2);
        let ids: Vec<_> = dash.engine().registry().iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let mut empty = dashboard(FakeBackend::default());
        assert_eq!(empty.load_sources().await.unwrap(), 0);
        assert!(!empty.engine().has_any());
    }

    #[tokio::test]
    async fn test_download_adjacent() {
        let mut dash = dashboard(FakeBackend {
            adjacent_content: "line\n".to_string(),
            ..Default::default()
        });

        let err = dash.download_adjacent(None, Direction::Next).await.unwrap_err();
        assert!(matches!(err, ClientError::NoLogSelected));

        let orphan = LogEvent::new("2024-01-01T10:00:00,000", Level::Info, "m");
        let err = dash
            .download_adjacent(Some(&orphan), Direction::Next)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoLogSelected));

        let source = dash.add_source(request("a", "/a.log")).await.unwrap();
        let download = dash
            .download_adjacent(Some(&orphan), Direction::Previous)
            .await
            .unwrap();
        assert_eq!(download.file_name, "previous_logs.txt");
        let requested = dash.backend().requested.lock().clone();
        assert_eq!(
            requested,
            vec![(source.id.clone(), orphan.timestamp.clone(), 1000)]
        );
    }

    #[tokio::test]
    async fn test_empty_downloads_are_errors() {
        let mut dash = dashboard(FakeBackend::default());
        let source = dash.add_source(request("a", "/a.log")).await.unwrap();

        let entry =
            LogEvent::new("2024-01-01T10:00:00,000", Level::Info, "m").with_source(&source.id);
        let err = dash
            .download_adjacent(Some(&entry), Direction::Next)
            .await
            .unwrap_err();
        assert!(err.is_empty_result());

        let err = dash.download_full(&source.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Empty(_)));
    }
}
