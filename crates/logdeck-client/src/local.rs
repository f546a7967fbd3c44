use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info};

use logdeck_engine::{LogParser, parse_timestamp};
use logdeck_types::{LogEvent, NewSource, Source};

use crate::api::{Direction, Download, HistoryApi, InsightsApi, SourceApi};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::insights::summarize;
use crate::tail::{TailManager, WatchedFile};

/// Host label used when a request leaves it empty
pub const LOCAL_HOST: &str = "localhost";

/// Backend serving log files from the local filesystem
///
/// Every created source is tailed immediately; new entries are delivered on
/// the push channel handed to `new`.
pub struct LocalBackend {
    config: ClientConfig,
    files: Arc<RwLock<Vec<Arc<WatchedFile>>>>,
    tails: Mutex<TailManager>,
    push_tx: mpsc::UnboundedSender<LogEvent>,
    next_id: AtomicU64,
}

impl LocalBackend {
    pub fn new(config: ClientConfig, push_tx: mpsc::UnboundedSender<LogEvent>) -> Self {
        let tails = TailManager::new(Duration::from_millis(config.poll_interval_ms.max(1)));
        Self {
            config,
            files: Arc::new(RwLock::new(Vec::new())),
            tails: Mutex::new(tails),
            push_tx,
            next_id: AtomicU64::new(1),
        }
    }

    /// Stop every tail
    pub fn shutdown(&self) {
        self.tails.lock().stop_all();
    }

    pub fn active_tails(&self) -> usize {
        self.tails.lock().active_count()
    }

    /// Insights over the watched files, usable from a poller task
    pub fn insights_handle(&self) -> LocalInsights {
        LocalInsights {
            files: Arc::clone(&self.files),
        }
    }

    fn file(&self, source_id: &str) -> Result<Arc<WatchedFile>> {
        self.files
            .read()
            .iter()
            .find(|f| f.source.id == source_id)
            .cloned()
            .ok_or_else(|| ClientError::SourceNotFound(source_id.to_string()))
    }

    fn forget(&self, source_id: &str) -> bool {
        self.tails.lock().stop(source_id);
        let mut files = self.files.write();
        let before = files.len();
        files.retain(|f| f.source.id != source_id);
        files.len() != before
    }
}

impl SourceApi for LocalBackend {
    async fn list(&self) -> Result<Vec<Source>> {
        Ok(self.files.read().iter().map(|f| f.source.clone()).collect())
    }

    async fn create(&self, request: NewSource) -> Result<Source> {
        if request.name.trim().is_empty() || request.log_path.trim().is_empty() {
            return Err(ClientError::Rejected(
                "name and log_path are required".to_string(),
            ));
        }

        let metadata = tokio::fs::metadata(&request.log_path).await?;
        if !metadata.is_file() {
            return Err(ClientError::Rejected(format!(
                "{} is not a file",
                request.log_path
            )));
        }

        let host = if request.host.trim().is_empty() {
            LOCAL_HOST.to_string()
        } else {
            request.host
        };

        // A new registration for the same file replaces the old one
        let replaced: Vec<_> = self
            .files
            .read()
            .iter()
            .filter(|f| f.source.host == host && f.source.log_path == request.log_path)
            .map(|f| f.source.id.clone())
            .collect();
        for id in replaced {
            info!(source_id = %id, "replacing source watching the same file");
            self.forget(&id);
        }

        let source = Source {
            id: format!("local-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            name: request.name,
            host,
            log_path: request.log_path,
        };
        let file = Arc::new(WatchedFile::new(source.clone(), self.config.dedup_window));
        self.files.write().push(Arc::clone(&file));
        self.tails.lock().start(file, self.push_tx.clone());

        info!(source_id = %source.id, path = %source.log_path, "watching log file");
        Ok(source)
    }

    async fn delete(&self, source_id: &str) -> Result<()> {
        if self.forget(source_id) {
            info!(source_id, "stopped watching log file");
            Ok(())
        } else {
            Err(ClientError::SourceNotFound(source_id.to_string()))
        }
    }
}

impl HistoryApi for LocalBackend {
    async fn fetch_initial(&self, source_id: &str) -> Result<Vec<LogEvent>> {
        let file = self.file(source_id)?;
        let text = read_lossy(&file.path).await?;

        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(self.config.initial_lines);
        let tail = lines[start..].join("\n");

        let events = file.admit_history(LogParser::parse_text(&tail));
        let mut keyed: Vec<_> = events
            .into_iter()
            .map(|e| (parse_timestamp(&e.timestamp), e))
            .collect();
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(keyed.into_iter().map(|(_, e)| e).collect())
    }

    async fn fetch_adjacent(
        &self,
        source_id: &str,
        timestamp: &str,
        direction: Direction,
        lines: usize,
    ) -> Result<Download> {
        if timestamp.is_empty() {
            return Err(ClientError::Rejected("timestamp is required".to_string()));
        }
        let file = self.file(source_id)?;
        let text = read_lossy(&file.path).await?;

        let all: Vec<&str> = text.lines().collect();
        let anchor = all
            .iter()
            .position(|line| line.contains(timestamp))
            .ok_or(ClientError::TimestampNotFound)?;

        // Previous: `lines` lines ending at the anchor. Next: `lines` lines from it.
        let range = match direction {
            Direction::Previous => (anchor + 1).saturating_sub(lines)..anchor + 1,
            Direction::Next => anchor..(anchor + lines).min(all.len()),
        };
        let selected = &all[range];
        if selected.is_empty() {
            return Err(ClientError::Empty("No logs found in the specified range"));
        }

        let mut content = selected.join("\n");
        content.push('\n');
        Ok(Download {
            file_name: format!(
                "{}_logs_{}.txt",
                direction,
                timestamp.replace([':', '.', ','], "-")
            ),
            content,
        })
    }

    async fn fetch_full(&self, source_id: &str) -> Result<Download> {
        let file = self.file(source_id)?;
        let content = read_lossy(&file.path).await?;
        if content.is_empty() {
            return Err(ClientError::Empty("Log file is empty or unreadable"));
        }
        Ok(Download {
            file_name: format!("logs_{}.txt", Local::now().format("%Y%m%d_%H%M%S")),
            content,
        })
    }
}

/// Summarizes every file a `LocalBackend` watches
#[derive(Clone)]
pub struct LocalInsights {
    files: Arc<RwLock<Vec<Arc<WatchedFile>>>>,
}

impl InsightsApi for LocalInsights {
    async fn insights(&self) -> Result<serde_json::Value> {
        let files = self.files.read().clone();
        let mut events = Vec::new();
        for file in files {
            match read_lossy(&file.path).await {
                Ok(text) => events.extend(LogParser::parse_text(&text)),
                Err(e) => debug!(source = %file.source.name, error = %e, "skipped in insights"),
            }
        }
        Ok(summarize(&events))
    }
}

async fn read_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logdeck_types::Level;
    use std::path::PathBuf;

    const SAMPLE: &str = "\
2024-01-01T10:00:00,000 INFO [main] app.Boot - starting
2024-01-01T10:00:01,000 WARN [main] app.Config - missing key
2024-01-01T10:00:02,000 ERROR [worker-1] db.Pool - query failed
java.sql.SQLException: timeout
2024-01-01T10:00:03,000 DEBUG [worker-2] http.Server - request done
";

    fn temp_log(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "logdeck-{}-{}.log",
            name,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn request(name: &str, path: &Path) -> NewSource {
        NewSource {
            name: name.to_string(),
            host: String::new(),
            log_path: path.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn backend() -> LocalBackend {
        let (tx, _rx) = mpsc::unbounded_channel();
        LocalBackend::new(ClientConfig::default(), tx)
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let path = temp_log("crud", SAMPLE);
        let backend = backend();

        let source = backend.create(request("app", &path)).await.unwrap();
        assert_eq!(source.host, LOCAL_HOST);
        assert_eq!(backend.list().await.unwrap(), vec![source.clone()]);
        assert_eq!(backend.active_tails(), 1);

        backend.delete(&source.id).await.unwrap();
        assert!(backend.list().await.unwrap().is_empty());
        assert!(matches!(
            backend.delete(&source.id).await,
            Err(ClientError::SourceNotFound(_))
        ));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_file() {
        let backend = backend();
        let missing = std::env::temp_dir().join("logdeck-definitely-missing.log");
        let err = backend.create(request("x", &missing)).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(backend.list().await.unwrap().is_empty());

        let err = backend.create(NewSource::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_same_file_replaces_source() {
        let path = temp_log("replace", SAMPLE);
        let backend = backend();
        let first = backend.create(request("one", &path)).await.unwrap();
        let second = backend.create(request("two", &path)).await.unwrap();

        assert_ne!(first.id, second.id);
        let ids: Vec<_> = backend
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id]);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_fetch_initial_newest_first() {
        let path = temp_log("initial", SAMPLE);
        let backend = backend();
        let source = backend.create(request("app", &path)).await.unwrap();

        let events = backend.fetch_initial(&source.id).await.unwrap();
        let levels: Vec<_> = events.iter().map(|e| e.level.clone()).collect();
        assert_eq!(
            levels,
            vec![Level::Debug, Level::Error, Level::Warn, Level::Info]
        );
        assert_eq!(events[1].message, "query failed");
        assert!(events.iter().all(|e| e.source_id.as_deref() == Some(source.id.as_str())));

        // Already delivered entries are suppressed on a second load
        assert!(backend.fetch_initial(&source.id).await.unwrap().is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_fetch_adjacent() {
        let path = temp_log("adjacent", SAMPLE);
        let backend = backend();
        let source = backend.create(request("app", &path)).await.unwrap();

        let prev = backend
            .fetch_adjacent(&source.id, "2024-01-01T10:00:01,000", Direction::Previous, 2)
            .await
            .unwrap();
        assert_eq!(prev.content.lines().count(), 2);
        assert!(prev.content.ends_with("missing key\n"));
        assert_eq!(prev.file_name, "previous_logs_2024-01-01T10-00-01-000.txt");

        let next = backend
            .fetch_adjacent(&source.id, "2024-01-01T10:00:02,000", Direction::Next, 10)
            .await
            .unwrap();
        assert_eq!(next.content.lines().count(), 3);
        assert!(next.content.starts_with("2024-01-01T10:00:02,000 ERROR"));

        let err = backend
            .fetch_adjacent(&source.id, "1999-01-01", Direction::Next, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TimestampNotFound));
        assert!(err.is_empty_result());

        let err = backend
            .fetch_adjacent(&source.id, "2024-01-01T10:00:02,000", Direction::Next, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Empty(_)));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_fetch_full() {
        let path = temp_log("full", SAMPLE);
        let empty = temp_log("full-empty", "");
        let backend = backend();
        let source = backend.create(request("app", &path)).await.unwrap();
        let blank = backend.create(request("blank", &empty)).await.unwrap();

        let full = backend.fetch_full(&source.id).await.unwrap();
        assert_eq!(full.content, SAMPLE);
        assert!(full.file_name.starts_with("logs_"));

        let err = backend.fetch_full(&blank.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Empty(_)));

        let err = backend.fetch_full("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::SourceNotFound(_)));
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(empty);
    }

    #[tokio::test]
    async fn test_insights_follow_watched_files() {
        let path = temp_log("insights", SAMPLE);
        let backend = backend();
        let insights = backend.insights_handle();

        let empty = insights.insights().await.unwrap();
        assert_eq!(empty["summary"]["total_logs"], 0);

        let source = backend.create(request("app", &path)).await.unwrap();
        let summary = insights.insights().await.unwrap();
        assert_eq!(summary["summary"]["total_logs"], 4);
        assert_eq!(summary["summary"]["error_rate"], 0.25);
        assert_eq!(summary["anomalies"][0]["type"], "error_hotspot");

        backend.delete(&source.id).await.unwrap();
        let summary = insights.insights().await.unwrap();
        assert_eq!(summary["summary"]["total_logs"], 0);
        let _ = std::fs::remove_file(path);
    }
}
