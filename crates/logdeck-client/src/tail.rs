use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use logdeck_engine::{Deduplicator, LogParser, parse_timestamp};
use logdeck_types::{LogEvent, Source, SourceId};

/// A source backed by a file on this machine
pub struct WatchedFile {
    pub source: Source,
    pub path: PathBuf,

    /// Shared by history loads and the live tail
    dedup: Mutex<Deduplicator>,

    /// Timestamp of the newest entry the tail has emitted
    last_emitted: Mutex<Option<NaiveDateTime>>,
}

impl WatchedFile {
    pub fn new(source: Source, dedup_window: usize) -> Self {
        let path = PathBuf::from(&source.log_path);
        Self {
            source,
            path,
            dedup: Mutex::new(Deduplicator::new(dedup_window)),
            last_emitted: Mutex::new(None),
        }
    }

    /// Drop duplicates and stamp the source on history entries
    pub fn admit_history(&self, events: Vec<LogEvent>) -> Vec<LogEvent> {
        let mut dedup = self.dedup.lock();
        events
            .into_iter()
            .filter(|e| !dedup.is_duplicate(e))
            .map(|e| self.stamp(e))
            .collect()
    }

    /// Like `admit_history`, but also drop entries not newer than the last
    /// one emitted
    pub fn admit_live(&self, events: Vec<LogEvent>) -> Vec<LogEvent> {
        let mut dedup = self.dedup.lock();
        let mut last = self.last_emitted.lock();
        let mut admitted = Vec::with_capacity(events.len());

        for event in events {
            if dedup.is_duplicate(&event) {
                continue;
            }
            let ts = parse_timestamp(&event.timestamp);
            if let (Some(last), Some(ts)) = (*last, ts) {
                if ts <= last {
                    continue;
                }
            }
            if ts.is_some() {
                *last = ts;
            }
            admitted.push(self.stamp(event));
        }
        admitted
    }

    fn stamp(&self, mut event: LogEvent) -> LogEvent {
        event.source_id = Some(self.source.id.clone());
        event.source_name = Some(self.source.name.clone());
        event
    }
}

/// Manages live tails of watched files
pub struct TailManager {
    /// Parent token, cancelled on shutdown
    cancel: CancellationToken,

    /// Active tail tasks
    tasks: HashMap<SourceId, (CancellationToken, tokio::task::JoinHandle<()>)>,

    poll_interval: Duration,
}

impl TailManager {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: HashMap::new(),
            poll_interval,
        }
    }

    /// Start following a file from its current end. Restarts an existing tail
    /// for the same source.
    pub fn start(&mut self, file: Arc<WatchedFile>, log_tx: mpsc::UnboundedSender<LogEvent>) {
        let id = file.source.id.clone();
        self.stop(&id);

        let token = self.cancel.child_token();
        let task = tokio::spawn(tail_file(
            file,
            log_tx,
            token.clone(),
            self.poll_interval,
        ));
        self.tasks.insert(id, (token, task));
    }

    /// Stop one tail
    pub fn stop(&mut self, source_id: &str) {
        if let Some((token, task)) = self.tasks.remove(source_id) {
            token.cancel();
            task.abort();
        }
    }

    /// Stop all tails
    pub fn stop_all(&mut self) {
        self.cancel.cancel();
        for (_, (_, task)) in self.tasks.drain() {
            task.abort();
        }
        // Fresh token for tails started later
        self.cancel = CancellationToken::new();
    }

    /// Get the number of running tails
    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|(_, t)| !t.is_finished()).count()
    }
}

impl Drop for TailManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn tail_file(
    file: Arc<WatchedFile>,
    log_tx: mpsc::UnboundedSender<LogEvent>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let mut offset = tokio::fs::metadata(&file.path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    let mut pending = Vec::new();
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                match read_appended(&file, &mut offset).await {
                    Ok(chunk) => pending.extend_from_slice(&chunk),
                    Err(e) => {
                        warn!(source = %file.source.name, error = %e, "failed to read log file");
                        continue;
                    }
                }

                let Some(complete) = take_complete_lines(&mut pending) else {
                    continue;
                };

                for event in file.admit_live(LogParser::parse_text(&complete)) {
                    if log_tx.send(event).is_err() {
                        debug!(source = %file.source.name, "push channel closed, tail stopped");
                        return;
                    }
                }
            }
        }
    }
}

/// Split off and decode everything up to the last newline. A partial last
/// line, including a character cut in half by the writer, stays buffered.
fn take_complete_lines(pending: &mut Vec<u8>) -> Option<String> {
    let end = pending.iter().rposition(|&b| b == b'\n')?;
    let rest = pending.split_off(end + 1);
    let complete = std::mem::replace(pending, rest);
    Some(String::from_utf8_lossy(&complete).into_owned())
}

/// Read bytes appended since `offset`, starting over if the file shrank
async fn read_appended(file: &WatchedFile, offset: &mut u64) -> std::io::Result<Vec<u8>> {
    let mut handle = File::open(&file.path).await?;
    let len = handle.metadata().await?.len();
    if len < *offset {
        debug!(source = %file.source.name, "log file truncated, reading from start");
        *offset = 0;
    }
    if len == *offset {
        return Ok(Vec::new());
    }

    handle.seek(SeekFrom::Start(*offset)).await?;
    let mut buf = Vec::new();
    handle.take(len - *offset).read_to_end(&mut buf).await?;
    *offset += buf.len() as u64;
    Ok(buf)
}
