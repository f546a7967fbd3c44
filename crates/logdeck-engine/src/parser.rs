use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;

use logdeck_types::{Level, LogEvent};

/// `2024-01-19T19:41:56,123 INFO [main] com.example.Class - Message`
static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2},\d{3})\s+(\w+)\s+\[([^\]]+)\]\s+([^\s-]+)\s*-\s*(.+)",
    )
    .expect("valid log line pattern")
});

static ENTRY_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2},\d{3}").expect("valid entry start pattern")
});

/// Parser for the application log line format
pub struct LogParser;

impl LogParser {
    /// Parse one entry. Only the first line becomes the message; continuation
    /// lines are consumed but not kept.
    pub fn parse(text: &str) -> Option<LogEvent> {
        let caps = LINE_PATTERN.captures(text)?;
        Some(LogEvent {
            timestamp: caps[1].to_string(),
            level: Level::parse(&caps[2]),
            thread: caps[3].to_string(),
            component: caps[4].to_string(),
            message: caps[5].trim().to_string(),
            source_id: None,
            source_name: None,
        })
    }

    /// Whether a line begins a new entry (as opposed to continuing one)
    pub fn starts_entry(line: &str) -> bool {
        ENTRY_START.is_match(line)
    }

    /// Parse a block of text, in file order. Unparseable entries are skipped.
    pub fn parse_text(text: &str) -> Vec<LogEvent> {
        let mut grouper = LineGrouper::default();
        let mut events = Vec::new();
        for line in text.lines() {
            if let Some(entry) = grouper.push(line) {
                events.extend(Self::parse(&entry));
            }
        }
        if let Some(entry) = grouper.finish() {
            events.extend(Self::parse(&entry));
        }
        events
    }
}

/// Groups continuation lines (stack traces etc.) with the entry they follow
#[derive(Debug, Default)]
pub struct LineGrouper {
    current: String,
}

impl LineGrouper {
    /// Feed one line; returns the previous entry once a new one starts.
    /// Blank lines are ignored and surrounding whitespace is trimmed.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if LogParser::starts_entry(line) {
            let finished = std::mem::replace(&mut self.current, line.to_string());
            (!finished.is_empty()).then_some(finished)
        } else {
            if !self.current.is_empty() {
                self.current.push('\n');
            }
            self.current.push_str(line);
            None
        }
    }

    /// Take whatever entry is still pending
    pub fn finish(&mut self) -> Option<String> {
        let pending = std::mem::take(&mut self.current);
        (!pending.is_empty()).then_some(pending)
    }
}

/// Remembers the last `capacity` entries seen to suppress re-deliveries
#[derive(Debug)]
pub struct Deduplicator {
    recent: VecDeque<String>,
    seen: HashSet<String>,
    capacity: usize,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// True if the event was seen recently; otherwise remembers it
    pub fn is_duplicate(&mut self, event: &LogEvent) -> bool {
        let key = event.dedup_key();
        if self.seen.contains(&key) {
            return true;
        }
        if self.recent.len() >= self.capacity {
            if let Some(oldest) = self.recent.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.recent.push_back(key);
        false
    }
}
