//! Shared types for logdeck
//!
//! This crate contains data structures used across multiple logdeck crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Opaque, server-assigned source identifier
pub type SourceId = String;

// ============================================================================
// Source Types
// ============================================================================

/// One monitored log origin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub host: String,
    pub log_path: String,
}

impl Source {
    pub fn new(id: impl Into<SourceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: String::new(),
            log_path: String::new(),
        }
    }
}

/// Registration request for a new source
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub log_path: String,
}

impl fmt::Debug for NewSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSource")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("log_path", &self.log_path)
            .finish()
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
///
/// Unrecognized labels are carried through untouched in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Other(String),
}

impl Level {
    /// Parse a level label; only the four canonical names are recognized
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("ERROR") {
            Self::Error
        } else if s.eq_ignore_ascii_case("WARN") {
            Self::Warn
        } else if s.eq_ignore_ascii_case("INFO") {
            Self::Info
        } else if s.eq_ignore_ascii_case("DEBUG") {
            Self::Debug
        } else {
            Self::Other(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        match level {
            Level::Other(s) => s,
            standard => standard.as_str().to_string(),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single structured log event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// ISO-8601 timestamp with sub-second precision, e.g. `2024-01-01T10:00:00,000`
    #[serde(default)]
    pub timestamp: String,

    pub level: Level,

    #[serde(default)]
    pub thread: String,

    #[serde(default)]
    pub component: String,

    #[serde(default)]
    pub message: String,

    /// Backfilled at ingestion when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,

    /// Display name of the originating source (set by backends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl LogEvent {
    /// Create an event with empty thread/component
    pub fn new(timestamp: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            level,
            thread: String::new(),
            component: String::new(),
            message: message.into(),
            source_id: None,
            source_name: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<SourceId>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Identity used to suppress re-delivered entries
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.timestamp, self.level, self.component, self.message
        )
    }

    /// Decode one push-channel message
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

// ============================================================================
// Counters
// ============================================================================

/// Counts per log level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub error: u64,
    pub warn: u64,
    pub info: u64,
    pub debug: u64,
    /// Events whose level is none of the four standard ones
    pub other: u64,
}

impl LevelCounts {
    pub fn increment(&mut self, level: &Level) {
        match level {
            Level::Error => self.error += 1,
            Level::Warn => self.warn += 1,
            Level::Info => self.info += 1,
            Level::Debug => self.debug += 1,
            Level::Other(_) => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.error + self.warn + self.info + self.debug + self.other
    }
}

impl Add for LevelCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for LevelCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.error += rhs.error;
        self.warn += rhs.warn;
        self.info += rhs.info;
        self.debug += rhs.debug;
        self.other += rhs.other;
    }
}

impl std::iter::Sum for LevelCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_passes_unknown_through() {
        assert_eq!(Level::parse("ERROR"), Level::Error);
        assert_eq!(Level::parse("warn"), Level::Warn);
        assert_eq!(Level::parse("FATAL"), Level::Other("FATAL".to_string()));
        assert_eq!(String::from(Level::Other("TRACE".to_string())), "TRACE");
    }

    #[test]
    fn test_event_from_json() {
        let event = LogEvent::from_json(
            r#"{"timestamp":"2024-01-01T10:00:00,000","level":"ERROR","thread":"main",
                "component":"db","message":"boom","source_id":"A"}"#,
        )
        .unwrap();
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.source_id.as_deref(), Some("A"));
        assert!(event.source_name.is_none());
    }

    #[test]
    fn test_event_json_without_source() {
        let event =
            LogEvent::from_json(r#"{"timestamp":"t","level":"NOTICE","message":"m"}"#).unwrap();
        assert_eq!(event.level, Level::Other("NOTICE".to_string()));
        assert!(event.source_id.is_none());
        assert_eq!(event.thread, "");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""level":"NOTICE""#));
        assert!(!json.contains("source_id"));
    }

    #[test]
    fn test_level_counts_sum() {
        let mut a = LevelCounts::default();
        a.increment(&Level::Error);
        a.increment(&Level::Error);
        let mut b = LevelCounts::default();
        b.increment(&Level::Warn);
        b.increment(&Level::Other("X".into()));

        let total: LevelCounts = [a, b].into_iter().sum();
        assert_eq!(total.error, 2);
        assert_eq!(total.warn, 1);
        assert_eq!(total.other, 1);
        assert_eq!(total.total(), 4);
    }

    #[test]
    fn test_new_source_debug_hides_password() {
        let req = NewSource {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", req).contains("hunter2"));
    }
}
