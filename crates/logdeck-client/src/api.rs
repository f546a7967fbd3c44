use std::fmt;
use std::future::Future;
use std::str::FromStr;

use logdeck_types::{LogEvent, NewSource, Source};

use crate::error::{ClientError, Result};

/// Which side of an entry an adjacent download covers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "previous" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            other => Err(ClientError::Rejected(format!("unknown direction '{}'", other))),
        }
    }
}

/// A raw text payload offered to the user as a file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content: String,
}

/// Source CRUD
pub trait SourceApi {
    fn list(&self) -> impl Future<Output = Result<Vec<Source>>> + Send;

    fn create(&self, request: NewSource) -> impl Future<Output = Result<Source>> + Send;

    fn delete(&self, source_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Historical log retrieval
pub trait HistoryApi {
    /// Recent entries of a source, newest first
    fn fetch_initial(&self, source_id: &str)
    -> impl Future<Output = Result<Vec<LogEvent>>> + Send;

    /// `lines` raw lines before or after the line holding `timestamp`
    fn fetch_adjacent(
        &self,
        source_id: &str,
        timestamp: &str,
        direction: Direction,
        lines: usize,
    ) -> impl Future<Output = Result<Download>> + Send;

    /// The whole log file
    fn fetch_full(&self, source_id: &str) -> impl Future<Output = Result<Download>> + Send;
}

/// Opaque insights summary
pub trait InsightsApi {
    fn insights(&self) -> impl Future<Output = Result<serde_json::Value>> + Send;
}
