use std::collections::VecDeque;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use logdeck_types::Level;

use crate::config::DEFAULT_SERIES_CAPACITY;
use crate::time::parse_second;

/// One second of activity
#[derive(Clone, Debug, PartialEq, Eq)]
struct Bucket {
    label: String,
    /// Full date and second, when the timestamp parsed
    at: Option<NaiveDateTime>,
    /// ERROR, WARN, INFO, DEBUG
    counts: [u64; 4],
}

impl Bucket {
    fn new(label: &str, at: Option<NaiveDateTime>) -> Self {
        Self {
            label: label.to_string(),
            at,
            counts: [0; 4],
        }
    }

    /// Whether an event for `key`/`at` should open a bucket after this one
    fn is_followed_by(&self, key: &str, at: Option<NaiveDateTime>) -> bool {
        match (self.at, at) {
            (Some(last), Some(next)) => next > last,
            _ => self.label != key,
        }
    }
}

/// Column-oriented copy of the series, ready for charting
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub error: Vec<u64>,
    pub warn: Vec<u64>,
    pub info: Vec<u64>,
    pub debug: Vec<u64>,
}

impl SeriesSnapshot {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fixed-capacity series of per-second level counts
///
/// Each bucket carries its label and all four counters together, so eviction
/// can never leave the columns at different lengths.
#[derive(Debug)]
pub struct TimeSeries {
    buckets: VecDeque<Bucket>,
    capacity: usize,
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_CAPACITY)
    }
}

impl TimeSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buckets: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Count one event against the bucket for its second.
    ///
    /// A second later than the last bucket's opens a new bucket (evicting the
    /// oldest past capacity). Late events whose second is older than the last
    /// bucket land in the last bucket. Timestamps that only yield a label are
    /// compared by label. Levels outside the four standard ones advance the
    /// window but are not counted.
    pub fn record(&mut self, timestamp: &str, level: &Level) -> bool {
        let Some(key) = bucket_key(timestamp) else {
            debug!(timestamp, "timestamp has no time component, not charted");
            return false;
        };

        let at = parse_second(timestamp);
        if self
            .buckets
            .back()
            .is_none_or(|last| last.is_followed_by(key, at))
        {
            self.buckets.push_back(Bucket::new(key, at));
            if self.buckets.len() > self.capacity {
                self.buckets.pop_front();
            }
        }

        if let (Some(slot), Some(last)) = (level_slot(level), self.buckets.back_mut()) {
            last.counts[slot] += 1;
        }
        true
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let mut snapshot = SeriesSnapshot {
            labels: Vec::with_capacity(self.buckets.len()),
            error: Vec::with_capacity(self.buckets.len()),
            warn: Vec::with_capacity(self.buckets.len()),
            info: Vec::with_capacity(self.buckets.len()),
            debug: Vec::with_capacity(self.buckets.len()),
        };
        for bucket in &self.buckets {
            snapshot.labels.push(bucket.label.clone());
            snapshot.error.push(bucket.counts[0]);
            snapshot.warn.push(bucket.counts[1]);
            snapshot.info.push(bucket.counts[2]);
            snapshot.debug.push(bucket.counts[3]);
        }
        snapshot
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Wall-clock second of a timestamp: the text between the date/time
/// separator and the fractional-second (or zone) separator.
pub fn bucket_key(timestamp: &str) -> Option<&str> {
    let (_, time) = timestamp.split_once('T')?;
    let end = time
        .find([',', '.', 'Z', '+', '-'])
        .unwrap_or(time.len());
    let key = &time[..end];
    (!key.is_empty()).then_some(key)
}

fn level_slot(level: &Level) -> Option<usize> {
    match level {
        Level::Error => Some(0),
        Level::Warn => Some(1),
        Level::Info => Some(2),
        Level::Debug => Some(3),
        Level::Other(_) => None,
    }
}
