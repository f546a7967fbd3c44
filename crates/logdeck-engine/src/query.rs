use std::fmt;
use std::str::FromStr;

use logdeck_types::{Level, LogEvent, SourceId};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::store::{ArcLogEvent, LogStore};
use crate::time::parse_timestamp;

/// Level filter of the log table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LevelFilter {
    #[default]
    All,
    Only(Level),
}

impl LevelFilter {
    pub fn matches(&self, level: &Level) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == level,
        }
    }
}

impl FromStr for LevelFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            Ok(Self::Only(Level::parse(s)))
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(level) => write!(f, "{}", level),
        }
    }
}

/// What the user is currently looking at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Selected source (None = aggregate view)
    pub source: Option<SourceId>,

    pub filter: LevelFilter,

    /// Case-insensitive search term (empty = no search)
    pub search: String,

    /// 1-indexed page
    pub page: usize,

    pub page_size: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl Selection {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            source: None,
            filter: LevelFilter::All,
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }
}

/// One page of the filtered, time-sorted view
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub entries: Vec<ArcLogEvent>,

    /// Page that was requested
    pub page: usize,

    /// Number of entries matching the filter across all pages
    pub total_matches: usize,

    /// `ceil(total_matches / page_size)`
    pub total_pages: usize,
}

/// Every entry matching the selection, newest first.
///
/// The sort is stable, so entries with equal timestamps keep the order of
/// the store's concatenation. Unparseable timestamps sort last.
pub fn filtered(store: &LogStore, selection: &Selection) -> Vec<ArcLogEvent> {
    let term = selection.search.to_lowercase();
    let mut keyed: Vec<_> = store
        .logs_for(selection.source.as_deref())
        .into_iter()
        .filter(|e| selection.filter.matches(&e.level) && matches_search(e, &term))
        .map(|e| (parse_timestamp(&e.timestamp), e))
        .collect();

    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, e)| e).collect()
}

/// Number of matching entries, without materializing the sorted view
pub fn count_matches(store: &LogStore, selection: &Selection) -> usize {
    let term = selection.search.to_lowercase();
    store
        .logs_for(selection.source.as_deref())
        .iter()
        .filter(|e| selection.filter.matches(&e.level) && matches_search(e, &term))
        .count()
}

/// Slice the requested page out of the filtered view.
///
/// A page past the end yields no entries; the page is never clamped here.
pub fn query(store: &LogStore, selection: &Selection) -> Page {
    let matches = filtered(store, selection);
    let page_size = selection.page_size.max(1);
    let total_matches = matches.len();
    let start = selection.page.saturating_sub(1).saturating_mul(page_size);

    Page {
        entries: matches.into_iter().skip(start).take(page_size).collect(),
        page: selection.page,
        total_matches,
        total_pages: total_pages(total_matches, page_size),
    }
}

pub fn total_pages(matches: usize, page_size: usize) -> usize {
    matches.div_ceil(page_size.max(1))
}

/// `term` must already be lowercased
fn matches_search(entry: &LogEvent, term: &str) -> bool {
    term.is_empty()
        || entry.message.to_lowercase().contains(term)
        || entry.component.to_lowercase().contains(term)
        || entry.thread.to_lowercase().contains(term)
}
