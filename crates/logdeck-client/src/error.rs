use thiserror::Error;

use logdeck_types::SourceId;

/// Failures of the source, history and insights collaborators.
///
/// The `Display` text is what gets shown to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),

    #[error("Invalid request: {0}")]
    Rejected(String),

    #[error("Failed to reach log server: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timestamp not found in log file")]
    TimestampNotFound,

    #[error("No log selected. Please select a log entry first.")]
    NoLogSelected,

    /// The request succeeded but produced no content
    #[error("{0}")]
    Empty(&'static str),
}

impl ClientError {
    /// Whether this is a content problem rather than a connectivity one
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            Self::Empty(_) | Self::NoLogSelected | Self::TimestampNotFound
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
