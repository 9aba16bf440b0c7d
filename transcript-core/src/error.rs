use thiserror::Error;

/// Failure reading from a raw record feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a whole transcript fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Task ID is required")]
    MissingTaskId,
    #[error("failed to read records: {0}")]
    Feed(#[from] FeedError),
}

impl FetchError {
    /// HTTP-style status code for the response envelope
    pub fn status(&self) -> u16 {
        match self {
            FetchError::MissingTaskId => 400,
            FetchError::Feed(_) => 500,
        }
    }
}
