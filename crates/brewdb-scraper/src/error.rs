use brewdb_core::SourceId;
use thiserror::Error;

/// Failure of a single fetch attempt. Every kind is retried by
/// [`crate::retry::RetryPolicy`]; the last one is kept in [`ScraperError::Fetch`].
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {secs}s loading {url}")]
    Timeout { url: String, secs: u64 },

    #[error("browser navigation failed: {0}")]
    Browser(String),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("failed to fetch {target} after {attempts} attempts: {source}")]
    Fetch {
        target: String,
        attempts: u32,
        #[source]
        source: AttemptError,
    },

    #[error("pagination limit reached for {source_id}: exceeded {max_pages} pages")]
    PaginationLimitExceeded { source_id: SourceId, max_pages: usize },

    #[error("parse error for {context}: {reason}")]
    Parse { context: String, reason: String },

    #[error("malformed {source_id} item {item}: {reason}")]
    MalformedRawItem {
        source_id: SourceId,
        item: String,
        reason: String,
    },

    #[error("browser session error: {0}")]
    BrowserSession(String),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ScraperError {
    pub(crate) fn parse(context: impl Into<String>, reason: impl ToString) -> Self {
        ScraperError::Parse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
