use thiserror::Error;

/// Errors surfaced at the crate's public seams.
///
/// Internal task bodies use `anyhow::Result` and convert into one of these
/// variants only at the point where the error needs to be logged or reported
/// to a caller.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("fetch failed for {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("extraction failed for {url}: {reason}")]
    ExtractFailed { url: String, reason: String },

    #[error("WARC write failed: {source}")]
    WriteFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("scheduler error: {0}")]
    SchedulerFatal(String),
}
