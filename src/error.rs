use std::path::PathBuf;

use thiserror::Error;

/// Failure of a whole aggregation; partial outages never reach this type.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("all data sources are unavailable ({})", .feeds.join(", "))]
    AllSourcesUnavailable { feeds: Vec<String> },
}

/// Failure of a single raw-record feed.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no data file for feed {feed} under {}", .dir.display())]
    MissingFeed { feed: String, dir: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("feed {feed} is not a list of records")]
    NotAList { feed: String },
}
