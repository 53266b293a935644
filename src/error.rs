use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while mirroring a single URL.
///
/// Every variant is scoped to one URL (or one filesystem target). The crawl
/// scheduler logs them at the task boundary and carries on with the rest of the
/// frontier.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {url}")]
    MissingHost { url: String },

    #[error("path of {url} escapes the output directory")]
    PathEscape { url: String },

    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
