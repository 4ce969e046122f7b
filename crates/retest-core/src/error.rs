use std::path::PathBuf;
use thiserror::Error;

/// Core error type for retest operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid test pattern `{pattern}`: {source}")]
    TestPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("Invalid entry glob `{pattern}`: {source}")]
    EntryGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to spawn test worker `{program}`: {source}")]
    WorkerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
