use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Fatal stream error while walking an upstream document. Covers both
    /// real syntax errors and transport failures injected mid-body, which
    /// surface to the parser as I/O errors.
    #[error("malformed {doc} document: {source}")]
    MalformedDocument {
        doc: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("price cache read failed at {path}: {source}")]
    CacheRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("price cache decode failed at {path}: {source}")]
    CacheDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("price cache write failed at {path}: {source}")]
    CacheWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
