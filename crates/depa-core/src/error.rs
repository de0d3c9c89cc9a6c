use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported format '{extension}'. Supported: pdf, csv, xlsx, xls")]
    UnsupportedFormat { extension: String },

    #[error("could not parse document: {0}")]
    Format(String),

    #[error("extraction timed out after {elapsed:?} before any content was decoded")]
    Timeout { elapsed: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
