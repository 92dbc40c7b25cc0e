use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid collection: {0}")]
    InvalidCollection(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("audio unavailable: {0}")]
    Audio(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

pub type Result<T> = std::result::Result<T, MatchError>;
