use areacrawl_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Environment variable {0} not found")]
    MissingCredential(String),

    #[error("Insert for area {0} affected no rows")]
    NoRowsAffected(String),

    #[error("Crawl run {0} not found")]
    UnknownRun(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
