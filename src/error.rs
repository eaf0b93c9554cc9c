use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Mail source error: {0}")]
    Mail(String),

    #[error("{0}")]
    Other(String),
}
