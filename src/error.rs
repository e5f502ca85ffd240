use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to fetch {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },
    #[error("discarded non-positive price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
    #[error("state persistence failed: {0}")]
    Persistence(String),
    #[error("notification delivery failed: {0}")]
    Notify(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }
}
