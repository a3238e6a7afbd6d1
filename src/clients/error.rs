use thiserror::Error;

/// Failure to durably save a document through the storage API
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("invalid storage url '{0}'")]
    InvalidUrl(String),
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("storage rejected save ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{0}'")]
    InvalidUrl(String),
    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("save failed: {0}")]
    Persistence(#[from] PersistenceError),
}
