use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Media source not accessible: {0}")]
    SourceUnavailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
