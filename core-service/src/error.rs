use core_index::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
