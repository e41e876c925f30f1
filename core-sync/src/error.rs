use bridge_traits::BridgeError;
use core_index::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source enumeration failed: {0}")]
    Source(#[from] BridgeError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
