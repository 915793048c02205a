use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Discovery cancelled")]
    Cancelled,

    #[error("Sync timed out after {0:?}")]
    Timeout(Duration),

    #[error("Media index error: {0}")]
    MediaIndex(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
