use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to extract metadata: {0}")]
    ExtractionFailed(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl From<image::ImageError> for MetadataError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => MetadataError::UnsupportedFormat(e.to_string()),
            other => MetadataError::ImageError(other.to_string()),
        }
    }
}

impl From<MetadataError> for BridgeError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::FileNotFound(path) => BridgeError::NotFound(path),
            MetadataError::Io(e) => BridgeError::Io(e),
            MetadataError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
