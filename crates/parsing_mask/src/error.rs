use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("No target labels provided. Set target_labels or target_groups.")]
    NoTargetSelected,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("Invalid mask parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for MaskError {
    fn from(err: image::ImageError) -> Self {
        MaskError::InvalidImage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MaskError>;
