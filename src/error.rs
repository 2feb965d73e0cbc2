use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SigError {
    #[error("DOM not available")]
    DomUnavailable,
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Canvas context unavailable")]
    NoContext2d,
    #[error("Operation failed: {0}")]
    OpFailed(String),

    #[error("Invalid surface dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid device pixel ratio: {0}")]
    InvalidPixelRatio(f32),
    #[error("Invalid color {input:?}: {reason}")]
    InvalidColor { input: String, reason: String },

    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),
    #[error("Base64 payload rejected: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Image codec failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Signature surface is not mounted")]
    Unmounted,
    #[error("Please draw a signature first")]
    EmptySignature
}
