use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unexpected envelope shape: {0}")]
    Shape(String),
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
    #[error("encode error: {0}")]
    Encode(String),
}
