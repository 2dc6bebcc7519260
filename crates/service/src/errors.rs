use models::errors::ModelError;
use thiserror::Error;

/// Failures surfaced by the transport and the collection store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error during {action}: {message}")]
    Transport { action: &'static str, message: String },
    #[error("{action} failed ({status}): {body}")]
    Http { action: &'static str, status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{collection} still occupied after {attempts} attempts")]
    OccupiedTimeout { collection: &'static str, attempts: u32 },
    #[error("failed to load {collection}: {source}")]
    LoadFailed {
        collection: &'static str,
        #[source]
        source: Box<StoreError>,
    },
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

impl StoreError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::Transport { .. } => 2001,
            StoreError::Http { .. } => 2002,
            StoreError::Decode(_) => 2101,
            StoreError::OccupiedTimeout { .. } => 2201,
            StoreError::LoadFailed { .. } => 2202,
            StoreError::InvalidPatch(_) => 2301,
        }
    }

    /// True for failures that happened on the wire rather than in our data.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport { .. } | StoreError::Http { .. })
    }
}

impl From<ModelError> for StoreError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidPatch(msg) => StoreError::InvalidPatch(msg),
            other => StoreError::Decode(other.to_string()),
        }
    }
}
