use thiserror::Error;

use crate::drawing::session::SessionState;
use crate::store::feature::FeatureId;

#[derive(Error, Debug)]
pub enum AoiError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Feature {0} not found")]
    NotFound(FeatureId),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Could not write persisted features: {0}")]
    PersistenceWriteFailed(String),

    #[error("Could not read persisted features: {0}")]
    PersistenceReadFailed(String),

    #[error("Cannot {event} while {state:?}")]
    InvalidState {
        state: SessionState,
        event: &'static str,
    },

    #[error("Draw tool {0} is not enabled")]
    ToolDisabled(String),

    #[error("No feature identifiers left")]
    IdsExhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AoiError>;
