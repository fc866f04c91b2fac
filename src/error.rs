// Error taxonomy for the walk-up core
// Nothing in here is fatal - the session turns these into outcome values

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkupError {
    #[error("assignment store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("playback provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no track found for '{song}'")]
    TrackNotFound { song: String },

    #[error("no active playback device - open Spotify on a phone or computer")]
    NoActiveDevice,

    #[error("invalid assignment for {name}: {reason}")]
    InvalidAssignment { name: String, reason: String },

    #[error("no lineup")]
    EmptyLineup,

    #[error("playlist has no songs")]
    EmptyCatalog,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ProviderError> for WalkupError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NoActiveDevice | ProviderError::DeviceNotFound(_) => WalkupError::NoActiveDevice,
            other => WalkupError::ProviderUnavailable(other.to_string()),
        }
    }
}

pub type WalkupResult<T> = std::result::Result<T, WalkupError>;
