// Playback provider seam - everything that actually makes noise lives behind this
// The Spotify client is the real implementation, tests plug in fakes

pub mod spotify;

pub use spotify::SpotifyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A playable track as the provider knows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub artist: String,
}

impl Track {
    /// Catalog id format: "Title – Artist"
    pub fn display_id(&self) -> String {
        format!("{} – {}", self.name, self.artist)
    }
}

/// An audio output endpoint managed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("not authorized - access token missing or expired")]
    Unauthorized,

    #[error("no active device")]
    NoActiveDevice,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider call timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    /// The targeted device is gone (or there never was one). Any 404 from a
    /// player command counts, providers aren't consistent about the reason.
    pub fn is_device_gone(&self) -> bool {
        matches!(
            self,
            ProviderError::NoActiveDevice
                | ProviderError::DeviceNotFound(_)
                | ProviderError::Api { status: 404, .. }
        )
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[async_trait]
pub trait PlaybackProvider: Send + Sync {
    async fn search(&self, query: &str) -> ProviderResult<Option<Track>>;

    async fn play(&self, track: &Track, device_id: Option<&str>) -> ProviderResult<()>;

    async fn pause(&self, device_id: Option<&str>) -> ProviderResult<()>;

    async fn list_devices(&self) -> ProviderResult<Vec<Device>>;

    async fn transfer_playback(&self, device_id: &str) -> ProviderResult<()>;
}

/// Bound a provider call so a hung request can't wedge the session
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit.as_secs())),
    }
}
