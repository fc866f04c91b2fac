// Spotify Web API client - search, playback control and playlist reads
// Auth is out of scope here: we take a ready-made bearer token from config/env

use super::{Device, PlaybackProvider, ProviderError, ProviderResult, Track};
use crate::catalog::{Catalog, CatalogSource};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    access_token: String,
    playlist_id: Option<String>,
}

impl SpotifyClient {
    pub fn new(access_token: String, timeout: Duration) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            access_token,
            playlist_id: None,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Point the catalog at a playlist (id, spotify: URI or open.spotify.com URL)
    pub fn with_playlist(mut self, playlist: &str) -> Self {
        self.playlist_id = parse_playlist_id(playlist);
        if self.playlist_id.is_none() {
            warn!("Could not make sense of playlist reference '{}'", playlist);
        }
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> ProviderResult<Response> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    async fn fetch_playlist_page(&self, url: &str) -> ProviderResult<PlaylistPage> {
        let response = self.send(self.http.get(url)).await?;
        response
            .json::<PlaylistPage>()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))
    }
}

#[async_trait]
impl PlaybackProvider for SpotifyClient {
    async fn search(&self, query: &str) -> ProviderResult<Option<Track>> {
        debug!("Searching Spotify for '{}'", query);
        let request = self
            .http
            .get(self.url("/search"))
            .query(&[("q", query), ("type", "track"), ("limit", "1")]);

        let response: SearchResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(response.tracks.items.into_iter().next().map(Track::from))
    }

    async fn play(&self, track: &Track, device_id: Option<&str>) -> ProviderResult<()> {
        let mut request = self
            .http
            .put(self.url("/me/player/play"))
            .json(&json!({ "uris": [&track.uri] }));
        if let Some(id) = device_id {
            request = request.query(&[("device_id", id)]);
        }

        self.send(request).await?;
        info!("Started '{}' on {}", track.display_id(), device_id.unwrap_or("active device"));
        Ok(())
    }

    async fn pause(&self, device_id: Option<&str>) -> ProviderResult<()> {
        let mut request = self.http.put(self.url("/me/player/pause"));
        if let Some(id) = device_id {
            request = request.query(&[("device_id", id)]);
        }

        self.send(request).await?;
        Ok(())
    }

    async fn list_devices(&self) -> ProviderResult<Vec<Device>> {
        let response: DevicesResponse = self
            .send(self.http.get(self.url("/me/player/devices")))
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(response.into_devices())
    }

    async fn transfer_playback(&self, device_id: &str) -> ProviderResult<()> {
        let request = self
            .http
            .put(self.url("/me/player"))
            .json(&json!({ "device_ids": [device_id], "play": true }));

        self.send(request).await?;
        info!("Transferred playback to device {}", device_id);
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for SpotifyClient {
    async fn list_songs(&self) -> ProviderResult<Catalog> {
        let Some(playlist_id) = &self.playlist_id else {
            warn!("No playlist configured, catalog is empty");
            return Ok(Catalog::default());
        };

        // Playlists come back 100 tracks at a time
        let mut next = Some(self.url(&format!("/playlists/{}/tracks", playlist_id)));
        let mut songs = Vec::new();
        while let Some(url) = next {
            let page = self.fetch_playlist_page(&url).await?;
            songs.extend(page.song_ids());
            next = page.next;
        }

        let catalog: Catalog = songs.into_iter().collect();
        info!("Loaded {} songs from playlist {}", catalog.len(), playlist_id);
        Ok(catalog)
    }
}

/// Pull the bare playlist id out of whatever the user pasted
pub fn parse_playlist_id(reference: &str) -> Option<String> {
    static PLAYLIST_RE: OnceLock<Regex> = OnceLock::new();
    let re = PLAYLIST_RE.get_or_init(|| {
        Regex::new(r"^(?:spotify:playlist:|https?://open\.spotify\.com/playlist/)?([A-Za-z0-9]+)(?:\?.*)?$")
            .expect("playlist regex is valid")
    });

    re.captures(reference.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let (message, reason) = parsed
        .map(|env| (env.error.message, env.error.reason))
        .unwrap_or_else(|| (body.to_string(), None));

    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized,
        StatusCode::NOT_FOUND if reason.as_deref() == Some("NO_ACTIVE_DEVICE") => {
            ProviderError::NoActiveDevice
        }
        // Targeted device_id was closed or went to sleep
        StatusCode::NOT_FOUND if message.to_lowercase().contains("device not found") => {
            ProviderError::DeviceNotFound(message)
        }
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

// Wire shapes - only the fields we actually read

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

impl From<ApiTrack> for Track {
    fn from(track: ApiTrack) -> Self {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();
        Track {
            uri: track.uri,
            name: track.name,
            artist,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<ApiDevice>,
}

#[derive(Debug, Deserialize)]
struct ApiDevice {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_active: bool,
}

impl DevicesResponse {
    // Restricted devices come back without an id - we can't target those
    fn into_devices(self) -> Vec<Device> {
        self.devices
            .into_iter()
            .filter_map(|d| {
                d.id.map(|id| Device {
                    id,
                    name: d.name,
                    is_active: d.is_active,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

impl PlaylistPage {
    fn song_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.track.as_ref())
            .map(|t| {
                let artist = t.artists.first().map(|a| a.name.as_str()).unwrap_or_default();
                format!("{} – {}", t.name, artist)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    reason: Option<String>,
}
