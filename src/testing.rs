// In-memory playback provider for unit tests

use crate::provider::{Device, PlaybackProvider, ProviderError, ProviderResult, Track};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Search(String),
    Play(String, Option<String>),
    Pause(Option<String>),
    ListDevices,
    Transfer(String),
}

pub struct FakeProvider {
    tracks: HashMap<String, Track>,
    devices: Vec<Device>,
    calls: Mutex<Vec<FakeCall>>,
    fail_search: AtomicBool,
    fail_pause: AtomicBool,
    gone_devices: Vec<String>,
}

impl FakeProvider {
    /// Every song id resolves to a track with uri "uri:<id>"; one active "speaker" device
    pub fn with_songs(songs: &[&str]) -> Self {
        let tracks = songs
            .iter()
            .map(|s| {
                let track = Track {
                    uri: format!("uri:{}", s),
                    name: s.to_string(),
                    artist: "Test Band".to_string(),
                };
                (s.to_string(), track)
            })
            .collect();

        Self {
            tracks,
            devices: vec![Device {
                id: "speaker".to_string(),
                name: "Dugout Speaker".to_string(),
                is_active: true,
            }],
            calls: Mutex::new(Vec::new()),
            fail_search: AtomicBool::new(false),
            fail_pause: AtomicBool::new(false),
            gone_devices: Vec::new(),
        }
    }

    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    /// Play on this device answers 404 like a closed Spotify app
    pub fn with_gone_device(mut self, device_id: &str) -> Self {
        self.gone_devices.push(device_id.to_string());
        self
    }

    pub fn play_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, FakeCall::Play(..))).count()
    }

    pub fn fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pause(&self, fail: bool) {
        self.fail_pause.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pause_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, FakeCall::Pause(_))).count()
    }

    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackProvider for FakeProvider {
    async fn search(&self, query: &str) -> ProviderResult<Option<Track>> {
        self.record(FakeCall::Search(query.to_string()));
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(ProviderError::Http("connection refused".to_string()));
        }
        Ok(self.tracks.get(query).cloned())
    }

    async fn play(&self, track: &Track, device_id: Option<&str>) -> ProviderResult<()> {
        self.record(FakeCall::Play(track.uri.clone(), device_id.map(str::to_string)));
        if device_id.is_some_and(|id| self.gone_devices.iter().any(|g| g == id)) {
            return Err(ProviderError::Api {
                status: 404,
                message: "Device not found".to_string(),
            });
        }
        Ok(())
    }

    async fn pause(&self, device_id: Option<&str>) -> ProviderResult<()> {
        self.record(FakeCall::Pause(device_id.map(str::to_string)));
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized);
        }
        Ok(())
    }

    async fn list_devices(&self) -> ProviderResult<Vec<Device>> {
        self.record(FakeCall::ListDevices);
        Ok(self.devices.clone())
    }

    async fn transfer_playback(&self, device_id: &str) -> ProviderResult<()> {
        self.record(FakeCall::Transfer(device_id.to_string()));
        Ok(())
    }
}
