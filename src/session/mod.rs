// Playback session - who's up, who's on deck, and keeping walk-up songs short
//
// Every advance/stop starts a new "generation". The auto-stop timer for a cycle
// only acts if its generation is still current, so a late timer can never pause
// the next batter's song.

use crate::error::WalkupError;
use crate::lineup::{Lineup, LineupEntry};
use crate::provider::{with_timeout, PlaybackProvider, ProviderResult, Track};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_PLAY_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_play_time: Duration,
    pub call_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_play_time: DEFAULT_MAX_PLAY_TIME,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    Searching,
    Playing,
    Stopped,
}

/// The song currently (or most recently) sent to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackCycle {
    pub id: u64,
    pub entry: Option<LineupEntry>,
    pub track: Track,
    pub device_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    pub played: bool,
    pub entry: Option<LineupEntry>,
    pub track: Option<Track>,
    pub reason: Option<WalkupError>,
}

impl PlaybackOutcome {
    fn played(entry: Option<LineupEntry>, track: Track) -> Self {
        Self {
            played: true,
            entry,
            track: Some(track),
            reason: None,
        }
    }

    pub(crate) fn skipped(entry: Option<LineupEntry>, reason: WalkupError) -> Self {
        Self {
            played: false,
            entry,
            track: None,
            reason: Some(reason),
        }
    }
}

/// Now batting / on deck / in the hole
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upcoming<'a> {
    pub current: Option<&'a LineupEntry>,
    pub on_deck: Option<&'a LineupEntry>,
    pub in_hole: Option<&'a LineupEntry>,
}

#[derive(Debug, Default)]
struct SessionState {
    current_index: usize,
    is_playing: bool,
    active_device_id: Option<String>,
    generation: u64,
    phase: CyclePhase,
    cycle: Option<PlaybackCycle>,
    auto_stop: Option<JoinHandle<()>>,
}

impl SessionState {
    /// Invalidate whatever was going on and hand out a fresh generation.
    /// Returns the cycle that was still playing, if any.
    fn begin_generation(&mut self) -> (u64, Option<PlaybackCycle>) {
        if let Some(timer) = self.auto_stop.take() {
            timer.abort();
        }
        self.generation += 1;
        let previous = if self.is_playing { self.cycle.clone() } else { None };
        self.is_playing = false;
        (self.generation, previous)
    }
}

struct Shared {
    provider: Arc<dyn PlaybackProvider>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    // Serializes advance/stop/auto-stop so provider calls never interleave
    op_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn call<T, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        with_timeout(self.settings.call_timeout, fut).await
    }

    async fn pause_quietly(&self, device_id: Option<&str>) {
        if let Err(e) = self.call(self.provider.pause(device_id)).await {
            warn!("Pause did nothing: {}", e);
        }
    }
}

pub struct PlaybackSession {
    shared: Arc<Shared>,
}

impl PlaybackSession {
    pub fn new(provider: Arc<dyn PlaybackProvider>, settings: SessionSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                settings,
                state: Mutex::new(SessionState::default()),
                op_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.shared.settings
    }

    pub fn current_index(&self) -> usize {
        self.shared.state().current_index
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state().is_playing
    }

    pub fn phase(&self) -> CyclePhase {
        self.shared.state().phase
    }

    pub fn generation(&self) -> u64 {
        self.shared.state().generation
    }

    pub fn active_device(&self) -> Option<String> {
        self.shared.state().active_device_id.clone()
    }

    pub fn cycle(&self) -> Option<PlaybackCycle> {
        self.shared.state().cycle.clone()
    }

    /// Pin playback to a device (None = rediscover on next play)
    pub fn set_device(&self, device_id: Option<String>) {
        self.shared.state().active_device_id = device_id;
    }

    fn peek<'a>(&self, lineup: &'a Lineup, offset: usize) -> Option<&'a LineupEntry> {
        lineup.get(self.current_index() + offset)
    }

    pub fn current<'a>(&self, lineup: &'a Lineup) -> Option<&'a LineupEntry> {
        self.peek(lineup, 0)
    }

    pub fn on_deck<'a>(&self, lineup: &'a Lineup) -> Option<&'a LineupEntry> {
        self.peek(lineup, 1)
    }

    pub fn in_hole<'a>(&self, lineup: &'a Lineup) -> Option<&'a LineupEntry> {
        self.peek(lineup, 2)
    }

    pub fn upcoming<'a>(&self, lineup: &'a Lineup) -> Upcoming<'a> {
        Upcoming {
            current: self.current(lineup),
            on_deck: self.on_deck(lineup),
            in_hole: self.in_hole(lineup),
        }
    }

    /// Play the current batter's song and move the pointer to the next batter.
    /// The pointer moves even when nothing could be played, so one missing
    /// song never stalls the lineup.
    pub async fn advance(&self, lineup: &Lineup, device_id: Option<&str>) -> PlaybackOutcome {
        if lineup.is_empty() {
            debug!("Advance on empty lineup ignored");
            return PlaybackOutcome::skipped(None, WalkupError::EmptyLineup);
        }

        let _op = self.shared.op_lock.lock().await;
        let (entry, generation, previous) = {
            let mut state = self.shared.state();
            let index = state.current_index % lineup.len();
            let entry = lineup.entries()[index].clone();
            state.current_index = (index + 1) % lineup.len();
            let (generation, previous) = state.begin_generation();
            (entry, generation, previous)
        };

        info!("Now batting: #{} {} ({})", entry.batting_number, entry.name, entry.song);
        let song = entry.song.clone();
        self.start_cycle(generation, Some(entry), &song, device_id, previous).await
    }

    /// Play an arbitrary catalog song without touching the batting pointer.
    /// Same auto-stop rules as a batter's song.
    pub async fn play_song(&self, song: &str, device_id: Option<&str>) -> PlaybackOutcome {
        let _op = self.shared.op_lock.lock().await;
        let (generation, previous) = self.shared.state().begin_generation();
        self.start_cycle(generation, None, song, device_id, previous).await
    }

    /// Pause whatever is playing. Safe to call any number of times.
    pub async fn stop(&self, device_id: Option<&str>) {
        let _op = self.shared.op_lock.lock().await;
        self.stop_locked(device_id).await;
    }

    /// Stop and go back to the top of the order
    pub async fn reset(&self, device_id: Option<&str>) {
        let _op = self.shared.op_lock.lock().await;
        self.stop_locked(device_id).await;
        self.shared.state().current_index = 0;
    }

    // Caller holds op_lock
    async fn stop_locked(&self, device_id: Option<&str>) {
        let device = {
            let mut state = self.shared.state();
            let (_, previous) = state.begin_generation();
            if state.phase == CyclePhase::Playing {
                state.phase = CyclePhase::Stopped;
            }
            device_id
                .map(str::to_string)
                .or_else(|| previous.and_then(|c| c.device_id))
                .or_else(|| state.active_device_id.clone())
        };

        self.shared.pause_quietly(device.as_deref()).await;
        info!("Playback stopped");
    }

    async fn start_cycle(
        &self,
        generation: u64,
        entry: Option<LineupEntry>,
        song: &str,
        device_id: Option<&str>,
        previous: Option<PlaybackCycle>,
    ) -> PlaybackOutcome {
        self.shared.state().phase = CyclePhase::Searching;

        let track = match self.shared.call(self.shared.provider.search(song)).await {
            Ok(Some(track)) => track,
            Ok(None) => {
                warn!("No track found for '{}', skipping", song);
                return self
                    .abandon_cycle(entry, previous, WalkupError::TrackNotFound { song: song.to_string() })
                    .await;
            }
            Err(e) => {
                warn!("Search for '{}' failed: {}", song, e);
                return self.abandon_cycle(entry, previous, e.into()).await;
            }
        };

        let (mut device, remembered) = match self.resolve_device(device_id).await {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Can't play '{}': {}", track.display_id(), e);
                return self.abandon_cycle(entry, previous, e).await;
            }
        };

        let mut played = self.shared.call(self.shared.provider.play(&track, device.as_deref())).await;
        if matches!(&played, Err(e) if e.is_device_gone()) {
            // Device went away, look again next time
            self.forget_device(device.as_deref());
            if remembered {
                info!("Device {} is gone, looking for another", device.as_deref().unwrap_or("?"));
                match self.discover_device().await {
                    Ok(found) => {
                        device = Some(found);
                        played = self.shared.call(self.shared.provider.play(&track, device.as_deref())).await;
                    }
                    Err(e) => {
                        warn!("Can't play '{}': {}", track.display_id(), e);
                        return self.abandon_cycle(entry, previous, e).await;
                    }
                }
            }
        }

        if let Err(e) = played {
            warn!("Playback of '{}' failed: {}", track.display_id(), e);
            if e.is_device_gone() {
                self.forget_device(device.as_deref());
            }
            return self.abandon_cycle(entry, previous, e.into()).await;
        }

        let mut state = self.shared.state();
        state.is_playing = true;
        state.phase = CyclePhase::Playing;
        state.cycle = Some(PlaybackCycle {
            id: generation,
            entry: entry.clone(),
            track: track.clone(),
            device_id: device.clone(),
            started_at: Utc::now(),
        });
        state.auto_stop = Some(arm_auto_stop(Arc::clone(&self.shared), generation, device));
        debug!("Cycle {} playing, auto-stop in {:?}", generation, self.shared.settings.max_play_time);

        PlaybackOutcome::played(entry, track)
    }

    // Nothing new is playing - don't leave the previous song running past its window
    async fn abandon_cycle(
        &self,
        entry: Option<LineupEntry>,
        previous: Option<PlaybackCycle>,
        reason: WalkupError,
    ) -> PlaybackOutcome {
        if let Some(cycle) = previous {
            self.shared.pause_quietly(cycle.device_id.as_deref()).await;
        }
        self.shared.state().phase = CyclePhase::Idle;
        PlaybackOutcome::skipped(entry, reason)
    }

    /// Explicit device, then the remembered one, then ask the provider.
    /// The flag says whether the device came from memory.
    async fn resolve_device(&self, explicit: Option<&str>) -> Result<(Option<String>, bool), WalkupError> {
        if let Some(id) = explicit {
            self.shared.state().active_device_id = Some(id.to_string());
            return Ok((Some(id.to_string()), false));
        }
        if let Some(id) = self.active_device() {
            return Ok((Some(id), true));
        }
        Ok((Some(self.discover_device().await?), false))
    }

    /// Active device first, else the first one listed.
    /// An inactive device gets playback transferred to it first.
    async fn discover_device(&self) -> Result<String, WalkupError> {
        let devices = self.shared.call(self.shared.provider.list_devices()).await?;
        let Some(device) = devices.iter().find(|d| d.is_active).or_else(|| devices.first()) else {
            return Err(WalkupError::NoActiveDevice);
        };

        if !device.is_active {
            self.shared.call(self.shared.provider.transfer_playback(&device.id)).await?;
        }
        info!("Using device '{}'", device.name);
        self.shared.state().active_device_id = Some(device.id.clone());
        Ok(device.id.clone())
    }

    fn forget_device(&self, device_id: Option<&str>) {
        let mut state = self.shared.state();
        if state.active_device_id.as_deref() == device_id {
            state.active_device_id = None;
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.state().auto_stop.take() {
            timer.abort();
        }
    }
}

fn arm_auto_stop(shared: Arc<Shared>, generation: u64, device_id: Option<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(shared.settings.max_play_time).await;
        expire_cycle(&shared, generation, device_id.as_deref()).await;
    })
}

/// Timer body. Returns whether it actually stopped anything.
async fn expire_cycle(shared: &Shared, generation: u64, device_id: Option<&str>) -> bool {
    let _op = shared.op_lock.lock().await;
    {
        let mut state = shared.state();
        if state.generation != generation || !state.is_playing {
            debug!("Stale auto-stop for cycle {} ignored (current {})", generation, state.generation);
            return false;
        }
        state.is_playing = false;
        state.phase = CyclePhase::Stopped;
        state.auto_stop = None;
    }

    shared.pause_quietly(device_id).await;
    info!("Auto-stopped after {}s", shared.settings.max_play_time.as_secs());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::lineup::build_lineup;
    use crate::provider::Device;
    use crate::store::{Assignments, PlayerAssignment};
    use crate::testing::{FakeCall, FakeProvider};

    fn lineup(rows: &[(&str, &str, &str)]) -> Lineup {
        let data: Assignments = rows
            .iter()
            .map(|(n, b, s)| (n.to_string(), PlayerAssignment::new(*b, *s)))
            .collect();
        let catalog: Catalog = rows.iter().map(|(_, _, s)| s.to_string()).collect();
        build_lineup(&data, &catalog)
    }

    fn three_batters() -> Lineup {
        lineup(&[("Alice", "1", "A"), ("Bob", "2", "B"), ("Cara", "3", "C")])
    }

    fn session(provider: &Arc<FakeProvider>) -> PlaybackSession {
        PlaybackSession::new(provider.clone(), SessionSettings::default())
    }

    #[tokio::test]
    async fn test_empty_lineup_advance_is_a_noop() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);

        let outcome = session.advance(&Lineup::default(), None).await;
        assert!(!outcome.played);
        assert_eq!(outcome.reason, Some(WalkupError::EmptyLineup));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.generation(), 0);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upcoming_wraps_around() {
        let provider = Arc::new(FakeProvider::with_songs(&[]));
        let session = session(&provider);
        let lineup = lineup(&[("Alice", "1", "A"), ("Bob", "2", "B")]);

        let upcoming = session.upcoming(&lineup);
        assert_eq!(upcoming.current.map(|e| e.name.as_str()), Some("Alice"));
        assert_eq!(upcoming.on_deck.map(|e| e.name.as_str()), Some("Bob"));
        assert_eq!(upcoming.in_hole.map(|e| e.name.as_str()), Some("Alice"));

        let empty = Lineup::default();
        assert_eq!(session.current(&empty), None);
        assert_eq!(session.in_hole(&empty), None);
    }

    #[tokio::test]
    async fn test_advance_plays_and_moves_pointer() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B", "C"]));
        let session = session(&provider);
        let lineup = three_batters();

        let outcome = session.advance(&lineup, None).await;
        assert!(outcome.played);
        assert_eq!(outcome.entry.map(|e| e.name), Some("Alice".to_string()));
        assert!(session.is_playing());
        assert_eq!(session.phase(), CyclePhase::Playing);
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.current(&lineup).map(|e| e.name.as_str()), Some("Bob"));
        assert_eq!(session.active_device().as_deref(), Some("speaker"));
        assert!(provider.calls().contains(&FakeCall::Play("uri:A".to_string(), Some("speaker".to_string()))));
    }

    #[tokio::test]
    async fn test_advancing_len_times_returns_to_start() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "C"]));
        let session = session(&provider);
        let lineup = three_batters();

        let start = session.current_index();
        for _ in 0..lineup.len() {
            session.advance(&lineup, None).await;
        }
        assert_eq!(session.current_index(), start);
    }

    #[tokio::test]
    async fn test_missing_track_still_advances() {
        let provider = Arc::new(FakeProvider::with_songs(&["B"]));
        let session = session(&provider);
        let lineup = three_batters();

        let outcome = session.advance(&lineup, None).await;
        assert!(!outcome.played);
        assert_eq!(outcome.reason, Some(WalkupError::TrackNotFound { song: "A".to_string() }));
        assert_eq!(session.current_index(), 1);
        assert!(!session.is_playing());
        assert_eq!(session.phase(), CyclePhase::Idle);
    }

    #[tokio::test]
    async fn test_provider_failure_is_swallowed() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        provider.fail_search(true);
        let session = session(&provider);
        let lineup = three_batters();

        let outcome = session.advance(&lineup, None).await;
        assert!(!outcome.played);
        assert!(matches!(outcome.reason, Some(WalkupError::ProviderUnavailable(_))));
        assert_eq!(session.current_index(), 1);
    }

    #[tokio::test]
    async fn test_no_devices_reports_and_skips() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]).with_devices(vec![]));
        let session = session(&provider);

        let outcome = session.advance(&three_batters(), None).await;
        assert!(!outcome.played);
        assert_eq!(outcome.reason, Some(WalkupError::NoActiveDevice));
        assert_eq!(session.current_index(), 1);
        assert!(!provider.calls().iter().any(|c| matches!(c, FakeCall::Play(..))));
    }

    #[tokio::test]
    async fn test_inactive_device_gets_transfer() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]).with_devices(vec![Device {
            id: "phone".to_string(),
            name: "Coach's Phone".to_string(),
            is_active: false,
        }]));
        let session = session(&provider);

        let outcome = session.advance(&three_batters(), None).await;
        assert!(outcome.played);
        let calls = provider.calls();
        let transfer = calls.iter().position(|c| *c == FakeCall::Transfer("phone".to_string()));
        let play = calls.iter().position(|c| matches!(c, FakeCall::Play(..)));
        assert!(transfer.is_some() && transfer < play);
    }

    #[tokio::test]
    async fn test_explicit_device_skips_discovery() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);

        session.advance(&three_batters(), Some("booth")).await;
        assert!(!provider.calls().contains(&FakeCall::ListDevices));
        assert_eq!(session.active_device().as_deref(), Some("booth"));
    }

    #[tokio::test]
    async fn test_gone_remembered_device_is_rediscovered() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B", "C"]).with_gone_device("old"));
        let session = session(&provider);
        session.set_device(Some("old".to_string()));

        let outcome = session.advance(&three_batters(), None).await;
        assert!(outcome.played);
        assert_eq!(session.active_device().as_deref(), Some("speaker"));
        assert_eq!(session.cycle().and_then(|c| c.device_id).as_deref(), Some("speaker"));
        assert_eq!(provider.play_count(), 2);

        // Later batters go straight to the new device
        assert!(session.advance(&three_batters(), None).await.played);
        assert_eq!(provider.play_count(), 3);
    }

    #[tokio::test]
    async fn test_gone_explicit_device_is_forgotten() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B"]).with_gone_device("booth"));
        let session = session(&provider);
        let lineup = three_batters();

        let outcome = session.advance(&lineup, Some("booth")).await;
        assert!(!outcome.played);
        assert!(outcome.reason.is_some());
        assert_eq!(session.active_device(), None);
        assert!(!provider.calls().contains(&FakeCall::ListDevices));

        assert!(session.advance(&lineup, None).await.played);
        assert_eq!(session.active_device().as_deref(), Some("speaker"));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);
        session.advance(&three_batters(), None).await;

        session.stop(None).await;
        let after_one = (session.is_playing(), session.phase(), session.current_index());
        session.stop(None).await;
        let after_two = (session.is_playing(), session.phase(), session.current_index());

        assert_eq!(after_one, (false, CyclePhase::Stopped, 1));
        assert_eq!(after_one, after_two);
    }

    #[tokio::test]
    async fn test_stop_with_failing_provider_still_clears_flag() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);
        session.advance(&three_batters(), None).await;

        provider.fail_pause(true);
        session.stop(None).await;
        assert!(!session.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_fires_after_max_play_time() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);
        session.advance(&three_batters(), None).await;

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(session.is_playing());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!session.is_playing());
        assert_eq!(session.phase(), CyclePhase::Stopped);
        assert_eq!(provider.pause_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_advance_cancels_previous_timer() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B"]));
        let session = session(&provider);
        let lineup = three_batters();

        session.advance(&lineup, None).await;
        tokio::time::sleep(Duration::from_secs(20)).await;
        session.advance(&lineup, None).await;

        // First cycle's deadline passes - second song keeps playing
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(session.is_playing());
        assert_eq!(provider.pause_count(), 0);

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert!(!session.is_playing());
        assert_eq!(provider.pause_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_timer_does_not_touch_newer_cycle() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B"]));
        let session = session(&provider);
        let lineup = three_batters();

        session.advance(&lineup, None).await;
        let stale = session.generation();
        session.advance(&lineup, None).await;
        assert_ne!(session.generation(), stale);

        let fired = expire_cycle(&session.shared, stale, None).await;
        assert!(!fired);
        assert!(session.is_playing());
        assert_eq!(session.cycle().map(|c| c.track.uri), Some("uri:B".to_string()));
        assert_eq!(provider.pause_count(), 0);

        assert!(expire_cycle(&session.shared, session.generation(), None).await);
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn test_unplayable_song_pauses_previous_one() {
        let provider = Arc::new(FakeProvider::with_songs(&["A"]));
        let session = session(&provider);
        let lineup = three_batters();

        assert!(session.advance(&lineup, None).await.played);
        let outcome = session.advance(&lineup, None).await;
        assert!(!outcome.played);
        assert!(!session.is_playing());
        assert_eq!(provider.pause_count(), 1);
    }

    #[tokio::test]
    async fn test_play_song_leaves_pointer_alone() {
        let provider = Arc::new(FakeProvider::with_songs(&["C"]));
        let session = session(&provider);

        let outcome = session.play_song("C", None).await;
        assert!(outcome.played);
        assert_eq!(outcome.entry, None);
        assert_eq!(session.current_index(), 0);
        assert!(session.is_playing());
    }

    #[tokio::test]
    async fn test_reset_goes_back_to_leadoff() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B"]));
        let session = session(&provider);
        let lineup = three_batters();

        session.advance(&lineup, None).await;
        session.advance(&lineup, None).await;
        session.reset(None).await;
        assert_eq!(session.current(&lineup).map(|e| e.name.as_str()), Some("Alice"));
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn test_advance_after_reset_starts_from_leadoff() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B", "C"]));
        let session = Arc::new(session(&provider));
        let lineup = Arc::new(three_batters());
        session.advance(&lineup, None).await;

        // Whichever runs first, reset never undoes a pointer move made after it
        let reset = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.reset(None).await })
        };
        let advance = {
            let (session, lineup) = (Arc::clone(&session), Arc::clone(&lineup));
            tokio::spawn(async move { session.advance(&lineup, None).await })
        };
        reset.await.unwrap();
        let outcome = advance.await.unwrap();

        let index = session.current_index();
        match outcome.entry.map(|e| e.name).as_deref() {
            Some("Alice") => assert_eq!(index, 1),
            Some("Bob") => assert_eq!(index, 0),
            other => panic!("unexpected batter {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_index_survives_shrinking_lineup() {
        let provider = Arc::new(FakeProvider::with_songs(&["A", "B", "C"]));
        let session = session(&provider);

        let long = three_batters();
        session.advance(&long, None).await;
        session.advance(&long, None).await;
        assert_eq!(session.current_index(), 2);

        let short = lineup(&[("Alice", "1", "A"), ("Bob", "2", "B")]);
        assert_eq!(session.current(&short).map(|e| e.name.as_str()), Some("Alice"));
        let outcome = session.advance(&short, None).await;
        assert_eq!(outcome.entry.map(|e| e.name), Some("Alice".to_string()));
        assert_eq!(session.current_index(), 1);
    }
}
