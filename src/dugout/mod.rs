// Dugout - the one object front ends talk to
// Owns roster, store, catalog snapshot and the playback session; no globals

use crate::catalog::{Catalog, CatalogSource};
use crate::error::{WalkupError, WalkupResult};
use crate::lineup::{build_lineup, diagnose, Lineup, LineupEntry};
use crate::provider::{with_timeout, Device, PlaybackProvider};
use crate::roster::Roster;
use crate::session::{PlaybackOutcome, PlaybackSession, SessionSettings};
use crate::store::{AssignmentStore, Assignments, PlayerAssignment};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a lineup screen needs in one go
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupView {
    pub lineup: Lineup,
    pub current_index: usize,
    pub current: Option<LineupEntry>,
    pub on_deck: Option<LineupEntry>,
    pub in_hole: Option<LineupEntry>,
    pub is_playing: bool,
}

pub struct Dugout {
    roster: Roster,
    store: Box<dyn AssignmentStore>,
    provider: Arc<dyn PlaybackProvider>,
    catalog_source: Arc<dyn CatalogSource>,
    catalog: Catalog,
    session: PlaybackSession,
    default_device: Option<String>,
}

impl Dugout {
    pub fn new(
        roster: Roster,
        store: Box<dyn AssignmentStore>,
        provider: Arc<dyn PlaybackProvider>,
        catalog_source: Arc<dyn CatalogSource>,
        settings: SessionSettings,
    ) -> Self {
        let session = PlaybackSession::new(Arc::clone(&provider), settings);
        Self {
            roster,
            store,
            provider,
            catalog_source,
            catalog: Catalog::default(),
            session,
            default_device: None,
        }
    }

    pub fn with_default_device(mut self, device_id: Option<String>) -> Self {
        self.default_device = device_id;
        self
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Pull the playlist again. On failure the previous catalog stays in place.
    pub async fn refresh_catalog(&mut self) -> WalkupResult<usize> {
        let timeout = self.session.settings().call_timeout;
        // Pagination can take a few round trips
        match with_timeout(timeout * 6, self.catalog_source.list_songs()).await {
            Ok(catalog) => {
                self.catalog = catalog;
                info!("Catalog refreshed: {} songs", self.catalog.len());
                Ok(self.catalog.len())
            }
            Err(e) => {
                warn!("Catalog refresh failed, keeping {} cached songs: {}", self.catalog.len(), e);
                Err(e.into())
            }
        }
    }

    pub fn assignments(&self) -> Assignments {
        self.store.load()
    }

    pub fn lineup(&self) -> Lineup {
        build_lineup(&self.assignments(), &self.catalog)
    }

    /// Why each partially filled row is missing from the lineup
    pub fn problems(&self) -> Vec<WalkupError> {
        diagnose(&self.assignments(), &self.catalog)
    }

    pub fn get_lineup(&self) -> LineupView {
        let lineup = self.lineup();
        let upcoming = self.session.upcoming(&lineup);
        let (current, on_deck, in_hole) = (
            upcoming.current.cloned(),
            upcoming.on_deck.cloned(),
            upcoming.in_hole.cloned(),
        );
        let current_index = if lineup.is_empty() {
            0
        } else {
            self.session.current_index() % lineup.len()
        };

        LineupView {
            lineup,
            current_index,
            current,
            on_deck,
            in_hole,
            is_playing: self.session.is_playing(),
        }
    }

    pub async fn advance_batter(&self, device_id: Option<&str>) -> PlaybackOutcome {
        let lineup = self.lineup();
        let device = device_id.or(self.default_device.as_deref());
        self.session.advance(&lineup, device).await
    }

    pub async fn stop_playback(&self, device_id: Option<&str>) {
        let device = device_id.or(self.default_device.as_deref());
        self.session.stop(device).await;
    }

    /// Back to the leadoff hitter
    pub async fn reset_lineup(&self) {
        self.session.reset(self.default_device.as_deref()).await;
    }

    pub fn save_assignments(&self, data: Assignments) -> WalkupResult<()> {
        self.store.save(&data)
    }

    /// Edit one player. `None` leaves a field alone, a blank string clears it.
    /// Songs are resolved against the catalog, so "sandman" finds "Enter Sandman – Metallica".
    pub fn assign_player(
        &self,
        name: &str,
        batting_number: Option<&str>,
        song: Option<&str>,
    ) -> WalkupResult<PlayerAssignment> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WalkupError::InvalidAssignment {
                name: String::new(),
                reason: "player name is blank".to_string(),
            });
        }

        let mut data = self.assignments();
        let mut assignment = data.get(name).cloned().unwrap_or_default();

        if let Some(number) = batting_number {
            let candidate = PlayerAssignment::new(number.trim(), "");
            if !candidate.batting_number.is_empty() && candidate.batting_number().is_none() {
                return Err(WalkupError::InvalidAssignment {
                    name: name.to_string(),
                    reason: format!("batting number '{}' is not a positive whole number", number.trim()),
                });
            }
            assignment.batting_number = candidate.batting_number;
        }

        if let Some(song) = song {
            assignment.song = if song.trim().is_empty() {
                String::new()
            } else {
                self.catalog
                    .best_match(song)
                    .cloned()
                    .ok_or_else(|| WalkupError::InvalidAssignment {
                        name: name.to_string(),
                        reason: format!("no song in the playlist matches '{}'", song.trim()),
                    })?
            };
        }

        if !self.roster.contains(name) {
            warn!("{} is not on the roster, saving anyway", name);
        }
        data.insert(name.to_string(), assignment.clone());
        self.store.save(&data)?;
        info!("Assigned {}: #{} '{}'", name, assignment.batting_number, assignment.song);
        Ok(assignment)
    }

    pub fn reload_roster(&mut self) -> usize {
        self.roster.reload();
        self.store.set_roster(self.roster.clone());
        info!("Roster reloaded: {} players", self.roster.len());
        self.roster.len()
    }

    pub async fn list_devices(&self) -> WalkupResult<Vec<Device>> {
        let timeout = self.session.settings().call_timeout;
        Ok(with_timeout(timeout, self.provider.list_devices()).await?)
    }

    /// Random song off the playlist - batting order untouched
    pub async fn play_random(&self, device_id: Option<&str>) -> PlaybackOutcome {
        let song = {
            let songs = self.catalog.sorted();
            songs.choose(&mut rand::thread_rng()).map(|s| s.to_string())
        };
        let Some(song) = song else {
            return PlaybackOutcome::skipped(None, WalkupError::EmptyCatalog);
        };

        info!("Random pick: {}", song);
        let device = device_id.or(self.default_device.as_deref());
        self.session.play_song(&song, device).await
    }
}
