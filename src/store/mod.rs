// Assignment persistence - who bats where and what they walk up to
// The JSON shape is shared with the web/desktop front ends, keep it stable

use crate::error::{WalkupError, WalkupResult};
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One player's sparse overlay on the roster. Both fields are kept as the
/// strings the front ends send; blank means unassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAssignment {
    #[serde(default)]
    pub batting_number: String,
    #[serde(default)]
    pub song: String,
}

impl PlayerAssignment {
    pub fn new(batting_number: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            batting_number: batting_number.into(),
            song: song.into(),
        }
    }

    /// Strictly positive, digits only - "07" is fine, "+7", "0" and "7.0" are not.
    /// Anything past u64 is out too.
    pub fn batting_number(&self) -> Option<u64> {
        let raw = self.batting_number.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse::<u64>().ok().filter(|n| *n > 0)
    }

    pub fn song(&self) -> Option<&str> {
        let song = self.song.trim();
        (!song.is_empty()).then_some(song)
    }

    pub fn is_blank(&self) -> bool {
        self.batting_number.trim().is_empty() && self.song.trim().is_empty()
    }
}

/// Keyed by player name
pub type Assignments = BTreeMap<String, PlayerAssignment>;

/// Fill in blank rows for roster players the data doesn't know about yet
pub fn merge_roster(assignments: &mut Assignments, roster: &Roster) {
    for name in roster.names() {
        assignments.entry(name.clone()).or_default();
    }
}

pub trait AssignmentStore: Send + Sync {
    /// Never fails - an unreadable store comes back as an empty (roster-complete) mapping
    fn load(&self) -> Assignments;

    fn save(&self, assignments: &Assignments) -> WalkupResult<()>;

    /// Swap in a re-read roster; later loads/saves merge against it
    fn set_roster(&mut self, roster: Roster);
}

#[derive(Debug, Clone)]
pub struct JsonAssignmentStore {
    path: PathBuf,
    roster: Roster,
}

impl JsonAssignmentStore {
    pub fn new(path: PathBuf, roster: Roster) -> Self {
        Self { path, roster }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> WalkupResult<Assignments> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| WalkupError::StoreUnavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| WalkupError::StoreUnavailable(format!("{} is corrupted: {}", self.path.display(), e)))
    }
}

impl AssignmentStore for JsonAssignmentStore {
    fn load(&self) -> Assignments {
        let mut assignments = if self.path.exists() {
            self.read_file().unwrap_or_else(|e| {
                warn!("{} - starting fresh", e);
                Assignments::new()
            })
        } else {
            debug!("No saved assignments at {}", self.path.display());
            Assignments::new()
        };

        merge_roster(&mut assignments, &self.roster);
        assignments
    }

    fn save(&self, assignments: &Assignments) -> WalkupResult<()> {
        let mut data = assignments.clone();
        merge_roster(&mut data, &self.roster);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WalkupError::StoreUnavailable(e.to_string()))?;
        }

        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| WalkupError::StoreUnavailable(format!("Failed to serialize assignments: {}", e)))?;

        // Whole-file replace so a crash mid-write never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| WalkupError::StoreUnavailable(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| WalkupError::StoreUnavailable(format!("{}: {}", self.path.display(), e)))?;

        info!("Saved {} assignments to {}", data.len(), self.path.display());
        Ok(())
    }

    fn set_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }
}
