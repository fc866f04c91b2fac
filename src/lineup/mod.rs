// Batting order construction
// Pure function of assignments + catalog, nothing here touches the store

use crate::catalog::Catalog;
use crate::error::WalkupError;
use crate::store::Assignments;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineupEntry {
    pub name: String,
    pub batting_number: u64,
    pub song: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Lineup {
    entries: Vec<LineupEntry>,
}

impl Lineup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LineupEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineupEntry> {
        self.entries.iter()
    }

    /// Index wraps around the order, so any counter value is a valid position
    pub fn get(&self, index: usize) -> Option<&LineupEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(index % self.entries.len())
    }
}

/// Build the batting order. Rows without a positive batting number or with a
/// song outside the catalog are left out - use [`diagnose`] to find out why.
pub fn build_lineup(assignments: &Assignments, catalog: &Catalog) -> Lineup {
    let mut entries: Vec<LineupEntry> = assignments
        .iter()
        .filter_map(|(name, assignment)| {
            let batting_number = assignment.batting_number()?;
            let song = assignment.song().filter(|s| catalog.contains(s))?;
            Some(LineupEntry {
                name: name.clone(),
                batting_number,
                song: song.to_string(),
            })
        })
        .collect();

    // Equal batting numbers fall back to name order
    entries.sort_by(|a, b| {
        a.batting_number
            .cmp(&b.batting_number)
            .then_with(|| a.name.cmp(&b.name))
    });

    Lineup { entries }
}

/// Explain every row that has *something* filled in but didn't make the lineup.
/// Fully blank rows are just unassigned players and aren't reported.
pub fn diagnose(assignments: &Assignments, catalog: &Catalog) -> Vec<WalkupError> {
    assignments
        .iter()
        .filter(|(_, a)| !a.is_blank())
        .filter_map(|(name, assignment)| {
            let reason = if assignment.batting_number().is_none() {
                format!("batting number '{}' is not a positive whole number", assignment.batting_number.trim())
            } else {
                match assignment.song() {
                    None => "no song assigned".to_string(),
                    Some(song) if !catalog.contains(song) => format!("song '{}' is not in the playlist", song),
                    Some(_) => return None,
                }
            };
            Some(WalkupError::InvalidAssignment {
                name: name.clone(),
                reason,
            })
        })
        .collect()
}
