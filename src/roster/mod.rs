// Team roster - the list of names is the source of truth for who exists
// Plain text, one player per line, so a coach can edit it in anything

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
    source: Option<PathBuf>,
}

impl Roster {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: dedupe(names.into_iter().map(Into::into)),
            source: None,
        }
    }

    /// Read a roster file. A missing file just means an empty roster.
    pub fn load(path: &Path) -> Self {
        let names = match fs::read_to_string(path) {
            Ok(content) => parse_roster(&content),
            Err(e) => {
                warn!("Could not read roster {}: {}", path.display(), e);
                Vec::new()
            }
        };

        info!("Loaded {} players from {}", names.len(), path.display());
        Self {
            names,
            source: Some(path.to_path_buf()),
        }
    }

    /// Re-read the file this roster came from (no-op for in-memory rosters)
    pub fn reload(&mut self) {
        if let Some(path) = self.source.clone() {
            *self = Self::load(&path);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

fn parse_roster(content: &str) -> Vec<String> {
    dedupe(
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string),
    )
}

// First occurrence wins, original order kept
fn dedupe(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}
