// Catalog of songs the lineup is allowed to use
// Just a membership set - how the ids are rendered is the UI's business

use crate::provider::ProviderResult;
use async_trait::async_trait;
use fuzzy_matcher::{clangd::ClangdMatcher, FuzzyMatcher};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    songs: HashSet<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, song_id: &str) -> bool {
        self.songs.contains(song_id)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.songs.iter()
    }

    /// Sorted copy for display and random picks
    pub fn sorted(&self) -> Vec<&String> {
        let mut songs: Vec<&String> = self.songs.iter().collect();
        songs.sort();
        songs
    }

    /// Resolve a partial song name to a catalog id.
    /// Exact ids win outright, otherwise the highest fuzzy score (ties by id).
    pub fn best_match(&self, query: &str) -> Option<&String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(exact) = self.songs.get(query) {
            return Some(exact);
        }

        let matcher = ClangdMatcher::default().ignore_case();
        self.sorted()
            .into_iter()
            .filter_map(|song| matcher.fuzzy_match(song, query).map(|score| (score, song)))
            .fold(None, |best: Option<(i64, &String)>, (score, song)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, song)),
            })
            .map(|(_, song)| song)
    }
}

impl FromIterator<String> for Catalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            songs: iter
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Anything that can hand us the current catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_songs(&self) -> ProviderResult<Catalog>;
}

/// Fixed song list from the config file - handy offline or for testing a lineup
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    songs: Vec<String>,
}

impl StaticCatalog {
    pub fn new(songs: Vec<String>) -> Self {
        Self { songs }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn list_songs(&self) -> ProviderResult<Catalog> {
        Ok(self.songs.iter().cloned().collect())
    }
}
