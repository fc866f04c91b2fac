// walkup library - walk-up song sequencing for a batting lineup
// Lineup + session are the core, everything else is plumbing around them

pub mod catalog;   // which songs the playlist currently has
pub mod config;    // settings and preferences
pub mod console;   // interactive game-day console
pub mod dugout;    // facade the front ends call into
pub mod error;     // error taxonomy
pub mod lineup;    // batting order construction
pub mod provider;  // playback provider seam + Spotify client
pub mod roster;    // who is on the team
pub mod session;   // now batting / auto-stop timing
pub mod store;     // assignment persistence

#[cfg(test)]
mod testing;

// Export the stuff other modules actually use
pub use catalog::{Catalog, CatalogSource};
pub use config::Config;
pub use dugout::{Dugout, LineupView};
pub use error::WalkupError;
pub use lineup::{build_lineup, Lineup, LineupEntry};
pub use provider::{PlaybackProvider, SpotifyClient, Track};
pub use roster::Roster;
pub use session::{PlaybackOutcome, PlaybackSession};
pub use store::{AssignmentStore, Assignments, PlayerAssignment};
