// Interactive dugout console - type a command, hit enter
// Thin shim over Dugout, all the real logic lives there

pub mod events;

pub use events::{ConsoleEvent, EventHandler};

use crate::dugout::{Dugout, LineupView};
use crate::lineup::LineupEntry;
use crate::provider::Device;
use crate::session::PlaybackOutcome;
use anyhow::Result;
use tracing::{debug, error};

const HELP: &str = "\
  n, next       play current batter's song and move to the next
  s, stop       stop the music
  x, random     play a random song from the playlist
  top, reset    stop and go back to the leadoff hitter
  l, lineup     show the batting order
  d, devices    list playback devices
  r, reload     re-read the roster file
  p, playlist   re-fetch the playlist
  q, quit       leave";

pub struct Console {
    dugout: Dugout,
    event_handler: EventHandler,
    should_quit: bool,
}

impl Console {
    pub fn new(dugout: Dugout) -> Self {
        Self {
            dugout,
            event_handler: EventHandler::new(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let sender = self.event_handler.sender();
        tokio::spawn(async move {
            if let Err(e) = EventHandler::handle_stdin(sender).await {
                error!("Console input stopped: {}", e);
            }
        });

        println!("{}", format_view(&self.dugout.get_lineup()));
        println!("Enter = next batter, h = help");

        while !self.should_quit {
            match self.event_handler.next_event().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }

        // Don't leave a song running when the console closes
        self.dugout.stop_playback(None).await;
        Ok(())
    }

    async fn handle_event(&mut self, event: ConsoleEvent) {
        debug!("Console event: {:?}", event);
        match event {
            ConsoleEvent::NextBatter => {
                let outcome = self.dugout.advance_batter(None).await;
                println!("{}", format_outcome(&outcome));
                println!("{}", format_view(&self.dugout.get_lineup()));
            }
            ConsoleEvent::Stop => {
                self.dugout.stop_playback(None).await;
                println!("⏹️  Stopped");
            }
            ConsoleEvent::Random => {
                let outcome = self.dugout.play_random(None).await;
                println!("{}", format_outcome(&outcome));
            }
            ConsoleEvent::Reset => {
                self.dugout.reset_lineup().await;
                println!("{}", format_view(&self.dugout.get_lineup()));
            }
            ConsoleEvent::ShowLineup => {
                println!("{}", format_view(&self.dugout.get_lineup()));
            }
            ConsoleEvent::ShowDevices => match self.dugout.list_devices().await {
                Ok(devices) => println!("{}", format_devices(&devices)),
                Err(e) => println!("⚠️  {}", e),
            },
            ConsoleEvent::Help => println!("{}", HELP),
            ConsoleEvent::ReloadRoster => {
                let count = self.dugout.reload_roster();
                println!("Roster reloaded: {} players", count);
            }
            ConsoleEvent::RefreshCatalog => match self.dugout.refresh_catalog().await {
                Ok(count) => println!("Playlist reloaded: {} songs", count),
                Err(e) => println!("⚠️  {}", e),
            },
            ConsoleEvent::Quit => self.should_quit = true,
            ConsoleEvent::Unknown(word) => println!("Unknown command '{}' (h for help)", word),
        }
    }
}

fn format_entry(entry: Option<&LineupEntry>) -> String {
    match entry {
        Some(e) => format!("#{} {} – {}", e.batting_number, e.name, e.song),
        None => "—".to_string(),
    }
}

pub fn format_view(view: &LineupView) -> String {
    if view.lineup.is_empty() {
        return "No lineup yet - assign batting numbers and songs first".to_string();
    }

    let mut out = String::new();
    for (i, entry) in view.lineup.iter().enumerate() {
        let marker = if i == view.current_index { "▶" } else { " " };
        out.push_str(&format!("{} {:>2}. {:<20} {}\n", marker, entry.batting_number, entry.name, entry.song));
    }
    out.push_str(&format!("Up now:      {}\n", format_entry(view.current.as_ref())));
    out.push_str(&format!("On deck:     {}\n", format_entry(view.on_deck.as_ref())));
    out.push_str(&format!("In the hole: {}", format_entry(view.in_hole.as_ref())));
    out
}

pub fn format_outcome(outcome: &PlaybackOutcome) -> String {
    let who = outcome
        .entry
        .as_ref()
        .map(|e| format!("{}: ", e.name))
        .unwrap_or_default();

    match (&outcome.track, &outcome.reason) {
        (Some(track), _) if outcome.played => format!("🎵 {}{} by {}", who, track.name, track.artist),
        (_, Some(reason)) => format!("⚠️  {}{}", who, reason),
        _ => format!("⚠️  {}nothing played", who),
    }
}

pub fn format_devices(devices: &[Device]) -> String {
    if devices.is_empty() {
        return "⚠️  No devices found. Open Spotify on your phone or computer.".to_string();
    }
    devices
        .iter()
        .map(|d| format!("{} {} ({})", if d.is_active { "*" } else { " " }, d.name, d.id))
        .collect::<Vec<_>>()
        .join("\n")
}
