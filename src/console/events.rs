use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    // Playback
    NextBatter,
    Stop,
    Random,
    Reset,

    // Display
    ShowLineup,
    ShowDevices,
    Help,

    // Data
    ReloadRoster,
    RefreshCatalog,

    Quit,
    Unknown(String),
}

impl ConsoleEvent {
    /// One command per line, first word decides
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.split_whitespace().next()?.to_lowercase();
        let event = match word.as_str() {
            "n" | "next" => ConsoleEvent::NextBatter,
            "s" | "stop" => ConsoleEvent::Stop,
            "x" | "random" => ConsoleEvent::Random,
            "top" | "reset" => ConsoleEvent::Reset,
            "l" | "lineup" => ConsoleEvent::ShowLineup,
            "d" | "devices" => ConsoleEvent::ShowDevices,
            "h" | "help" | "?" => ConsoleEvent::Help,
            "r" | "reload" => ConsoleEvent::ReloadRoster,
            "p" | "playlist" => ConsoleEvent::RefreshCatalog,
            "q" | "quit" | "exit" => ConsoleEvent::Quit,
            _ => ConsoleEvent::Unknown(word),
        };
        Some(event)
    }
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<ConsoleEvent>,
    event_receiver: mpsc::UnboundedReceiver<ConsoleEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ConsoleEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<ConsoleEvent> {
        self.event_receiver.recv().await
    }

    /// Read stdin lines until EOF; EOF counts as quit
    pub async fn handle_stdin(sender: mpsc::UnboundedSender<ConsoleEvent>) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            // Bare enter means "next batter" - quickest thing to hit between at-bats
            let event = ConsoleEvent::parse(&line).unwrap_or(ConsoleEvent::NextBatter);
            if sender.send(event).is_err() {
                return Ok(());
            }
        }

        let _ = sender.send(ConsoleEvent::Quit);
        Ok(())
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
