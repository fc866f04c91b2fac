// walkup - walk-up music for the dugout
// Assign songs to batters, then hit enter between at-bats

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use walkup::{
    catalog::{CatalogSource, StaticCatalog},
    console::{format_devices, format_outcome, format_view, Console},
    store::JsonAssignmentStore,
    Config, Dugout, Roster, SpotifyClient, WalkupError,
};

#[derive(Parser)]
#[command(name = "walkup")]
#[command(about = "Walk-up songs for every batter, played through Spotify")]
struct Args {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable developer logging (stderr instead of the log file)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the batting order
    Lineup {
        /// Print as JSON for other tools
        #[arg(long)]
        json: bool,
    },
    /// Explain why players are missing from the lineup
    Check,
    /// Set a player's batting number and/or song (blank clears)
    Assign {
        name: String,
        #[arg(short, long)]
        number: Option<String>,
        /// Song title, partial matches against the playlist are fine
        #[arg(short, long)]
        song: Option<String>,
    },
    /// List roster players with their assignments
    Roster,
    /// List songs in the playlist
    Songs,
    /// List Spotify playback devices
    Devices,
    /// Play a random playlist song (auto-stops like a walk-up)
    Random {
        #[arg(long)]
        device: Option<String>,
    },
    /// Interactive game-day console
    Run {
        #[arg(long)]
        device: Option<String>,
    },
}

impl Command {
    fn needs_player(&self) -> bool {
        matches!(self, Command::Devices | Command::Random { .. } | Command::Run { .. })
    }
}

fn init_logging(dev: bool) -> Result<Option<WorkerGuard>> {
    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walkup=debug"));

    if dev {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_env_filter(base_filter)
            .init();
        return Ok(None);
    }

    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&log_dir, "walkup.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(base_filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Some(guard))
}

async fn build_dugout(config: &Config, device: Option<String>, needs_player: bool) -> Result<Dugout> {
    let settings = config.session_settings();
    let token = config.spotify.access_token.clone();
    if needs_player && token.is_none() {
        return Err(WalkupError::Config("no Spotify access token - set SPOTIFY_ACCESS_TOKEN".to_string()).into());
    }

    let mut client = SpotifyClient::new(token.clone().unwrap_or_default(), settings.call_timeout)?
        .with_api_base(config.spotify.api_base.clone());
    if let Some(playlist) = &config.spotify.playlist {
        client = client.with_playlist(playlist);
    }
    let client = Arc::new(client);

    let catalog_source: Arc<dyn CatalogSource> = if config.spotify.playlist.is_some() && token.is_some() {
        client.clone() as Arc<dyn CatalogSource>
    } else {
        info!("Using the song list from the config file");
        Arc::new(StaticCatalog::new(config.catalog.songs.clone()))
    };

    let roster = Roster::load(&config.roster_path);
    let store = JsonAssignmentStore::new(config.assignments_path.clone(), roster.clone());

    let mut dugout = Dugout::new(roster, Box::new(store), client, catalog_source, settings)
        .with_default_device(device.or_else(|| config.spotify.device_id.clone()));

    if let Err(e) = dugout.refresh_catalog().await {
        eprintln!("⚠️  Could not load the playlist: {}", e);
    }
    Ok(dugout)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.dev)?;

    let config = Config::load(args.config.as_deref())?;
    info!("walkup starting up");

    let device = match &args.command {
        Command::Random { device } | Command::Run { device } => device.clone(),
        _ => None,
    };
    let dugout = build_dugout(&config, device, args.command.needs_player()).await?;

    match args.command {
        Command::Lineup { json } => {
            let view = dugout.get_lineup();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", format_view(&view));
            }
        }
        Command::Check => {
            let problems = dugout.problems();
            if problems.is_empty() {
                println!("✅ Every assigned player makes the lineup");
            }
            for problem in problems {
                println!("⚠️  {}", problem);
            }
        }
        Command::Assign { name, number, song } => {
            let assignment = dugout.assign_player(&name, number.as_deref(), song.as_deref())?;
            println!("{}: #{} {}", name, assignment.batting_number, assignment.song);
        }
        Command::Roster => {
            let assignments = dugout.assignments();
            for name in dugout.roster().names() {
                let a = assignments.get(name).cloned().unwrap_or_default();
                println!("{:<20} {:>3}  {}", name, a.batting_number, a.song);
            }
        }
        Command::Songs => {
            for song in dugout.catalog().sorted() {
                println!("{}", song);
            }
        }
        Command::Devices => {
            let devices = dugout.list_devices().await?;
            println!("{}", format_devices(&devices));
        }
        Command::Random { .. } => {
            let outcome = dugout.play_random(None).await;
            println!("{}", format_outcome(&outcome));
            // Stay alive for the auto-stop
            while dugout.session().is_playing() {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
        Command::Run { .. } => {
            let mut console = Console::new(dugout);
            console.run().await?;
        }
    }

    Ok(())
}
