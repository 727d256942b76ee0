use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Env, Target};
use log::{debug, error, info, warn};
use pp_player::audio::{AudioSidecar, FfplayLauncher};
use pp_player::decoder::FFmpegDecoder;
use pp_player::player::{PlayerController, PlayerEvent, PlayerEventHandler};
use pp_player::playlist::Playlist;
use pp_player::resume::ResumeStore;
use pp_player::utils::{format_duration, format_factor, Config};
use pp_player::window::{controls_help, App};
use std::path::PathBuf;
use std::time::Instant;

/// pp - a simple video player for a directory of videos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file or directory to play
    #[arg(value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Short seek step in seconds (Left/Right)
    #[arg(long, value_name = "SECS")]
    seek_short: Option<u64>,

    /// Long seek step in seconds (Up/Down)
    #[arg(long, value_name = "SECS")]
    seek_long: Option<u64>,

    /// Initial playback speed
    #[arg(long, value_name = "FACTOR")]
    speed: Option<f64>,

    /// Play without sound
    #[arg(long)]
    no_audio: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Window width
    #[arg(long)]
    width: Option<u32>,

    /// Window height
    #[arg(long)]
    height: Option<u32>,

    /// Configuration file to use instead of the user config
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the effective configuration to the user config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Command line flags take precedence over every other source
    fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.seek_short {
            config.playback.seek_short = secs;
        }
        if let Some(secs) = self.seek_long {
            config.playback.seek_long = secs;
        }
        if let Some(speed) = self.speed {
            config.playback.initial_speed = speed;
        }
        if self.no_audio {
            config.audio.enabled = false;
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.debug {
            config.general.log_level = "debug".to_string();
        }
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(&config.general.log_level));
    builder.format_timestamp_millis();

    if let Some(path) = &config.general.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Cannot open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config)?;
    info!("Starting pp v{}", env!("CARGO_PKG_VERSION"));

    if args.save_config {
        config.save()?;
        println!("Configuration saved");
        return Ok(());
    }

    let playlist = Playlist::scan(&args.path)?;
    println!("Found {} video files", playlist.len());
    println!("{}\n", controls_help(config.playback.seek_short, config.playback.seek_long));

    let resume = ResumeStore::load(config.general.resume_path());
    let decoder = FFmpegDecoder::new()?;
    let audio = AudioSidecar::new(Box::new(FfplayLauncher), &config.audio.command, config.audio.enabled);

    let mut controller = PlayerController::new(
        config.clone(),
        playlist,
        resume,
        Box::new(decoder),
        audio,
        Instant::now(),
    );
    controller.add_event_handler(Box::new(LoggingEventHandler));
    controller.start(Instant::now())?;

    App::new(controller, config.window.clone()).run()?;

    info!("Exiting");
    Ok(())
}

/// Event handler that logs events
struct LoggingEventHandler;

impl PlayerEventHandler for LoggingEventHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::MediaLoaded { path, info, resumed_from, .. } => {
                info!(
                    "Loaded {} ({}x{}, {:.2} fps, {})",
                    path.display(),
                    info.width,
                    info.height,
                    info.fps,
                    format_duration(info.duration)
                );
                if let Some(position) = resumed_from {
                    debug!("Resumed at {:?}", position);
                }
            }
            PlayerEvent::Seeked { position } => debug!("Position: {:?}", position),
            PlayerEvent::SpeedChanged { speed } => debug!("Playback speed: {}x", format_factor(*speed)),
            PlayerEvent::AudioResynced { drift } => debug!("Audio resynced after {:.3}s drift", drift),
            PlayerEvent::AudioExited => warn!("Audio stopped; it restarts with the next command"),
            PlayerEvent::Error { message } => error!("Player error: {}", message),
            _ => {}
        }
    }
}
