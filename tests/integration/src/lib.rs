//! Integration test utilities for pp
//!
//! This module provides common utilities for integration testing including:
//! - A temporary directory of placeholder video files
//! - A scripted decoder that produces frames at a fixed rate
//! - An audio launcher that records invocations instead of spawning ffplay
//! - An event handler that collects player events

use anyhow::Result;
use pp_player::audio::{AudioCommand, AudioProcess, AudioSidecar, ProcessLauncher};
use pp_player::decoder::{Decoder, MediaInfo, VideoFrame};
use pp_player::player::{PlayerController, PlayerEvent, PlayerEventHandler};
use pp_player::playlist::Playlist;
use pp_player::resume::ResumeStore;
use pp_player::utils::{Config, PlayerError};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Video files created by every fixture, in playlist order
pub const VIDEO_NAMES: &[&str] = &["a.mp4", "b.mkv", "c.avi"];

/// Test fixture for integration tests
pub struct TestFixture {
    pub temp_dir: TempDir,
    root: PathBuf,
}

impl TestFixture {
    /// Create a directory with three videos and one non-video file
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().canonicalize()?;

        for name in VIDEO_NAMES {
            std::fs::write(root.join(name), b"placeholder")?;
        }
        std::fs::write(root.join("notes.txt"), b"not a video")?;

        Ok(Self { temp_dir, root })
    }

    /// Get the path to the temporary directory, with symlinks resolved
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn video(&self, index: usize) -> PathBuf {
        self.path().join(VIDEO_NAMES[index])
    }

    pub fn resume_path(&self) -> PathBuf {
        self.path().join("resume.json")
    }

    /// Default configuration with the resume file kept inside the fixture
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.general.resume_file = Some(self.resume_path());
        config
    }

    pub fn playlist(&self) -> Result<Playlist> {
        Ok(Playlist::scan(self.path())?)
    }
}

/// What the scripted decoder has been asked to do
#[derive(Debug, Default)]
pub struct DecoderLog {
    pub opened: Vec<PathBuf>,
    pub seeks: Vec<Duration>,
    pub closed: usize,
}

/// Decoder producing small solid frames at a fixed rate
pub struct ScriptedDecoder {
    fps: f64,
    frame_count: u64,
    has_audio: bool,
    failing: Vec<String>,
    corrupt: Vec<(String, u64)>,
    current: String,
    cursor: u64,
    position: Duration,
    eof: bool,
    log: Rc<RefCell<DecoderLog>>,
}

impl ScriptedDecoder {
    pub fn new(fps: f64, frame_count: u64) -> Self {
        Self {
            fps,
            frame_count,
            has_audio: true,
            failing: Vec::new(),
            corrupt: Vec::new(),
            current: String::new(),
            cursor: 0,
            position: Duration::ZERO,
            eof: false,
            log: Rc::new(RefCell::new(DecoderLog::default())),
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.has_audio = false;
        self
    }

    /// Make opening the file with this name fail
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    /// Make decoding frame `index` of the file with this name fail
    pub fn corrupt_at(mut self, name: &str, index: u64) -> Self {
        self.corrupt.push((name.to_string(), index));
        self
    }

    pub fn log(&self) -> Rc<RefCell<DecoderLog>> {
        self.log.clone()
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count as f64 / self.fps)
    }

    fn pts(&self, index: u64) -> Duration {
        Duration::from_secs_f64(index as f64 / self.fps)
    }
}

impl Decoder for ScriptedDecoder {
    fn open_file(&mut self, path: &Path) -> pp_player::Result<MediaInfo> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.contains(&name) {
            return Err(PlayerError::decoder_error(format!("cannot decode {}", name)));
        }

        self.log.borrow_mut().opened.push(path.to_path_buf());
        self.current = name;
        self.cursor = 0;
        self.position = Duration::ZERO;
        self.eof = false;

        Ok(MediaInfo {
            source: path.to_string_lossy().into_owned(),
            duration: self.duration(),
            fps: self.fps,
            frame_count: self.frame_count,
            width: 4,
            height: 4,
            has_audio: self.has_audio,
        })
    }

    fn decode_frame(&mut self) -> pp_player::Result<Option<VideoFrame>> {
        if self.cursor >= self.frame_count {
            self.eof = true;
            return Ok(None);
        }
        if self.corrupt.iter().any(|(name, index)| *name == self.current && *index == self.cursor) {
            return Err(PlayerError::decoder_error(format!("corrupt frame {} in {}", self.cursor, self.current)));
        }

        let pts = self.pts(self.cursor);
        self.cursor += 1;
        self.position = pts;
        Ok(Some(VideoFrame::solid(4, 4, pts, [16, 32, 64, 255])))
    }

    fn seek(&mut self, position: Duration) -> pp_player::Result<()> {
        self.log.borrow_mut().seeks.push(position);
        let index = (position.as_secs_f64() * self.fps).ceil() as u64;
        self.cursor = index.min(self.frame_count);
        self.eof = false;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn is_eof(&self) -> bool {
        self.eof
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

/// Shared record of audio launches
#[derive(Debug, Default)]
pub struct AudioLog {
    pub launched: Vec<AudioCommand>,
    pub killed: usize,

    /// Whether the most recent process is still alive
    pub running: bool,
}

/// Launcher that records commands instead of spawning processes
pub struct RecordingLauncher {
    available: bool,
    log: Rc<RefCell<AudioLog>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self {
            available: true,
            log: Rc::new(RefCell::new(AudioLog::default())),
        }
    }

    /// Pretend the audio program is not installed
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn log(&self) -> Rc<RefCell<AudioLog>> {
        self.log.clone()
    }
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn is_available(&self, _program: &str) -> bool {
        self.available
    }

    fn launch(&self, command: &AudioCommand) -> pp_player::Result<Box<dyn AudioProcess>> {
        let mut log = self.log.borrow_mut();
        log.launched.push(command.clone());
        log.running = true;
        Ok(Box::new(RecordingProcess(self.log.clone())))
    }
}

/// Process handle backed by the launcher's log
pub struct RecordingProcess(Rc<RefCell<AudioLog>>);

impl AudioProcess for RecordingProcess {
    fn is_running(&mut self) -> bool {
        self.0.borrow().running
    }

    fn kill(&mut self) -> pp_player::Result<()> {
        let mut log = self.0.borrow_mut();
        log.killed += 1;
        log.running = false;
        Ok(())
    }
}

/// Event handler that keeps every event
pub struct RecordingHandler(pub Rc<RefCell<Vec<PlayerEvent>>>);

impl PlayerEventHandler for RecordingHandler {
    fn handle_event(&mut self, event: &PlayerEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

/// A controller wired to fakes, plus handles to inspect them
pub struct Harness {
    pub controller: PlayerController,
    pub decoder: Rc<RefCell<DecoderLog>>,
    pub audio: Rc<RefCell<AudioLog>>,
    pub events: Rc<RefCell<Vec<PlayerEvent>>>,
    pub start: Instant,
}

impl Harness {
    /// Build and start a controller over the fixture's playlist
    pub fn start(fixture: &TestFixture, decoder: ScriptedDecoder, launcher: RecordingLauncher) -> Result<Self> {
        let config = fixture.config();
        let resume = ResumeStore::load(fixture.resume_path());
        Self::start_with(config, fixture.playlist()?, resume, decoder, launcher)
    }

    pub fn start_with(
        config: Config,
        playlist: Playlist,
        resume: ResumeStore,
        decoder: ScriptedDecoder,
        launcher: RecordingLauncher,
    ) -> Result<Self> {
        let decoder_log = decoder.log();
        let audio_log = launcher.log();
        let events = Rc::new(RefCell::new(Vec::new()));
        let start = Instant::now();

        let audio = AudioSidecar::new(Box::new(launcher), &config.audio.command, config.audio.enabled);
        let mut controller = PlayerController::new(config, playlist, resume, Box::new(decoder), audio, start);
        controller.add_event_handler(Box::new(RecordingHandler(events.clone())));
        controller.start(start)?;

        Ok(Self {
            controller,
            decoder: decoder_log,
            audio: audio_log,
            events,
            start,
        })
    }

    /// Wall time `ms` milliseconds after the harness started
    pub fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }

    pub fn last_audio(&self) -> Option<AudioCommand> {
        self.audio.borrow().launched.last().cloned()
    }

    pub fn launches(&self) -> usize {
        self.audio.borrow().launched.len()
    }

    pub fn has_event(&self, matches: impl Fn(&PlayerEvent) -> bool) -> bool {
        self.events.borrow().iter().any(matches)
    }

    /// Presentation time of the frame on screen
    pub fn shown_pts(&self) -> Option<Duration> {
        self.controller.current_frame().map(|f| f.pts)
    }
}
