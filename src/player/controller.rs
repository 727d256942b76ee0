//! Player controller implementation
//!
//! Owns every playback collaborator and runs on the UI thread. The window
//! feeds it commands and calls `tick` whenever it wakes up; the controller
//! answers with whether to redraw and when it next needs to run.

use super::{
    FrameAction, PlaybackClock, PlaybackState, PlaybackStats, PlayerCommand, PlayerEvent, PlayerEventHandler,
    SeekStep, Transport,
};
use crate::audio::{AudioSidecar, AvSync, SyncCheck};
use crate::decoder::{Decoder, MediaInfo, VideoFrame, FALLBACK_FPS};
use crate::overlay::StatusOverlay;
use crate::playlist::Playlist;
use crate::resume::ResumeStore;
use crate::utils::error::{PlayerError, Result};
use crate::utils::{format_duration, format_factor, Config};
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Late frames dropped in one tick before one is shown regardless
pub const MAX_DROPS_PER_TICK: u32 = 5;

/// Redraw rate while a status message is on screen
const OVERLAY_REFRESH: Duration = Duration::from_millis(33);

/// Audio ending this close to the end of the video is expected
const AUDIO_END_SLACK: Duration = Duration::from_secs(1);

/// What the window should do after a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The composed frame changed
    pub redraw: bool,

    /// When to tick again; `None` means wait for input
    pub wake_at: Option<Instant>,
}

impl TickOutcome {
    fn wake_no_later_than(&mut self, at: Instant) {
        self.wake_at = Some(match self.wake_at {
            Some(current) => current.min(at),
            None => at,
        });
    }
}

/// Player controller that coordinates all components
pub struct PlayerController {
    config: Config,
    playlist: Playlist,
    resume: ResumeStore,
    decoder: Box<dyn Decoder>,
    audio: AudioSidecar,
    sync: AvSync,
    overlay: StatusOverlay,
    transport: Transport,
    clock: PlaybackClock,

    /// Info of the open file, `None` until something opened
    media: Option<MediaInfo>,

    /// Decoded frame that is not due yet
    pending: Option<VideoFrame>,

    /// Last presented frame, without overlay
    frame: Option<VideoFrame>,

    /// Show the next frame even while paused (after open or seek)
    needs_preview: bool,

    /// The last composed frame carried the overlay
    overlay_drawn: bool,

    stats: PlaybackStats,
    handlers: Vec<Box<dyn PlayerEventHandler>>,
    quit_requested: bool,
    shut_down: bool,
}

impl PlayerController {
    pub fn new(
        config: Config,
        playlist: Playlist,
        resume: ResumeStore,
        decoder: Box<dyn Decoder>,
        audio: AudioSidecar,
        now: Instant,
    ) -> Self {
        let sync = AvSync::new(config.audio.resync_threshold(), config.audio.resync_interval());
        let overlay = StatusOverlay::new(&config.overlay);
        let transport = Transport::new(&config.playback);
        let mut clock = PlaybackClock::new(now, Duration::from_secs_f64(1.0 / FALLBACK_FPS));
        clock.set_speed(transport.speed(), now);

        Self {
            config,
            playlist,
            resume,
            decoder,
            audio,
            sync,
            overlay,
            transport,
            clock,
            media: None,
            pending: None,
            frame: None,
            needs_preview: false,
            overlay_drawn: false,
            stats: PlaybackStats::default(),
            handlers: Vec::new(),
            quit_requested: false,
            shut_down: false,
        }
    }

    /// Register an event handler
    pub fn add_event_handler(&mut self, handler: Box<dyn PlayerEventHandler>) {
        self.handlers.push(handler);
    }

    /// Open the playlist's current entry
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.open_from(self.playlist.current_index(), true, now)
    }

    /// Apply a user command
    pub fn handle(&mut self, command: PlayerCommand, now: Instant) -> Result<()> {
        debug!("Command: {:?}", command);

        match command {
            PlayerCommand::TogglePause => self.toggle_pause(now),
            PlayerCommand::ToggleMute => self.toggle_mute(now),
            PlayerCommand::SeekForward(step) => self.seek_by(self.seek_secs(step), now)?,
            PlayerCommand::SeekBackward(step) => self.seek_by(-self.seek_secs(step), now)?,
            PlayerCommand::NextVideo => self.next_video(now)?,
            PlayerCommand::PrevVideo => self.prev_video(now)?,
            PlayerCommand::SpeedUp => self.change_speed(self.config.playback.speed_step, now),
            PlayerCommand::SpeedDown => self.change_speed(-self.config.playback.speed_step, now),
            PlayerCommand::ResetSpeed => {
                if let Some(speed) = self.transport.reset_speed() {
                    self.apply_speed(speed, now);
                }
            }
            PlayerCommand::Quit => {
                info!("Quit requested");
                self.quit_requested = true;
            }
        }

        Ok(())
    }

    /// Advance playback to `now`
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let mut outcome = TickOutcome::default();

        if self.media.is_some() {
            self.poll_audio();

            if self.transport.is_paused() {
                if self.needs_preview {
                    self.preview(now)?;
                    outcome.redraw = true;
                }
            } else {
                self.needs_preview = false;
                self.advance(now, &mut outcome)?;
                self.check_sync(now);
            }
        }

        let visible = self.overlay.is_visible(now);
        if visible || self.overlay_drawn {
            outcome.redraw = true;
        }
        self.overlay_drawn = visible;
        if visible {
            outcome.wake_no_later_than(now + OVERLAY_REFRESH);
        }

        Ok(outcome)
    }

    /// The current frame with the status overlay composited
    pub fn compose_frame(&mut self, now: Instant) -> Option<VideoFrame> {
        let mut frame = self.frame.clone()?;
        self.overlay.draw(&mut frame, now);
        Some(frame)
    }

    /// `"<name> (i/n)"`, with the speed appended when it is not 1x
    pub fn window_title(&self) -> String {
        if self.media.is_none() {
            return self.config.window.title.clone();
        }

        let name = self
            .playlist
            .current()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut title = format!("{} ({})", name, self.playlist.position_label());

        let speed = self.transport.speed();
        if (speed - 1.0).abs() > 1e-9 {
            title.push_str(&format!(" [{}x]", format_factor(speed)));
        }
        title
    }

    /// Save the position, stop audio and persist resume data
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.record_position();
        self.audio.stop();
        self.decoder.close();

        if let Err(e) = self.resume.save() {
            error!("Failed to save resume positions to {}: {}", self.resume.path().display(), e);
        }

        info!(
            "Stopped: {} frames shown, {} dropped, {} audio resyncs",
            self.stats.frames_rendered, self.stats.frames_dropped, self.stats.audio_resyncs
        );
    }

    pub fn is_quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn state(&self) -> PlaybackState {
        self.transport.state()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn resume_store(&self) -> &ResumeStore {
        &self.resume
    }

    pub fn audio(&self) -> &AudioSidecar {
        &self.audio
    }

    pub fn media_info(&self) -> Option<&MediaInfo> {
        self.media.as_ref()
    }

    pub fn current_frame(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }

    pub fn status_text(&self) -> Option<&str> {
        self.overlay.text()
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    fn emit(&mut self, event: PlayerEvent) {
        for handler in self.handlers.iter_mut() {
            handler.handle_event(&event);
        }
    }

    fn seek_secs(&self, step: SeekStep) -> f64 {
        match step {
            SeekStep::Short => self.config.playback.seek_short as f64,
            SeekStep::Long => self.config.playback.seek_long as f64,
        }
    }

    fn current_path(&self) -> PathBuf {
        self.playlist.current().to_path_buf()
    }

    /// Point the clock at `position`, keeping it frozen while paused
    fn reanchor(&mut self, position: Duration, now: Instant) {
        self.clock.resume(position, now);
        if self.transport.is_paused() {
            self.clock.pause(now);
        }
    }

    fn record_position(&mut self) {
        if let Some(duration) = self.media.as_ref().map(|m| m.duration) {
            let path = self.current_path();
            self.resume.record(&path, self.transport.position(), duration);
        }
    }

    /// (Re)start audio for the current state, or stop it if it should be silent
    fn start_audio(&mut self, now: Instant) {
        self.start_audio_from(self.transport.position(), now);
    }

    fn start_audio_from(&mut self, position: Duration, now: Instant) {
        self.sync.reset(now);

        let has_audio = self.media.as_ref().map_or(false, |m| m.has_audio);
        if !has_audio || self.transport.is_paused() || !self.audio.is_enabled() {
            self.audio.stop();
            return;
        }

        let path = self.current_path();
        let result = self.audio.restart(
            &path,
            position,
            self.transport.speed(),
            self.transport.is_muted(),
            now,
        );

        match result {
            Ok(()) => self.stats.audio_starts += 1,
            Err(e) => {
                warn!("Audio unavailable: {}", e);
                self.emit(PlayerEvent::Error { message: e.to_string() });
            }
        }
    }

    /// Open `index`, moving on in the given direction past files that fail
    fn open_from(&mut self, index: usize, forward: bool, now: Instant) -> Result<()> {
        let len = self.playlist.len();
        let mut index = index;
        let mut last_error = None;

        for _ in 0..len {
            match self.open_index(index, now) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let name = self
                        .playlist
                        .get(index)
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    error!("Cannot open video {}: {}", name, e);
                    self.emit(PlayerEvent::Error {
                        message: format!("Cannot open video {}: {}", name, e),
                    });
                    last_error = Some(e);
                    index = if forward { (index + 1) % len } else { (index + len - 1) % len };
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PlayerError::NoMedia(self.playlist.directory().to_path_buf())))
    }

    fn open_index(&mut self, index: usize, now: Instant) -> Result<()> {
        self.audio.stop();
        self.pending = None;
        self.media = None;

        let path = self.playlist.select(index)?.to_path_buf();
        let info = self.decoder.open_file(&path)?;

        let resumed_from = self
            .resume
            .get(&path)
            .filter(|pos| info.duration.is_zero() || *pos < info.duration);
        let start = match resumed_from {
            Some(position) => {
                self.decoder.seek(position)?;
                info!("Resuming {} at {}", path.display(), format_duration(position));
                position
            }
            None => Duration::ZERO,
        };

        self.transport.set_position(start);
        self.clock.set_frame_interval(info.frame_interval());
        self.reanchor(start, now);
        self.needs_preview = true;
        self.media = Some(info.clone());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.overlay
            .show(format!("Playing: {} ({})", name, self.playlist.position_label()), now);

        self.emit(PlayerEvent::MediaLoaded {
            path,
            index,
            info,
            resumed_from,
        });

        self.start_audio(now);
        Ok(())
    }

    fn next_video(&mut self, now: Instant) -> Result<()> {
        self.record_position();
        let next = self.playlist.next_index();
        self.open_from(next, true, now)
    }

    /// Give up on a video that stopped decoding and move to the next one
    fn decode_failed(&mut self, err: PlayerError, now: Instant) -> Result<()> {
        let path = self.current_path();
        error!("Decoding {} failed: {}", path.display(), err);
        self.emit(PlayerEvent::Error {
            message: format!("Decoding {} failed: {}", path.display(), err),
        });

        // The saved position is kept so a corrupt spot is not resumed into
        self.audio.stop();
        let next = self.playlist.next_index();
        self.open_from(next, true, now)
    }

    fn prev_video(&mut self, now: Instant) -> Result<()> {
        self.record_position();
        let prev = self.playlist.prev_index();
        self.open_from(prev, false, now)
    }

    fn end_of_media(&mut self, now: Instant) -> Result<()> {
        let path = self.current_path();
        info!("Finished {}", path.display());
        self.emit(PlayerEvent::EndOfMedia);

        // Finished videos start over next time
        self.resume.forget(&path);
        self.audio.stop();

        let next = self.playlist.next_index();
        self.open_from(next, true, now)
    }

    fn toggle_pause(&mut self, now: Instant) {
        match self.transport.toggle_pause() {
            PlaybackState::Paused => {
                self.clock.pause(now);
                self.audio.stop();
                self.overlay.show("Paused", now);
                self.emit(PlayerEvent::PlaybackPaused);
            }
            PlaybackState::Playing => {
                self.clock.resume(self.transport.position(), now);
                self.start_audio(now);
                self.overlay.show("Playing", now);
                self.emit(PlayerEvent::PlaybackStarted);
            }
        }
    }

    fn toggle_mute(&mut self, now: Instant) {
        let muted = self.transport.toggle_mute();
        if !self.transport.is_paused() {
            self.start_audio(now);
        }
        self.overlay.show(if muted { "Muted" } else { "Unmuted" }, now);
        self.emit(PlayerEvent::MuteChanged { muted });
    }

    fn seek_by(&mut self, delta: f64, now: Instant) -> Result<()> {
        let duration = match self.media.as_ref() {
            Some(info) => info.duration,
            None => return Ok(()),
        };

        let target = self.transport.seek_target(delta, duration);
        self.decoder.seek(target)?;

        self.pending = None;
        self.transport.set_position(target);
        self.reanchor(target, now);
        self.needs_preview = true;
        self.start_audio(now);

        let direction = if delta < 0.0 { "backward" } else { "forward" };
        self.overlay.show(
            format!(
                "Seeking {} {}s ({} / {})",
                direction,
                delta.abs().round() as u64,
                format_duration(target),
                format_duration(duration)
            ),
            now,
        );
        self.emit(PlayerEvent::Seeked { position: target });
        Ok(())
    }

    fn change_speed(&mut self, delta: f64, now: Instant) {
        if let Some(speed) = self.transport.change_speed(delta) {
            self.apply_speed(speed, now);
        }
    }

    fn apply_speed(&mut self, speed: f64, now: Instant) {
        self.clock.set_speed(speed, now);
        self.start_audio(now);
        self.overlay.show(format!("Speed: {}x", format_factor(speed)), now);
        self.emit(PlayerEvent::SpeedChanged { speed });
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>> {
        match self.pending.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.decoder.decode_frame(),
        }
    }

    fn present(&mut self, frame: VideoFrame) {
        trace!("Presenting frame at {:?}", frame.pts);
        self.transport.set_position(frame.pts);
        self.frame = Some(frame);
        self.stats.frames_rendered += 1;
    }

    /// Show one frame while paused so seeks and switches are visible
    fn preview(&mut self, now: Instant) -> Result<()> {
        self.needs_preview = false;
        match self.next_frame() {
            Ok(Some(frame)) => {
                self.clock.anchor(frame.pts, now);
                self.present(frame);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => self.decode_failed(e, now),
        }
    }

    fn advance(&mut self, now: Instant, outcome: &mut TickOutcome) -> Result<()> {
        let mut drops = 0;
        let mut shown = false;

        loop {
            let frame = match self.next_frame() {
                Ok(Some(frame)) => frame,
                Err(e) => {
                    self.decode_failed(e, now)?;
                    outcome.redraw = true;
                    outcome.wake_no_later_than(now);
                    return Ok(());
                }
                Ok(None) => {
                    // Let the last frame stay up for its own duration
                    let interval = self.media.as_ref().map_or(Duration::ZERO, |m| m.frame_interval());
                    let end = self.transport.position() + interval;
                    if let FrameAction::Wait(deadline) = self.clock.schedule(end, now) {
                        outcome.wake_no_later_than(deadline);
                        return Ok(());
                    }

                    self.end_of_media(now)?;
                    outcome.redraw = true;
                    outcome.wake_no_later_than(now);
                    return Ok(());
                }
            };

            match self.clock.schedule(frame.pts, now) {
                FrameAction::Wait(deadline) => {
                    self.pending = Some(frame);
                    outcome.wake_no_later_than(deadline);
                    return Ok(());
                }
                _ if shown => {
                    self.pending = Some(frame);
                    outcome.wake_no_later_than(now);
                    return Ok(());
                }
                FrameAction::Drop if drops < MAX_DROPS_PER_TICK => {
                    drops += 1;
                    self.stats.frames_dropped += 1;
                    trace!("Dropped late frame at {:?}", frame.pts);
                }
                _ => {
                    self.present(frame);
                    shown = true;
                    outcome.redraw = true;
                }
            }
        }
    }

    fn poll_audio(&mut self) {
        if !self.audio.poll_exited() {
            return;
        }

        let near_end = self
            .media
            .as_ref()
            .map_or(true, |m| self.transport.position() + AUDIO_END_SLACK >= m.duration);
        if near_end {
            debug!("Audio process finished");
        } else {
            warn!("Audio process exited early at {}", format_duration(self.transport.position()));
            self.emit(PlayerEvent::AudioExited);
        }
    }

    fn check_sync(&mut self, now: Instant) {
        let audio_position = match self.audio.estimated_position(now) {
            Some(position) => position,
            None => return,
        };

        match self.sync.check(self.transport.position(), audio_position, now) {
            SyncCheck::Resync(drift) => {
                // Audio follows the clock; the video catches up by dropping frames
                let duration = self.media.as_ref().map_or(Duration::MAX, |m| m.duration);
                let target = self.clock.media_time(now).min(duration);
                info!(
                    "A/V drift {:.0}ms, restarting audio at {}",
                    drift * 1000.0,
                    format_duration(target)
                );
                self.start_audio_from(target, now);
                self.stats.audio_resyncs += 1;
                self.emit(PlayerEvent::AudioResynced { drift });
            }
            SyncCheck::InSync(drift) => debug!("A/V drift {:.0}ms", drift * 1000.0),
            SyncCheck::NotDue => {}
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.audio.stop();
    }
}
