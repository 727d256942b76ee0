//! Integration tests for the pp player controller
//!
//! These tests drive the controller with a scripted decoder and a recording
//! audio launcher, covering:
//! - Frame pacing and late frame dropping
//! - Seeking, pausing, muting and speed changes, and the audio restarts they cause
//! - Playlist navigation and end of media
//! - Resume positions across sessions
//! - Drift correction and audio failures

use anyhow::Result;
use pp_player::player::{PlaybackState, PlayerCommand, PlayerEvent, SeekStep, MAX_DROPS_PER_TICK};
use pp_player::resume::ResumeStore;
use pp_integration_tests::{Harness, RecordingLauncher, ScriptedDecoder, TestFixture};
use std::time::Duration;

/// 10 fps, one minute long
fn minute_long() -> ScriptedDecoder {
    ScriptedDecoder::new(10.0, 600)
}

#[test]
fn test_playlist_skips_non_video_files() -> Result<()> {
    let fixture = TestFixture::new()?;
    let playlist = fixture.playlist()?;

    assert_eq!(playlist.len(), 3);
    assert_eq!(playlist.current(), fixture.video(0));

    let from_file = pp_player::playlist::Playlist::scan(&fixture.video(2))?;
    assert_eq!(from_file.current_index(), 2);

    Ok(())
}

#[test]
fn test_start_opens_first_video_and_audio() -> Result<()> {
    let fixture = TestFixture::new()?;
    let h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert_eq!(h.decoder.borrow().opened, vec![fixture.video(0)]);
    assert_eq!(h.controller.window_title(), "a.mp4 (1/3)");
    assert_eq!(h.controller.status_text(), Some("Playing: a.mp4 (1/3)"));

    let audio = h.last_audio().expect("audio started");
    assert_eq!(audio.start_secs(), Some(0.0));
    assert_eq!(audio.filters(), None);
    assert_eq!(audio.path, fixture.video(0));

    assert!(h.has_event(|e| matches!(e, PlayerEvent::MediaLoaded { index: 0, resumed_from: None, .. })));
    Ok(())
}

#[test]
fn test_frames_are_paced_and_late_frames_dropped() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    let outcome = h.controller.tick(h.at(0))?;
    assert!(outcome.redraw);
    assert_eq!(h.shown_pts(), Some(Duration::ZERO));
    let wake = outcome.wake_at.expect("next frame scheduled");
    assert!(wake <= h.at(100));

    // Second frame is due 100 ms in
    h.controller.tick(h.at(110))?;
    assert_eq!(h.shown_pts(), Some(Duration::from_millis(100)));

    // A long stall: a bounded number of frames is dropped, then one is shown
    h.controller.tick(h.at(1000))?;
    let stats = h.controller.stats();
    assert_eq!(stats.frames_dropped, MAX_DROPS_PER_TICK as u64);
    assert_eq!(stats.frames_rendered, 3);
    assert_eq!(h.shown_pts(), Some(Duration::from_secs_f64(0.7)));

    Ok(())
}

#[test]
fn test_seek_clamps_and_restarts_audio() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
    h.controller.tick(h.at(0))?;

    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;
    assert_eq!(h.controller.transport().position(), Duration::from_secs(10));
    assert_eq!(h.last_audio().and_then(|c| c.start_secs()), Some(10.0));
    assert_eq!(h.decoder.borrow().seeks, vec![Duration::from_secs(10)]);
    assert!(h
        .controller
        .status_text()
        .is_some_and(|t| t.starts_with("Seeking forward 10s (00:10 / 01:00)")));

    h.controller.tick(h.at(0))?;
    assert_eq!(h.shown_pts(), Some(Duration::from_secs(10)));

    h.controller.handle(PlayerCommand::SeekBackward(SeekStep::Long), h.at(0))?;
    assert_eq!(h.controller.transport().position(), Duration::ZERO);
    assert_eq!(h.last_audio().and_then(|c| c.start_secs()), Some(0.0));

    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Long), h.at(0))?;
    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Long), h.at(0))?;
    assert_eq!(h.controller.transport().position(), Duration::from_secs(60));

    assert!(h.has_event(|e| matches!(e, PlayerEvent::Seeked { .. })));
    Ok(())
}

#[test]
fn test_pause_stops_audio_and_resume_restarts_it() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    assert_eq!(h.controller.state(), PlaybackState::Paused);
    assert!(!h.controller.audio().is_active());
    assert_eq!(h.audio.borrow().killed, 1);
    assert_eq!(h.controller.status_text(), Some("Paused"));

    // Paused playback keeps showing the same frame
    h.controller.tick(h.at(500))?;
    h.controller.tick(h.at(900))?;
    assert_eq!(h.shown_pts(), Some(Duration::ZERO));

    h.controller.handle(PlayerCommand::TogglePause, h.at(1000))?;
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert_eq!(h.launches(), 2);
    assert_eq!(h.last_audio().and_then(|c| c.start_secs()), Some(0.0));
    assert!(h.has_event(|e| *e == PlayerEvent::PlaybackPaused));
    assert!(h.has_event(|e| *e == PlayerEvent::PlaybackStarted));

    Ok(())
}

#[test]
fn test_seek_while_paused_previews_target_without_audio() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;
    let outcome = h.controller.tick(h.at(10))?;

    assert!(outcome.redraw);
    assert_eq!(h.shown_pts(), Some(Duration::from_secs(10)));
    assert_eq!(h.controller.state(), PlaybackState::Paused);
    assert_eq!(h.launches(), 1);
    assert!(!h.controller.audio().is_active());

    Ok(())
}

#[test]
fn test_mute_restarts_audio_with_volume_filter() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::ToggleMute, h.at(0))?;
    assert!(h.controller.transport().is_muted());
    assert_eq!(h.launches(), 2);
    assert_eq!(h.last_audio().and_then(|c| c.filters().map(str::to_string)), Some("volume=0".to_string()));
    assert_eq!(h.controller.status_text(), Some("Muted"));

    h.controller.handle(PlayerCommand::ToggleMute, h.at(0))?;
    assert_eq!(h.last_audio().and_then(|c| c.filters().map(str::to_string)), None);
    assert_eq!(h.controller.status_text(), Some("Unmuted"));

    // Muting while paused is remembered for the next start
    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    h.controller.handle(PlayerCommand::ToggleMute, h.at(0))?;
    assert_eq!(h.launches(), 3);
    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    assert_eq!(h.launches(), 4);
    assert_eq!(h.last_audio().and_then(|c| c.filters().map(str::to_string)), Some("volume=0".to_string()));

    Ok(())
}

#[test]
fn test_speed_changes_update_title_and_audio_tempo() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    for _ in 0..5 {
        h.controller.handle(PlayerCommand::SpeedUp, h.at(0))?;
    }
    assert_eq!(h.controller.transport().speed(), 1.5);
    assert_eq!(h.controller.window_title(), "a.mp4 (1/3) [1.5x]");
    assert_eq!(h.controller.status_text(), Some("Speed: 1.5x"));
    assert_eq!(h.last_audio().and_then(|c| c.filters().map(str::to_string)), Some("atempo=1.5".to_string()));
    assert!(h.has_event(|e| *e == PlayerEvent::SpeedChanged { speed: 1.5 }));

    h.controller.handle(PlayerCommand::ResetSpeed, h.at(0))?;
    assert_eq!(h.controller.transport().speed(), 1.0);
    assert_eq!(h.controller.window_title(), "a.mp4 (1/3)");
    assert_eq!(h.last_audio().and_then(|c| c.filters().map(str::to_string)), None);

    for _ in 0..20 {
        h.controller.handle(PlayerCommand::SpeedDown, h.at(0))?;
    }
    assert_eq!(h.controller.transport().speed(), 0.1);

    // Already at the limit: nothing changes and audio is left alone
    let launches = h.launches();
    h.controller.handle(PlayerCommand::SpeedDown, h.at(0))?;
    assert_eq!(h.launches(), launches);

    Ok(())
}

#[test]
fn test_double_speed_doubles_media_time() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
    h.controller.tick(h.at(0))?;

    for _ in 0..10 {
        h.controller.handle(PlayerCommand::SpeedUp, h.at(0))?;
    }
    assert_eq!(h.controller.transport().speed(), 2.0);

    // 160 ms of wall time is 320 ms of media time
    h.controller.tick(h.at(160))?;
    assert_eq!(h.shown_pts(), Some(Duration::from_secs_f64(0.2)));
    assert_eq!(h.controller.stats().frames_dropped, 1);

    Ok(())
}

#[test]
fn test_navigation_wraps_around() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::NextVideo, h.at(0))?;
    assert_eq!(h.controller.playlist().current_index(), 1);
    assert_eq!(h.controller.window_title(), "b.mkv (2/3)");

    h.controller.handle(PlayerCommand::PrevVideo, h.at(0))?;
    h.controller.handle(PlayerCommand::PrevVideo, h.at(0))?;
    assert_eq!(h.controller.playlist().current_index(), 2);
    assert_eq!(h.last_audio().map(|c| c.path), Some(fixture.video(2)));

    h.controller.handle(PlayerCommand::NextVideo, h.at(0))?;
    assert_eq!(h.controller.playlist().current_index(), 0);

    Ok(())
}

#[test]
fn test_unreadable_video_is_skipped_in_direction_of_travel() -> Result<()> {
    let fixture = TestFixture::new()?;
    let decoder = minute_long().failing_on("b.mkv");
    let mut h = Harness::start(&fixture, decoder, RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::NextVideo, h.at(0))?;
    assert_eq!(h.controller.playlist().current_index(), 2);
    assert!(h.has_event(|e| matches!(e, PlayerEvent::Error { .. })));

    h.controller.handle(PlayerCommand::PrevVideo, h.at(0))?;
    assert_eq!(h.controller.playlist().current_index(), 0);

    Ok(())
}

#[test]
fn test_resume_position_survives_restart() -> Result<()> {
    let fixture = TestFixture::new()?;

    {
        let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
        h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;
        h.controller.handle(PlayerCommand::NextVideo, h.at(0))?;
        h.controller.handle(PlayerCommand::Quit, h.at(0))?;
        assert!(h.controller.is_quit_requested());
        h.controller.shutdown();
    }

    let store = ResumeStore::load(fixture.resume_path());
    assert_eq!(store.get(&fixture.video(0)), Some(Duration::from_secs(10)));
    assert_eq!(store.get(&fixture.video(1)), None);

    let h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
    assert_eq!(h.controller.transport().position(), Duration::from_secs(10));
    assert_eq!(h.decoder.borrow().seeks, vec![Duration::from_secs(10)]);
    assert_eq!(h.last_audio().and_then(|c| c.start_secs()), Some(10.0));
    assert!(h.has_event(|e| matches!(
        e,
        PlayerEvent::MediaLoaded { resumed_from: Some(p), .. } if *p == Duration::from_secs(10)
    )));

    Ok(())
}

#[test]
fn test_end_of_media_forgets_position_and_advances() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut resume = ResumeStore::new(fixture.resume_path());
    resume.record(&fixture.video(0), Duration::from_millis(600), Duration::from_secs(1));

    let decoder = ScriptedDecoder::new(10.0, 10);
    let mut h = Harness::start_with(
        fixture.config(),
        fixture.playlist()?,
        resume,
        decoder,
        RecordingLauncher::new(),
    )?;
    assert!(h.controller.resume_store().get(&fixture.video(0)).is_some());

    for _ in 0..5 {
        h.controller.tick(h.at(5000))?;
        if h.controller.playlist().current_index() != 0 {
            break;
        }
    }

    assert_eq!(h.controller.playlist().current_index(), 1);
    assert!(h.has_event(|e| *e == PlayerEvent::EndOfMedia));
    assert_eq!(h.controller.resume_store().get(&fixture.video(0)), None);
    assert_eq!(h.last_audio().map(|c| c.path), Some(fixture.video(1)));

    Ok(())
}

#[test]
fn test_drift_restarts_audio_at_clock_position() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
    h.controller.tick(h.at(0))?;

    // Video falls behind after a stall while the audio keeps going
    h.controller.tick(h.at(6000))?;

    assert_eq!(h.controller.stats().audio_resyncs, 1);
    assert_eq!(h.launches(), 2);
    assert!(h.has_event(|e| matches!(e, PlayerEvent::AudioResynced { drift } if *drift < 0.0)));

    // Audio restarts where the clock is, not at the stale frame on screen
    let restarted_at = h.last_audio().and_then(|c| c.start_secs()).unwrap_or_default();
    assert!((restarted_at - 6.0).abs() < 0.01);

    // Once the video has caught up the two stay together
    for ms in (6010..=10_990).step_by(10) {
        h.controller.tick(h.at(ms))?;
    }
    let video = h.shown_pts().unwrap_or_default().as_secs_f64();
    let audio = h
        .controller
        .audio()
        .estimated_position(h.at(10_990))
        .unwrap_or_default()
        .as_secs_f64();
    assert!((video - audio).abs() < 0.3, "video {video} audio {audio}");
    assert_eq!(h.controller.stats().audio_resyncs, 1);

    Ok(())
}

#[test]
fn test_early_audio_exit_is_reported_once() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;

    h.audio.borrow_mut().running = false;
    h.controller.tick(h.at(100))?;
    h.controller.tick(h.at(200))?;

    let exits = h.events.borrow().iter().filter(|e| **e == PlayerEvent::AudioExited).count();
    assert_eq!(exits, 1);
    assert!(!h.controller.audio().is_active());

    // The next transport command brings audio back
    h.controller.handle(PlayerCommand::ToggleMute, h.at(300))?;
    assert_eq!(h.launches(), 2);

    Ok(())
}

#[test]
fn test_audio_finishing_near_the_end_is_not_reported() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, ScriptedDecoder::new(10.0, 105), RecordingLauncher::new())?;

    // 10s into a 10.5s video
    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;
    assert_eq!(h.controller.transport().position(), Duration::from_secs(10));

    h.audio.borrow_mut().running = false;
    h.controller.tick(h.at(100))?;

    assert!(!h.has_event(|e| *e == PlayerEvent::AudioExited));
    assert!(!h.controller.audio().is_active());

    Ok(())
}

#[test]
fn test_decode_error_skips_to_next_video() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long().corrupt_at("a.mp4", 2), RecordingLauncher::new())?;
    h.controller.tick(h.at(0))?;

    // Frame 1 is shown, then frame 2 fails to decode
    h.controller.tick(h.at(110))?;

    assert_eq!(h.controller.playlist().current_index(), 1);
    assert_eq!(h.decoder.borrow().opened.last(), Some(&fixture.video(1)));
    assert!(h.has_event(|e| matches!(e, PlayerEvent::Error { message } if message.contains("a.mp4"))));
    assert_eq!(h.last_audio().map(|c| c.path), Some(fixture.video(1)));

    // The next video plays from its start
    h.controller.tick(h.at(200))?;
    assert_eq!(h.shown_pts(), Some(Duration::ZERO));
    assert_eq!(h.controller.state(), PlaybackState::Playing);

    Ok(())
}

#[test]
fn test_missing_audio_program_plays_silently() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::unavailable())?;

    assert!(!h.controller.audio().is_enabled());
    h.controller.tick(h.at(0))?;
    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;
    assert_eq!(h.launches(), 0);
    assert_eq!(h.controller.transport().position(), Duration::from_secs(10));

    Ok(())
}

#[test]
fn test_video_without_audio_track_never_launches_audio() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long().without_audio(), RecordingLauncher::new())?;

    h.controller.handle(PlayerCommand::ToggleMute, h.at(0))?;
    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    h.controller.handle(PlayerCommand::TogglePause, h.at(0))?;
    assert_eq!(h.launches(), 0);

    Ok(())
}

#[test]
fn test_shutdown_is_idempotent() -> Result<()> {
    let fixture = TestFixture::new()?;
    let mut h = Harness::start(&fixture, minute_long(), RecordingLauncher::new())?;
    h.controller.handle(PlayerCommand::SeekForward(SeekStep::Short), h.at(0))?;

    h.controller.shutdown();
    h.controller.shutdown();

    assert_eq!(h.decoder.borrow().closed, 1);
    assert!(!h.controller.audio().is_active());
    assert!(fixture.resume_path().exists());

    Ok(())
}
