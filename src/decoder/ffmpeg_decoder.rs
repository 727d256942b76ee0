//! FFmpeg-based decoder implementation for pp
//!
//! Provides video decoding using the ffmpeg-next crate. Frames are
//! converted to RGBA with swscale so the overlay and renderer only ever
//! deal with one pixel layout.

use crate::decoder::{resolve_duration, sanitize_fps, Decoder, MediaInfo, VideoFrame};
use crate::utils::error::{PlayerError, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media};
use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

/// FFmpeg decoder implementation
pub struct FFmpegDecoder {
    /// Currently open file
    media: Option<OpenMedia>,

    /// Timestamp of the last decoded frame
    position: Duration,

    /// Frames before this timestamp are discarded after a seek
    skip_until: Option<Duration>,

    /// End of file reached
    eof: bool,
}

/// State for one open file
struct OpenMedia {
    /// Input format context
    input: format::context::Input,

    /// Decoder context
    decoder: ffmpeg::decoder::Video,

    /// Stream index of the video stream
    stream_index: usize,

    /// Time base for PTS conversion
    time_base: ffmpeg::Rational,

    /// Stream start time in seconds, subtracted from every PTS
    start_offset: f64,

    /// Converter to RGBA, rebuilt when the source format changes
    scaler: Option<ffmpeg::software::scaling::Context>,

    /// Half a frame, used as tolerance when skipping after a seek
    half_frame: Duration,
}

impl FFmpegDecoder {
    /// Initialize FFmpeg and create a decoder with nothing open
    pub fn new() -> Result<Self> {
        ffmpeg::init().map_err(|e| PlayerError::decoder_error(format!("FFmpeg init failed: {}", e)))?;
        ffmpeg::log::set_level(ffmpeg::log::Level::Error);

        Ok(Self {
            media: None,
            position: Duration::ZERO,
            skip_until: None,
            eof: false,
        })
    }

    /// Pull the next decoded frame, feeding packets as needed
    fn receive_frame(&mut self) -> Result<Option<VideoFrame>> {
        let media = self.media.as_mut()
            .ok_or_else(|| PlayerError::decoder_error("No file open"))?;

        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            match media.decoder.receive_frame(&mut decoded) {
                Ok(()) => return media.convert(&decoded).map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {}
                Err(e) => return Err(e.into()),
            }

            let mut packet = ffmpeg::Packet::empty();
            match packet.read(&mut media.input) {
                Ok(()) => {
                    if packet.stream() != media.stream_index {
                        continue;
                    }
                    match media.decoder.send_packet(&packet) {
                        Ok(()) => {}
                        Err(ffmpeg::Error::InvalidData) => {
                            debug!("Skipping corrupt packet at {:?}", packet.pts());
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(ffmpeg::Error::Eof) => media.decoder.send_eof()?,
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl OpenMedia {
    fn open(path: &Path) -> Result<(Self, MediaInfo)> {
        let input = format::input(&path)?;

        let (stream_index, time_base, start_offset, fps, frame_count, parameters) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| PlayerError::decoder_error("No video stream found"))?;

            let time_base = stream.time_base();
            let start = stream.start_time();
            let start_offset = if start == ffmpeg::ffi::AV_NOPTS_VALUE {
                0.0
            } else {
                start as f64 * f64::from(time_base)
            };

            (
                stream.index(),
                time_base,
                start_offset,
                sanitize_fps(f64::from(stream.avg_frame_rate())),
                stream.frames().max(0) as u64,
                stream.parameters(),
            )
        };

        let has_audio = input.streams().best(media::Type::Audio).is_some();
        let container_duration = if input.duration() > 0 {
            Some(Duration::from_micros(input.duration() as u64))
        } else {
            None
        };

        let mut context = ffmpeg::codec::context::Context::from_parameters(parameters)?;
        context.set_threading(ffmpeg::codec::threading::Config {
            kind: ffmpeg::codec::threading::Type::Frame,
            count: 0,
        });
        let decoder = context.decoder().video()?;

        let info = MediaInfo {
            source: path.to_string_lossy().into_owned(),
            duration: resolve_duration(container_duration, frame_count, fps),
            fps,
            frame_count,
            width: decoder.width(),
            height: decoder.height(),
            has_audio,
        };

        let media = Self {
            input,
            decoder,
            stream_index,
            time_base,
            start_offset,
            scaler: None,
            half_frame: Duration::from_secs_f64(0.5 / fps),
        };

        Ok((media, info))
    }

    /// Convert an FFmpeg frame to a tightly packed RGBA VideoFrame
    fn convert(&mut self, frame: &ffmpeg::frame::Video) -> Result<VideoFrame> {
        let raw_pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
        let pts_secs = raw_pts as f64 * f64::from(self.time_base) - self.start_offset;
        let pts = Duration::from_secs_f64(pts_secs.max(0.0));

        let needs_scaler = match &self.scaler {
            Some(scaler) => {
                let input = scaler.input();
                input.format != frame.format()
                    || input.width != frame.width()
                    || input.height != frame.height()
            }
            None => true,
        };

        if needs_scaler {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                frame.format(),
                frame.width(),
                frame.height(),
                ffmpeg::format::Pixel::RGBA,
                frame.width(),
                frame.height(),
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }

        let scaler = self.scaler.as_mut()
            .ok_or_else(|| PlayerError::decoder_error("Scaler unavailable"))?;

        let mut rgba = ffmpeg::frame::Video::empty();
        scaler.run(frame, &mut rgba)?;

        let width = rgba.width() as usize;
        let height = rgba.height() as usize;
        let stride = rgba.stride(0);
        let plane = rgba.data(0);
        let row_bytes = width * 4;

        let mut data = Vec::with_capacity(row_bytes * height);
        for row in 0..height {
            let start = row * stride;
            data.extend_from_slice(&plane[start..start + row_bytes]);
        }

        Ok(VideoFrame {
            data,
            width: rgba.width(),
            height: rgba.height(),
            pts,
        })
    }
}

impl Decoder for FFmpegDecoder {
    fn open_file(&mut self, path: &Path) -> Result<MediaInfo> {
        self.close();

        let (media, info) = OpenMedia::open(path)?;
        debug!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames, {:?}, audio: {}",
            info.source, info.width, info.height, info.fps, info.frame_count, info.duration, info.has_audio
        );

        self.media = Some(media);
        self.position = Duration::ZERO;
        self.skip_until = None;
        self.eof = false;

        Ok(info)
    }

    fn decode_frame(&mut self) -> Result<Option<VideoFrame>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            let frame = match self.receive_frame()? {
                Some(frame) => frame,
                None => {
                    self.eof = true;
                    self.skip_until = None;
                    return Ok(None);
                }
            };

            if let (Some(target), Some(media)) = (self.skip_until, self.media.as_ref()) {
                if frame.pts + media.half_frame < target {
                    continue;
                }
                self.skip_until = None;
            }

            self.position = frame.pts;
            return Ok(Some(frame));
        }
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        let media = self.media.as_mut()
            .ok_or_else(|| PlayerError::decoder_error("No file open"))?;

        let target_secs = position.as_secs_f64() + media.start_offset;
        let timestamp = (target_secs * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;

        if let Err(e) = media.input.seek(timestamp, ..timestamp) {
            warn!("Seek to {:?} failed ({}), rewinding to start", position, e);
            media.input.seek(0, ..0)?;
        }
        media.decoder.flush();

        self.skip_until = Some(position);
        self.position = position;
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
        self.media = None;
        self.skip_until = None;
        self.eof = false;
    }
}
