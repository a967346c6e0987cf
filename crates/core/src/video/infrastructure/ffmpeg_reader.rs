use std::path::{Path, PathBuf};

use num_rational::Rational64;

use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::time_base::TimeBase;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::decoded_frame::DecodedFrame;
use crate::video::domain::video_reader::{FrameIter, VideoReader};
use crate::video::domain::video_session::VideoSession;

/// Decodes frames by time via ffmpeg-next (libavformat + libavcodec).
///
/// `open` demuxes the video stream once to count its packets and find the
/// latest presentation time, so a request starting past the end can be
/// answered without decoding. Each `read_frames` call seeks to the key frame
/// at or before the requested start and decodes forward, converting every
/// frame to RGB24.
pub struct FfmpegReader {
    path: PathBuf,
    input_ctx: ffmpeg_next::format::context::Input,
    video_stream_index: usize,
    time_base: TimeBase,
    metadata: VideoMetadata,
    /// Set once packets have been pulled since the input was opened.
    cursor_moved: bool,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        ffmpeg_next::init()?;

        let mut ictx = ffmpeg_next::format::input(path)?;

        let (video_stream_index, time_base, mut metadata) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| VideoError::NoVideoStream {
                    path: path.to_path_buf(),
                })?;

            let codec_ctx =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
            let decoder = codec_ctx.decoder().video()?;
            let time_base = TimeBase::try_from(stream.time_base())?;

            let rate = stream.avg_frame_rate();
            let average_fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };

            let metadata = VideoMetadata {
                width: decoder.width(),
                height: decoder.height(),
                time_base,
                average_fps,
                total_frames: 0,
                last_frame_time: None,
                codec: decoder
                    .codec()
                    .map(|c| c.name().to_string())
                    .unwrap_or_default(),
                source_path: Some(path.to_path_buf()),
            };
            (stream.index(), time_base, metadata)
        };

        let (total_frames, last_pts) = scan_packets(&mut ictx, video_stream_index);
        metadata.total_frames = total_frames;
        metadata.last_frame_time = last_pts.map(|pts| time_base.to_seconds(pts));

        log::debug!(
            "Opened {}: {}x{}, {} frames, time base {}",
            path.display(),
            metadata.width,
            metadata.height,
            total_frames,
            time_base
        );

        // Reopen so decoding starts at the first packet without a seek
        let input_ctx = ffmpeg_next::format::input(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            input_ctx,
            video_stream_index,
            time_base,
            metadata,
            cursor_moved: false,
        })
    }

    /// Positions the demuxer on the key frame at or before `start`.
    fn seek(&mut self, start: Rational64) -> Result<(), VideoError> {
        if start <= Rational64::from_integer(0) {
            if self.cursor_moved {
                self.input_ctx = ffmpeg_next::format::input(&self.path)?;
            }
            return Ok(());
        }

        let av_time_base = TimeBase::new(1, ffmpeg_next::ffi::AV_TIME_BASE as i32);
        let ts = av_time_base.to_pts(start);
        if let Err(e) = self.input_ctx.seek(ts, ..ts) {
            log::warn!(
                "Seek to {:.3}s failed in {}: {e}; decoding from the start",
                ts as f64 / ffmpeg_next::ffi::AV_TIME_BASE as f64,
                self.path.display()
            );
            self.input_ctx = ffmpeg_next::format::input(&self.path)?;
        }
        Ok(())
    }
}

impl VideoSession for FfmpegReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn time_base(&self) -> TimeBase {
        self.time_base
    }
}

impl VideoReader for FfmpegReader {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn read_frames(
        &mut self,
        start: Rational64,
        end: Option<Rational64>,
    ) -> Result<FrameIter<'_>, VideoError> {
        match self.metadata.last_frame_time {
            Some(last) if start <= last => {}
            _ => return Ok(Box::new(std::iter::empty())),
        }

        self.seek(start)?;
        self.cursor_moved = true;

        let stream = self
            .input_ctx
            .stream(self.video_stream_index)
            .ok_or_else(|| VideoError::NoVideoStream {
                path: self.path.clone(),
            })?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Box::new(FfmpegFrameIter {
            ictx: &mut self.input_ctx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            time_base: self.time_base,
            end,
            last_pts: 0,
            flushing: false,
            done: false,
        }))
    }
}

/// Counts the stream's packets and returns the greatest PTS among them.
fn scan_packets(
    ictx: &mut ffmpeg_next::format::context::Input,
    video_stream_index: usize,
) -> (usize, Option<i64>) {
    let mut count = 0;
    let mut last_pts = None;
    for (stream, packet) in ictx.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        count += 1;
        if let Some(pts) = packet.pts() {
            last_pts = Some(last_pts.map_or(pts, |last: i64| last.max(pts)));
        }
    }
    (count, last_pts)
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire range in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    time_base: TimeBase,
    end: Option<Rational64>,
    last_pts: i64,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<DecodedFrame, VideoError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let pts = decoded
            .timestamp()
            .or_else(|| decoded.pts())
            .unwrap_or(self.last_pts);
        self.last_pts = pts;
        let time = self.time_base.to_seconds(pts);

        if self.end.is_some_and(|end| time > end) {
            self.done = true;
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(e.into()));
        }

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Some(Ok(DecodedFrame {
            frame: Frame::rgb(pixels, self.width, self.height),
            pts,
            time,
            key_frame: decoded.is_key(),
        }))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<DecodedFrame, VideoError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing || self.done {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
            if self.done {
                return None;
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
