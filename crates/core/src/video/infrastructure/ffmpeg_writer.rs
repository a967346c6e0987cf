use std::path::{Path, PathBuf};

use crate::shared::constants::{BIT_RATE, GOP_SIZE};
use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::frame_record::FrameRecord;
use crate::shared::time_base::TimeBase;
use crate::shared::timestamp::Timestamp;
use crate::video::domain::frame_timeline::{Admission, FrameTimeline};
use crate::video::domain::video_session::VideoSession;
use crate::video::domain::video_writer::VideoWriter;

/// Encoders tried in order; the first one that opens wins.
const ENCODER_PREFERENCE: &[ffmpeg_next::codec::Id] =
    &[ffmpeg_next::codec::Id::H264, ffmpeg_next::codec::Id::MPEG4];

#[derive(Clone, Debug, Default)]
pub struct WriterConfig {
    /// Frame rate used to place frames written with [`Timestamp::Unspecified`].
    pub nominal_fps: Option<f64>,
    /// Rejects a first frame of any other size when set.
    pub expected_dimensions: Option<(u32, u32)>,
}

/// Writes variable-frame-rate video via ffmpeg-next.
///
/// Every accepted frame is stamped with its own PTS on a 1/60000 s grid;
/// frames closer than the duplicate tolerance to the previous one are
/// skipped. The stream, encoder and scaler are created from the first
/// accepted frame, which fixes the geometry for the rest of the session.
///
/// `close` drains the encoder before writing the trailer. Dropping an open
/// writer does the same, logging any failure.
pub struct FfmpegWriter {
    path: PathBuf,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoding: Option<EncodingState>,
    timeline: FrameTimeline,
    expected_dimensions: Option<(u32, u32)>,
    frames_written: usize,
    duplicates_skipped: usize,
    /// Set when starting the stream failed after the container was touched.
    broken: bool,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

struct EncodingState {
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    source_format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
    stream_index: usize,
    encoder_time_base: ffmpeg_next::Rational,
    stream_time_base: ffmpeg_next::Rational,
}

impl FfmpegWriter {
    /// Opens `path` for writing. The container format follows the extension.
    pub fn create(path: &Path, config: WriterConfig) -> Result<Self, VideoError> {
        ffmpeg_next::init()?;

        let timeline = FrameTimeline::new(TimeBase::default(), config.nominal_fps)?;
        let octx = ffmpeg_next::format::output(path)?;
        log::debug!(
            "Opened {} for writing (time base {})",
            path.display(),
            timeline.time_base()
        );

        Ok(Self {
            path: path.to_path_buf(),
            octx: Some(octx),
            encoding: None,
            timeline,
            expected_dimensions: config.expected_dimensions,
            frames_written: 0,
            duplicates_skipped: 0,
            broken: false,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.octx.is_none()
    }

    /// Geometry fixed by the first accepted frame.
    pub fn frame_dimensions(&self) -> Option<(u32, u32)> {
        self.encoding.as_ref().map(|e| (e.width, e.height))
    }

    fn check_geometry(&self, frame: &Frame) -> Result<(), VideoError> {
        let expected = self.frame_dimensions().or(self.expected_dimensions);
        match expected {
            Some(expected) if expected != frame.dimensions() => Err(VideoError::GeometryMismatch {
                expected,
                actual: frame.dimensions(),
            }),
            _ => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<(), VideoError> {
        let Some(mut octx) = self.octx.take() else {
            return Ok(());
        };

        match self.encoding.take() {
            Some(mut encoding) => {
                encoding.encoder.send_eof()?;
                encoding.drain(&mut octx)?;
                octx.write_trailer()?;
                log::info!(
                    "Closed {}: {} frames written, {} duplicates skipped",
                    self.path.display(),
                    self.frames_written,
                    self.duplicates_skipped
                );
            }
            None => log::warn!("Closed {} before any frame was written", self.path.display()),
        }

        Ok(())
    }
}

impl VideoSession for FfmpegWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn time_base(&self) -> TimeBase {
        self.timeline.time_base()
    }
}

impl VideoWriter for FfmpegWriter {
    fn write_frame(
        &mut self,
        frame: &Frame,
        timestamp: Timestamp,
    ) -> Result<FrameRecord, VideoError> {
        if self.broken {
            return Err(VideoError::SessionBroken {
                path: self.path.clone(),
            });
        }
        if self.is_closed() {
            return Err(VideoError::SessionClosed {
                path: self.path.clone(),
            });
        }
        frame.validate_encodable()?;
        self.check_geometry(frame)?;

        let time = self.timeline.resolve(timestamp)?;
        let record = FrameRecord::new(&self.path, time.seconds);

        if let Admission::Duplicate { previous } = self.timeline.classify(&time) {
            let tb = self.timeline.time_base();
            log::warn!(
                "Duplicate frame at {:.3}s (previous: {:.3}s) in {}, skipping",
                record.timestamp_f64(),
                tb.to_seconds_f64(previous),
                self.path.display()
            );
            self.duplicates_skipped += 1;
            return Ok(record);
        }

        let time_base = self.timeline.time_base();
        let Some(octx) = self.octx.as_mut() else {
            return Err(VideoError::SessionClosed {
                path: self.path.clone(),
            });
        };
        let encoding = match self.encoding.take() {
            Some(encoding) => encoding,
            None => {
                let global_header = octx
                    .format()
                    .flags()
                    .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);
                // Nothing is added to the container yet, so this may be retried
                let prepared = PreparedEncoder::new(frame, time_base, global_header)?;
                match prepared.attach(octx, time_base) {
                    Ok(started) => {
                        log::info!(
                            "Started {}x{} stream in {}",
                            frame.width(),
                            frame.height(),
                            self.path.display()
                        );
                        started
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to start stream in {}: {e}; session unusable",
                            self.path.display()
                        );
                        self.broken = true;
                        self.octx = None;
                        return Err(e);
                    }
                }
            }
        };
        self.encoding
            .insert(encoding)
            .encode(octx, frame, time.pts)?;

        self.timeline.commit(&time);
        self.frames_written += 1;
        Ok(record)
    }

    fn close(&mut self) -> Result<(), VideoError> {
        self.finish()
    }

    fn frames_written(&self) -> usize {
        self.frames_written
    }

    fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.octx.is_some() {
            log::warn!("{} dropped without close, flushing", self.path.display());
            if let Err(e) = self.finish() {
                log::error!("Failed to flush {}: {e}", self.path.display());
            }
        }
    }
}

/// Encoder and scaler opened for the first frame's geometry, not yet bound
/// to the container.
struct PreparedEncoder {
    codec: ffmpeg_next::Codec,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    source_format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

impl PreparedEncoder {
    fn new(frame: &Frame, time_base: TimeBase, global_header: bool) -> Result<Self, VideoError> {
        let source_format = frame.order().ffmpeg_format();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            source_format,
            frame.width(),
            frame.height(),
            ffmpeg_next::format::Pixel::YUV420P,
            frame.width(),
            frame.height(),
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;
        let (codec, encoder) = open_encoder(frame.width(), frame.height(), time_base, global_header)?;

        Ok(Self {
            codec,
            encoder,
            scaler,
            source_format,
            width: frame.width(),
            height: frame.height(),
        })
    }

    /// Adds the video stream and writes the container header. A failure
    /// here leaves the container with a stream but no usable header.
    fn attach(
        self,
        octx: &mut ffmpeg_next::format::context::Output,
        time_base: TimeBase,
    ) -> Result<EncodingState, VideoError> {
        let mut ost = octx.add_stream(Some(self.codec))?;
        ost.set_parameters(&self.encoder);
        ost.set_time_base(time_base);
        let stream_index = ost.index();

        octx.write_header()?;

        // The muxer may pick its own stream time base in write_header
        let stream_time_base = octx
            .stream(stream_index)
            .map(|s| s.time_base())
            .unwrap_or_else(|| time_base.into());

        Ok(EncodingState {
            encoder: self.encoder,
            scaler: self.scaler,
            source_format: self.source_format,
            width: self.width,
            height: self.height,
            stream_index,
            encoder_time_base: time_base.into(),
            stream_time_base,
        })
    }
}

impl EncodingState {
    fn encode(
        &mut self,
        octx: &mut ffmpeg_next::format::context::Output,
        frame: &Frame,
        pts: i64,
    ) -> Result<(), VideoError> {
        let mut packed =
            ffmpeg_next::util::frame::video::Video::new(self.source_format, self.width, self.height);

        let stride = packed.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = packed.data_mut(0);
        let src = frame.data();

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * row_bytes;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&packed, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(pts));

        self.encoder.send_frame(&yuv_frame)?;
        self.drain(octx)
    }

    /// Muxes every packet the encoder has ready.
    fn drain(&mut self, octx: &mut ffmpeg_next::format::context::Output) -> Result<(), VideoError> {
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.stream_index);
            encoded.rescale_ts(self.encoder_time_base, self.stream_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

fn open_encoder(
    width: u32,
    height: u32,
    time_base: TimeBase,
    global_header: bool,
) -> Result<
    (
        ffmpeg_next::Codec,
        ffmpeg_next::codec::encoder::video::Encoder,
    ),
    VideoError,
> {
    for &id in ENCODER_PREFERENCE {
        let Some(codec) = ffmpeg_next::encoder::find(id) else {
            log::debug!("No encoder registered for {id:?}");
            continue;
        };

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_gop(GOP_SIZE);
        encoder_ctx.set_bit_rate(BIT_RATE);

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        match encoder_ctx.open_with(ffmpeg_next::Dictionary::new()) {
            Ok(encoder) => {
                log::debug!("Using encoder {}", codec.name());
                return Ok((codec, encoder));
            }
            Err(e) => log::warn!("Encoder {} failed to open: {e}", codec.name()),
        }
    }
    Err(VideoError::EncoderNotFound)
}
