use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::recording::capture_queue::{capture_queue, CapturedFrame, FrameProducer};
use crate::recording::frame_audit_log::FrameAuditLog;
use crate::shared::constants::{CAPTURE_QUEUE_CAPACITY, QUEUE_POLL_TIMEOUT};
use crate::shared::error::VideoError;
use crate::shared::timestamp::Timestamp;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::{FfmpegWriter, WriterConfig};

#[derive(Clone, Debug)]
pub struct RecorderConfig {
    pub writer: WriterConfig,
    /// Frames held between capture and the writer thread before new ones
    /// are dropped.
    pub queue_capacity: usize,
    /// How long the writer thread waits for a frame before re-checking
    /// for a stop request.
    pub poll_timeout: Duration,
    /// Write the `<video>.txt` sidecar listing every observed frame.
    pub audit_log: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            writer: WriterConfig::default(),
            queue_capacity: CAPTURE_QUEUE_CAPACITY,
            poll_timeout: QUEUE_POLL_TIMEOUT,
            audit_log: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingSummary {
    pub path: PathBuf,
    /// Frames the writer thread took off the queue.
    pub frames_received: usize,
    pub frames_written: usize,
    pub duplicates_skipped: usize,
    pub write_errors: usize,
    /// Frames rejected by a full queue before reaching the writer thread.
    pub dropped_frames: usize,
}

/// Owns the writer thread of one recording session.
///
/// Capture pushes frames through the [`FrameProducer`] returned by
/// [`Recorder::start`]; the thread stamps each with its time since the
/// first frame and hands it to the writer. Stopping drains whatever is
/// still queued, then closes the writer so every frame reaches disk.
pub struct Recorder {
    path: PathBuf,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<Result<RecordingSummary, VideoError>>>,
    dropped: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn start(path: &Path, config: RecorderConfig) -> Result<(Self, FrameProducer), VideoError> {
        let writer = FfmpegWriter::create(path, config.writer)?;
        let audit_log = if config.audit_log {
            Some(FrameAuditLog::create(path)?)
        } else {
            FrameAuditLog::remove_stale(path)?;
            None
        };
        log::info!("Recording to {}", path.display());
        Ok(Self::with_writer(
            Box::new(writer),
            audit_log,
            config.queue_capacity,
            config.poll_timeout,
        ))
    }

    /// Runs a recording against any writer implementation.
    pub fn with_writer(
        writer: Box<dyn VideoWriter>,
        audit_log: Option<FrameAuditLog>,
        queue_capacity: usize,
        poll_timeout: Duration,
    ) -> (Self, FrameProducer) {
        let path = writer.path().to_path_buf();
        let (producer, frames_rx, dropped) = capture_queue(queue_capacity);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

        let handle = spawn_writer(writer, audit_log, frames_rx, stop_rx, poll_timeout);

        let recorder = Self {
            path,
            stop_tx,
            handle: Some(handle),
            dropped,
        };
        (recorder, producer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the writer thread, waits for it to drain the queue and close
    /// the file, and reports what happened.
    pub fn stop(mut self) -> Result<RecordingSummary, Box<dyn std::error::Error>> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<RecordingSummary, Box<dyn std::error::Error>> {
        let Some(handle) = self.handle.take() else {
            return Err(format!("recording {} already stopped", self.path.display()).into());
        };
        // A full slot means a stop is already pending.
        let _ = self.stop_tx.try_send(());

        let mut summary = handle
            .join()
            .map_err(|_| -> Box<dyn std::error::Error> { "Writer thread panicked".into() })??;
        summary.dropped_frames = self.dropped.load(Ordering::Relaxed);

        log::info!(
            "Recording {} finished: {} received, {} written, {} duplicates, {} dropped, {} errors",
            summary.path.display(),
            summary.frames_received,
            summary.frames_written,
            summary.duplicates_skipped,
            summary.dropped_frames,
            summary.write_errors,
        );
        Ok(summary)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.shutdown() {
                log::error!("Failed to stop recording {}: {e}", self.path.display());
            }
        }
    }
}

enum Event {
    Frame(CapturedFrame),
    Stop,
    Idle,
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    mut audit_log: Option<FrameAuditLog>,
    frames_rx: Receiver<CapturedFrame>,
    stop_rx: Receiver<()>,
    poll_timeout: Duration,
) -> JoinHandle<Result<RecordingSummary, VideoError>> {
    std::thread::spawn(move || {
        let mut session = WriterSession::default();

        loop {
            let event = crossbeam_channel::select! {
                recv(frames_rx) -> msg => msg.map_or(Event::Stop, Event::Frame),
                recv(stop_rx) -> _ => Event::Stop,
                default(poll_timeout) => Event::Idle,
            };
            match event {
                Event::Frame(captured) => {
                    session.handle(&mut *writer, audit_log.as_mut(), captured)
                }
                Event::Stop => break,
                Event::Idle => continue,
            }
        }

        let pending = frames_rx.len();
        if pending > 0 {
            log::debug!("Draining {pending} queued frames");
        }
        for captured in frames_rx.try_iter() {
            session.handle(&mut *writer, audit_log.as_mut(), captured);
        }

        writer.close()?;

        Ok(RecordingSummary {
            path: writer.path().to_path_buf(),
            frames_received: session.received,
            frames_written: writer.frames_written(),
            duplicates_skipped: writer.duplicates_skipped(),
            write_errors: session.write_errors,
            dropped_frames: 0,
        })
    })
}

#[derive(Default)]
struct WriterSession {
    origin: Option<Duration>,
    received: usize,
    write_errors: usize,
}

impl WriterSession {
    fn handle(
        &mut self,
        writer: &mut dyn VideoWriter,
        audit_log: Option<&mut FrameAuditLog>,
        captured: CapturedFrame,
    ) {
        self.received += 1;

        if let Some(audit) = audit_log {
            if let Err(e) = audit.append(captured.timestamp, captured.frame.shape()) {
                log::warn!("Failed to append to {}: {e}", audit.path().display());
            }
        }

        let origin = *self.origin.get_or_insert(captured.timestamp);
        let elapsed = captured.timestamp.saturating_sub(origin);

        if let Err(e) = writer.write_frame(&captured.frame, Timestamp::from_duration(elapsed)) {
            self.write_errors += 1;
            log::error!("Failed to write frame at {:.3}s: {e}", elapsed.as_secs_f64());
        }
    }
}
