use std::path::{Path, PathBuf};

use crate::control::command::{AckKind, Acknowledgement, ControlCommand};
use crate::recording::capture_queue::FrameProducer;
use crate::recording::recorder::{Recorder, RecorderConfig, RecordingSummary};
use crate::video::infrastructure::ffmpeg_writer::WriterConfig;

/// Turns control commands into recording sessions.
///
/// Output files land in `output_dir` under the name given by the start
/// command. At most one recording is active; a new start stops the
/// previous one first.
pub struct RecordingController {
    output_dir: PathBuf,
    base_config: RecorderConfig,
    active: Option<(Recorder, FrameProducer)>,
    last_summary: Option<RecordingSummary>,
}

impl RecordingController {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(output_dir, RecorderConfig::default())
    }

    /// `base_config.writer` is replaced by each start command's parameters.
    pub fn with_config(output_dir: impl Into<PathBuf>, base_config: RecorderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_config,
            active: None,
            last_summary: None,
        }
    }

    pub fn handle(
        &mut self,
        command: ControlCommand,
    ) -> Result<Acknowledgement, Box<dyn std::error::Error>> {
        let received = Acknowledgement::now(match command {
            ControlCommand::Start { .. } => AckKind::Start,
            ControlCommand::Stop => AckKind::Stop,
        });

        match command {
            ControlCommand::Start {
                video_name,
                fps,
                width,
                height,
            } => {
                self.stop_active()?;

                let path = self.output_dir.join(&video_name);
                let config = RecorderConfig {
                    writer: WriterConfig {
                        nominal_fps: Some(fps),
                        expected_dimensions: Some((width, height)),
                    },
                    ..self.base_config.clone()
                };
                log::info!("Start {video_name}: {fps} fps, {width}x{height}");
                self.active = Some(Recorder::start(&path, config)?);
            }
            ControlCommand::Stop => {
                if self.active.is_none() {
                    log::debug!("Stop received while idle");
                }
                self.stop_active()?;
            }
        }

        Ok(received)
    }

    /// Handle for the capture source to push frames into the active
    /// recording.
    pub fn producer(&self) -> Option<FrameProducer> {
        self.active.as_ref().map(|(_, producer)| producer.clone())
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|(recorder, _)| recorder.path())
    }

    pub fn last_summary(&self) -> Option<&RecordingSummary> {
        self.last_summary.as_ref()
    }

    fn stop_active(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some((recorder, producer)) = self.active.take() {
            drop(producer);
            self.last_summary = Some(recorder.stop()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::recording::capture_queue::CapturedFrame;
    use crate::recording::frame_audit_log::FrameAuditLog;
    use crate::shared::frame::Frame;

    fn start(name: &str) -> ControlCommand {
        ControlCommand::parse(&["start", name, "30", "64", "48"]).unwrap()
    }

    fn frame() -> Frame {
        Frame::rgb(vec![128u8; 64 * 48 * 3], 64, 48)
    }

    #[test]
    fn test_stop_while_idle_is_acknowledged() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = RecordingController::new(dir.path());

        let ack = controller.handle(ControlCommand::Stop).unwrap();
        assert_eq!(ack.kind, AckKind::Stop);
        assert!(controller.last_summary().is_none());
        assert!(controller.producer().is_none());
    }

    #[test]
    fn test_start_record_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = RecordingController::new(dir.path());

        let ack = controller.handle(start("clip.mp4")).unwrap();
        assert_eq!(ack.kind, AckKind::Start);
        assert!(controller.is_recording());
        assert_eq!(controller.active_path(), Some(dir.path().join("clip.mp4").as_path()));

        let producer = controller.producer().unwrap();
        for i in 0..5u64 {
            producer.offer(CapturedFrame::new(Duration::from_millis(i * 33), frame()));
        }
        drop(producer);

        let stop = controller.handle(ControlCommand::Stop).unwrap();
        assert_eq!(stop.kind, AckKind::Stop);
        assert!(stop.timestamp_ns >= ack.timestamp_ns);
        assert!(!controller.is_recording());

        let summary = controller.last_summary().unwrap();
        assert_eq!(summary.frames_written, 5);
        assert!(dir.path().join("clip.mp4").exists());
        assert!(FrameAuditLog::sidecar_path(&dir.path().join("clip.mp4")).exists());
    }

    #[test]
    fn test_start_enforces_announced_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = RecordingController::new(dir.path());
        controller.handle(start("sized.mp4")).unwrap();

        let producer = controller.producer().unwrap();
        producer.offer(CapturedFrame::new(
            Duration::ZERO,
            Frame::rgb(vec![0u8; 32 * 32 * 3], 32, 32),
        ));
        drop(producer);
        controller.handle(ControlCommand::Stop).unwrap();

        let summary = controller.last_summary().unwrap();
        assert_eq!(summary.frames_received, 1);
        assert_eq!(summary.write_errors, 1);
        assert_eq!(summary.frames_written, 0);
    }

    #[test]
    fn test_second_start_closes_first_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = RecordingController::new(dir.path());

        controller.handle(start("first.mp4")).unwrap();
        let producer = controller.producer().unwrap();
        producer.offer(CapturedFrame::new(Duration::ZERO, frame()));
        producer.offer(CapturedFrame::new(Duration::from_millis(40), frame()));
        drop(producer);

        controller.handle(start("second.mp4")).unwrap();
        let first = controller.last_summary().unwrap();
        assert_eq!(first.path, dir.path().join("first.mp4"));
        assert_eq!(first.frames_written, 2);
        assert_eq!(controller.active_path(), Some(dir.path().join("second.mp4").as_path()));

        controller.handle(ControlCommand::Stop).unwrap();
    }
}
