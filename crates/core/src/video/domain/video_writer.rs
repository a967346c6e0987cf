use crate::shared::error::VideoError;
use crate::shared::frame::Frame;
use crate::shared::frame_record::FrameRecord;
use crate::shared::timestamp::Timestamp;
use crate::video::domain::video_session::VideoSession;

/// Abstracts VFR video encoding so recording code does not depend on a
/// specific codec library.
pub trait VideoWriter: VideoSession + Send {
    /// Encodes `frame` at `timestamp`, or skips it as a duplicate of the
    /// previous accepted frame. Both outcomes return a record carrying the
    /// candidate's time in seconds.
    fn write_frame(&mut self, frame: &Frame, timestamp: Timestamp)
        -> Result<FrameRecord, VideoError>;

    /// Drains buffered encoder output into the file and releases it.
    /// Frames still inside the encoder are lost if this never runs.
    fn close(&mut self) -> Result<(), VideoError>;

    fn frames_written(&self) -> usize;

    fn duplicates_skipped(&self) -> usize;
}
