use num_rational::Rational64;

use crate::shared::error::VideoError;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::decoded_frame::DecodedFrame;
use crate::video::domain::video_session::VideoSession;

pub type FrameIter<'a> = Box<dyn Iterator<Item = Result<DecodedFrame, VideoError>> + 'a>;

/// Time-indexed frame access to a video container.
///
/// Seeking lands on a key frame, so frames slightly before `start` may lead
/// the sequence; callers that need an exact lower bound filter on
/// [`DecodedFrame::time`].
pub trait VideoReader: VideoSession + Send {
    fn metadata(&self) -> &VideoMetadata;

    /// Lazily decodes forward from the key frame at or before `start` and
    /// stops at the first frame later than `end` (`None` reads to the end).
    /// Each call re-seeks; the previous sequence must be dropped first.
    fn read_frames(
        &mut self,
        start: Rational64,
        end: Option<Rational64>,
    ) -> Result<FrameIter<'_>, VideoError>;

    fn read_frame(&mut self, at: Rational64) -> Result<DecodedFrame, VideoError> {
        let path = self.path().to_path_buf();
        match self.read_frames(at, None)?.next() {
            Some(result) => result,
            None => Err(VideoError::FrameNotFound {
                path,
                at_seconds: *at.numer() as f64 / *at.denom() as f64,
            }),
        }
    }
}
